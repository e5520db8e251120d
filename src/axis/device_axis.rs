use serde::{Deserialize, Serialize};

use crate::controller::device_sampler::{DeviceGuid, DeviceSampler, SamplerError};

/// Axis reading one channel of a physical device
///
/// The device is addressed by GUID and looked up on every evaluation, so the
/// axis keeps working when other devices connect or disconnect and connection
/// indices shift.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceAxis {
    pub guid: DeviceGuid,
    pub channel: usize,
    pub smooth: bool,
    pub invert: bool,
    sensitivity: f32,
    curvature: f32,
    deadzone: f32,
}

impl Default for DeviceAxis {
    fn default() -> Self {
        Self {
            guid: DeviceGuid::nil(),
            channel: 0,
            smooth: false,
            invert: false,
            sensitivity: 1.0,
            curvature: 1.0,
            deadzone: 0.0,
        }
    }
}

impl DeviceAxis {
    pub fn new(guid: DeviceGuid, channel: usize) -> Self {
        Self {
            guid,
            channel,
            ..Default::default()
        }
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = if sensitivity.is_finite() {
            sensitivity.max(0.0)
        } else {
            1.0
        };
    }

    pub fn curvature(&self) -> f32 {
        self.curvature
    }

    pub fn set_curvature(&mut self, curvature: f32) {
        self.curvature = if curvature.is_finite() {
            curvature.max(0.0)
        } else {
            1.0
        };
    }

    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    pub fn set_deadzone(&mut self, deadzone: f32) {
        self.deadzone = if deadzone.is_finite() {
            deadzone.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Runs a raw reading through deadzone, invert, sensitivity and curvature
    pub fn process(&self, raw: f32) -> f32 {
        let magnitude = raw.abs();
        if raw.is_nan() || magnitude <= self.deadzone || self.deadzone >= 1.0 {
            return 0.0;
        }

        // Rescale so the output starts at 0 right outside the deadzone
        let mut value = raw.signum() * (magnitude - self.deadzone) / (1.0 - self.deadzone);
        if self.invert {
            value = -value;
        }
        value *= self.sensitivity;

        // signum(0.0) is 1.0
        if value == 0.0 {
            return 0.0;
        }
        let curved = value.signum() * value.abs().powf(self.curvature);
        curved.clamp(-1.0, 1.0)
    }

    pub fn evaluate(&self, sampler: &DeviceSampler) -> Result<f32, SamplerError> {
        sampler
            .read(self.guid, self.channel, self.smooth)
            .map(|raw| self.process(raw))
    }
}
