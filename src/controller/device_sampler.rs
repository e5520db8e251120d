//! Per-frame device signal state
//!
//! The sampler owns the raw and smoothed readings of every connected device,
//! keyed by the device GUID. Raw values are written by [`RawDeviceEvent`]s
//! between frames; the smoothed values advance once per [`DeviceSampler::sample`].
//!
//! # Channels
//!
//! ```text
//! channel: 0 .. axes            analog axes
//!          axes .. axes + balls relative-motion balls (x component)
//! ```

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::controller::backend::RawDeviceEvent;

/// Stable device identity, survives reconnects and index shifts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceGuid(Uuid);

impl DeviceGuid {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DeviceGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DeviceGuid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    GameController,
    Joystick,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::GameController => write!(f, "Controller"),
            DeviceKind::Joystick => write!(f, "Joystick"),
        }
    }
}

/// Static description of a connected device
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceInfo {
    pub guid: DeviceGuid,
    pub name: String,
    pub kind: DeviceKind,
    pub axis_names: Vec<String>,
    pub num_balls: usize,
    pub num_hats: usize,
    pub num_buttons: usize,
}

impl DeviceInfo {
    /// Raw joystick with generic channel names
    pub fn joystick(
        guid: DeviceGuid,
        name: impl Into<String>,
        num_axes: usize,
        num_balls: usize,
        num_hats: usize,
        num_buttons: usize,
    ) -> Self {
        Self {
            guid,
            name: name.into(),
            kind: DeviceKind::Joystick,
            axis_names: (0..num_axes).map(default_axis_name).collect(),
            num_balls,
            num_hats,
            num_buttons,
        }
    }

    /// Game controller with mapped axis names
    pub fn game_controller(
        guid: DeviceGuid,
        name: impl Into<String>,
        axis_names: Vec<String>,
        num_hats: usize,
        num_buttons: usize,
    ) -> Self {
        Self {
            guid,
            name: name.into(),
            kind: DeviceKind::GameController,
            axis_names,
            num_balls: 0,
            num_hats,
            num_buttons,
        }
    }

    pub fn num_axes(&self) -> usize {
        self.axis_names.len()
    }
}

pub fn default_axis_name(index: usize) -> String {
    match index {
        0 => "X axis".to_string(),
        1 => "Y axis".to_string(),
        n => format!("Axis {}", n + 1),
    }
}

/// Live signal state of one device
#[derive(Clone, Debug)]
pub struct DeviceState {
    info: DeviceInfo,
    axes_raw: Vec<f32>,
    axes_smooth: Vec<f32>,
    balls_raw: Vec<f32>,
    balls_smooth: Vec<f32>,
    hats: Vec<u8>,
    buttons: Vec<bool>,
    connected_at: DateTime<Local>,
}

impl DeviceState {
    fn new(info: DeviceInfo) -> Self {
        let axes = info.num_axes();
        Self {
            axes_raw: vec![0.0; axes],
            axes_smooth: vec![0.0; axes],
            balls_raw: vec![0.0; info.num_balls],
            balls_smooth: vec![0.0; info.num_balls],
            hats: vec![0; info.num_hats],
            buttons: vec![false; info.num_buttons],
            connected_at: Local::now(),
            info,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn connected_at(&self) -> DateTime<Local> {
        self.connected_at
    }

    /// Number of readable channels (axes followed by balls)
    pub fn channel_count(&self) -> usize {
        self.axes_raw.len() + self.balls_raw.len()
    }

    pub fn channel_name(&self, channel: usize) -> Option<String> {
        let axes = self.axes_raw.len();
        if channel < axes {
            self.info.axis_names.get(channel).cloned()
        } else if channel < self.channel_count() {
            Some(format!("Ball {}", channel - axes + 1))
        } else {
            None
        }
    }

    pub fn hat(&self, hat: usize) -> Option<u8> {
        self.hats.get(hat).copied()
    }

    pub fn button(&self, button: usize) -> Option<bool> {
        self.buttons.get(button).copied()
    }

    fn value(&self, channel: usize, smoothed: bool) -> Option<f32> {
        let axes = self.axes_raw.len();
        if channel < axes {
            Some(if smoothed {
                self.axes_smooth[channel]
            } else {
                self.axes_raw[channel]
            })
        } else {
            let ball = channel - axes;
            let values = if smoothed {
                &self.balls_smooth
            } else {
                &self.balls_raw
            };
            values.get(ball).copied()
        }
    }

    // Exponential moving average towards the raw readings
    fn tick(&mut self, blend: f32) {
        for (smooth, raw) in self.axes_smooth.iter_mut().zip(&self.axes_raw) {
            *smooth = *smooth * (1.0 - blend) + raw * blend;
        }
        for (smooth, raw) in self.balls_smooth.iter_mut().zip(&self.balls_raw) {
            *smooth = *smooth * (1.0 - blend) + raw * blend;
        }
    }
}

/// Device list notification, keyed by GUID
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceChange {
    Added(DeviceGuid),
    Removed(DeviceGuid),
}

// Sampler errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SamplerError {
    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceGuid),

    #[error("Channel {channel} out of range, device {guid} has {count} channels")]
    ChannelOutOfRange {
        guid: DeviceGuid,
        channel: usize,
        count: usize,
    },
}

// Sampler settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Blend factor per second for the smoothed readings
    pub smoothing_rate: f32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            smoothing_rate: 12.0,
        }
    }
}

/// Pointer position and the screen it lives on
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    pub screen_width: f32,
    pub screen_height: f32,
}

/// Owns every connected device's signal state
#[derive(Debug, Default)]
pub struct DeviceSampler {
    settings: SamplerSettings,
    devices: HashMap<DeviceGuid, DeviceState>,
    // Connection order, used for listing only
    order: Vec<DeviceGuid>,
    pointer: PointerState,
    generation: u64,
    changes: Vec<DeviceChange>,
}

impl DeviceSampler {
    pub fn new(settings: SamplerSettings) -> Self {
        debug!("Creating device sampler with settings: {:?}", settings);
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Applies one raw event to the device state
    pub fn handle_event(&mut self, event: RawDeviceEvent) {
        match event {
            RawDeviceEvent::Connected(info) => {
                let guid = info.guid;
                info!(
                    "{} connected: {} ({} axes, {} balls, {} hats, {} buttons) guid {}",
                    info.kind,
                    info.name,
                    info.num_axes(),
                    info.num_balls,
                    info.num_hats,
                    info.num_buttons,
                    guid
                );
                if self.devices.insert(guid, DeviceState::new(info)).is_none() {
                    self.order.push(guid);
                }
                self.generation += 1;
                self.changes.push(DeviceChange::Added(guid));
            }
            RawDeviceEvent::Disconnected(guid) => {
                if let Some(state) = self.devices.remove(&guid) {
                    info!("Device disconnected: {} ({})", state.info.name, guid);
                    self.order.retain(|g| *g != guid);
                    self.generation += 1;
                    self.changes.push(DeviceChange::Removed(guid));
                } else {
                    warn!("Disconnect for unknown device {}", guid);
                }
            }
            RawDeviceEvent::AxisMotion { guid, axis, value } => {
                match self.devices.get_mut(&guid) {
                    Some(state) => match state.axes_raw.get_mut(axis) {
                        Some(slot) => *slot = value.clamp(-1.0, 1.0),
                        None => debug!("Ignoring motion on axis {} of {}", axis, guid),
                    },
                    None => debug!("Axis motion from unknown device {}", guid),
                }
            }
            RawDeviceEvent::BallMotion { guid, ball, xrel } => {
                if let Some(slot) = self
                    .devices
                    .get_mut(&guid)
                    .and_then(|state| state.balls_raw.get_mut(ball))
                {
                    *slot = xrel as f32 / 32767.0;
                }
            }
            RawDeviceEvent::HatMotion { guid, hat, value } => {
                if let Some(slot) = self
                    .devices
                    .get_mut(&guid)
                    .and_then(|state| state.hats.get_mut(hat))
                {
                    *slot = value;
                }
            }
            RawDeviceEvent::Button {
                guid,
                button,
                pressed,
            } => {
                if let Some(slot) = self
                    .devices
                    .get_mut(&guid)
                    .and_then(|state| state.buttons.get_mut(button))
                {
                    *slot = pressed;
                }
            }
            RawDeviceEvent::PointerMoved { x, y } => {
                self.pointer.x = x;
                self.pointer.y = y;
            }
            RawDeviceEvent::ScreenResized { width, height } => {
                debug!("Screen resized to {}x{}", width, height);
                self.pointer.screen_width = width;
                self.pointer.screen_height = height;
            }
        }
    }

    pub fn handle_events(&mut self, events: impl IntoIterator<Item = RawDeviceEvent>) {
        for event in events {
            self.handle_event(event);
        }
    }

    /// Advances the smoothed state of every device by one frame
    pub fn sample(&mut self, delta: Duration) {
        let blend = (delta.as_secs_f32() * self.settings.smoothing_rate).clamp(0.0, 1.0);
        for state in self.devices.values_mut() {
            state.tick(blend);
        }
    }

    /// Reads the current value of a channel
    pub fn read(
        &self,
        guid: DeviceGuid,
        channel: usize,
        smoothed: bool,
    ) -> Result<f32, SamplerError> {
        let state = self
            .devices
            .get(&guid)
            .ok_or(SamplerError::UnknownDevice(guid))?;
        state
            .value(channel, smoothed)
            .ok_or(SamplerError::ChannelOutOfRange {
                guid,
                channel,
                count: state.channel_count(),
            })
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn device(&self, guid: DeviceGuid) -> Option<&DeviceState> {
        self.devices.get(&guid)
    }

    /// Device at a position in connection order
    pub fn device_at(&self, index: usize) -> Option<&DeviceState> {
        self.order.get(index).and_then(|guid| self.devices.get(guid))
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceState> {
        self.order.iter().filter_map(|guid| self.devices.get(guid))
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Bumped on every connect or disconnect
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drains the device list changes since the last call
    pub fn take_changes(&mut self) -> Vec<DeviceChange> {
        std::mem::take(&mut self.changes)
    }
}
