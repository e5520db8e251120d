use serde::{Deserialize, Serialize};

use super::component::{ComponentId, ParameterKind, ParameterSpec, ParameterValue};
use crate::axis::registry::AxisRegistry;

/// Association of one component parameter with a named axis
///
/// The remap is piecewise linear:
///
/// ```text
/// axis  -1 ────────── 0 ────────── 1
/// param min ─────── center ─────── max
/// ```
///
/// With `positive_only` the whole negative half maps onto `center`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlBinding {
    pub component: ComponentId,
    pub parameter: String,
    pub kind: ParameterKind,
    pub domain: (f32, f32),
    pub enabled: bool,
    pub axis: Option<String>,
    pub min: f32,
    pub center: f32,
    pub max: f32,
    pub positive_only: bool,
}

impl ControlBinding {
    /// Fresh, disabled binding carrying the parameter's defaults
    pub fn from_spec(component: ComponentId, spec: &ParameterSpec) -> Self {
        Self {
            component,
            parameter: spec.name.clone(),
            kind: spec.kind,
            domain: spec.domain,
            enabled: false,
            axis: None,
            min: spec.min,
            center: spec.center,
            max: spec.max,
            positive_only: spec.positive_only,
        }
    }

    /// Takes over the user tuning of another binding
    pub fn copy_settings_from(&mut self, other: &ControlBinding) {
        self.enabled = other.enabled;
        self.axis = other.axis.clone();
        self.min = other.min;
        self.center = other.center;
        self.max = other.max;
    }

    /// Maps an axis value onto the parameter's range
    pub fn remap(&self, value: f32) -> f32 {
        let value = if value.is_nan() {
            0.0
        } else {
            value.clamp(-1.0, 1.0)
        };
        let mapped = if value < 0.0 {
            if self.positive_only {
                self.center
            } else {
                self.center + (self.center - self.min) * value
            }
        } else {
            self.center + (self.max - self.center) * value
        };
        mapped.clamp(self.domain.0, self.domain.1)
    }

    /// Remapped value for the bound axis, `None` while the binding is inert
    pub fn resolve(&self, registry: &AxisRegistry) -> Option<f32> {
        if !self.enabled {
            return None;
        }
        let output = registry.output(self.axis.as_deref()?)?;
        if !output.status.is_ok() {
            return None;
        }
        Some(self.remap(output.value))
    }

    pub fn to_parameter_value(&self, remapped: f32) -> ParameterValue {
        match self.kind {
            ParameterKind::Toggle { threshold } => ParameterValue::Toggle(remapped >= threshold),
            ParameterKind::Continuous => ParameterValue::Continuous(remapped),
            ParameterKind::Rate => ParameterValue::Rate(remapped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{AxisNode, AxisStatus, DeviceAxis, PointerAxis, ScreenDimension};
    use crate::controller::backend::RawDeviceEvent;
    use crate::controller::device_sampler::{DeviceSampler, SamplerSettings};

    fn binding(spec: ParameterSpec) -> ControlBinding {
        let mut binding = ControlBinding::from_spec(ComponentId::new_v4(), &spec);
        binding.enabled = true;
        binding.axis = Some("pointer".into());
        binding
    }

    #[test]
    fn positive_only_collapses_negative_half() {
        let spring = binding(ParameterSpec::continuous("spring", 0.0, 1.0, 2.0).positive_only());
        assert_eq!(spring.remap(-1.0), 1.0);
        assert_eq!(spring.remap(-0.3), 1.0);
        assert_eq!(spring.remap(0.0), 1.0);
        assert_eq!(spring.remap(1.0), 2.0);
    }

    #[test]
    fn bidirectional_remap_is_piecewise_linear() {
        let steering = binding(ParameterSpec::continuous("angle", -40.0, 10.0, 20.0));
        assert_eq!(steering.remap(-1.0), -40.0);
        assert_eq!(steering.remap(-0.5), -15.0);
        assert_eq!(steering.remap(0.5), 15.0);
        assert_eq!(steering.remap(1.0), 20.0);
    }

    #[test]
    fn out_of_range_axis_values_are_clamped() {
        let mut throttle = binding(ParameterSpec::continuous("throttle", 0.0, 0.5, 1.0));
        // Combinators may overshoot
        assert_eq!(throttle.remap(2.5), 1.0);
        assert_eq!(throttle.remap(f32::NAN), 0.5);

        // User tuning beyond the declared domain
        throttle.max = 3.0;
        assert_eq!(throttle.remap(1.0), 1.0);
    }

    #[test]
    fn toggle_uses_threshold() {
        let brake = binding(ParameterSpec::toggle("brake"));
        assert_eq!(brake.to_parameter_value(brake.remap(0.4)), ParameterValue::Toggle(false));
        assert_eq!(brake.to_parameter_value(brake.remap(0.5)), ParameterValue::Toggle(true));
    }

    #[test]
    fn resolve_is_inert_unless_enabled_present_and_ok() {
        let mut sampler = DeviceSampler::new(SamplerSettings::default());
        sampler.handle_event(RawDeviceEvent::ScreenResized {
            width: 1000.0,
            height: 1000.0,
        });
        sampler.handle_event(RawDeviceEvent::PointerMoved { x: 750.0, y: 0.0 });

        let mut registry = AxisRegistry::new();
        registry
            .register(AxisNode::pointer(
                "pointer",
                PointerAxis::new(ScreenDimension::Horizontal, 0.0, 0.5),
            ))
            .unwrap();
        registry
            .register(AxisNode::device("stick", DeviceAxis::default()))
            .unwrap();
        registry.evaluate(&sampler);

        let mut speed = binding(ParameterSpec::rate("speed", -2.0, 0.0, 2.0));
        assert_eq!(speed.resolve(&registry), Some(2.0));

        speed.enabled = false;
        assert_eq!(speed.resolve(&registry), None);

        speed.enabled = true;
        speed.axis = Some("missing".into());
        assert_eq!(speed.resolve(&registry), None);

        speed.axis = Some("stick".into());
        assert_eq!(registry.status("stick"), Some(AxisStatus::UnknownDevice));
        assert_eq!(speed.resolve(&registry), None);
    }

    #[test]
    fn copy_takes_tuning_but_keeps_identity() {
        let source = binding(ParameterSpec::continuous("angle", -10.0, 0.0, 10.0));
        let mut target = ControlBinding::from_spec(
            ComponentId::new_v4(),
            &ParameterSpec::continuous("angle", -45.0, 0.0, 45.0),
        );
        target.copy_settings_from(&source);

        assert!(target.enabled);
        assert_eq!(target.axis.as_deref(), Some("pointer"));
        assert_eq!((target.min, target.max), (-10.0, 10.0));
        assert_ne!(target.component, source.component);
        assert_eq!(target.domain, (-45.0, 45.0));
    }
}
