//! Control bindings in a key-value store
//!
//! Keys are `control-<component>-<parameter>-<attribute>` with the attributes
//! `enabled`, `axis`, `min`, `center` and `max`. The parameter kind, domain and
//! positive-only flag are declared by the component and never stored.

use tracing::{debug, warn};

use super::store::KeyValueStore;
use crate::mapping::binding::ControlBinding;
use crate::mapping::component::ComponentId;

const COMPONENTS_COUNT_KEY: &str = "components-count";

pub fn binding_key(component: ComponentId, parameter: &str, attribute: &str) -> String {
    format!("control-{}-{}-{}", component, parameter, attribute)
}

pub fn save_binding(store: &mut impl KeyValueStore, binding: &ControlBinding) {
    let key = |attribute: &str| binding_key(binding.component, &binding.parameter, attribute);
    store.set_int(&key("enabled"), binding.enabled as i64);
    match &binding.axis {
        Some(axis) => store.set_string(&key("axis"), axis),
        None => store.remove_key(&key("axis")),
    }
    store.set_float(&key("min"), binding.min as f64);
    store.set_float(&key("center"), binding.center as f64);
    store.set_float(&key("max"), binding.max as f64);
}

/// Overlays the stored tuning onto a binding, returns false when nothing was stored
pub fn load_binding(store: &impl KeyValueStore, binding: &mut ControlBinding) -> bool {
    let key = |attribute: &str| binding_key(binding.component, &binding.parameter, attribute);
    let enabled_key = key("enabled");
    if !store.has_key(&enabled_key) {
        debug!("No stored binding for {} of {}", binding.parameter, binding.component);
        return false;
    }

    let enabled = store.get_int(&enabled_key).map(|v| v != 0);
    let axis = store.get_string(&key("axis"));
    let read_float = |attribute: &str, current: f32| -> f32 {
        match store.get_float(&key(attribute)) {
            Some(value) if value.is_finite() => value as f32,
            _ => {
                warn!("Missing or malformed {}, keeping {}", key(attribute), current);
                current
            }
        }
    };
    let min = read_float("min", binding.min);
    let center = read_float("center", binding.center);
    let max = read_float("max", binding.max);

    binding.enabled = enabled.unwrap_or_else(|| {
        warn!("Malformed {}, disabling binding", enabled_key);
        false
    });
    binding.axis = axis;
    binding.min = min;
    binding.center = center;
    binding.max = max;
    true
}

pub fn save_component_list(store: &mut impl KeyValueStore, components: &[ComponentId]) {
    store.set_int(COMPONENTS_COUNT_KEY, components.len() as i64);
    for (index, component) in components.iter().enumerate() {
        store.set_string(&format!("components-{}", index), &component.to_string());
    }
}

pub fn load_component_list(store: &impl KeyValueStore) -> Vec<ComponentId> {
    let count = store.get_int(COMPONENTS_COUNT_KEY).unwrap_or(0).max(0) as usize;
    (0..count)
        .filter_map(|index| {
            let key = format!("components-{}", index);
            match store.get_string(&key).map(|text| text.parse::<ComponentId>()) {
                Some(Ok(id)) => Some(id),
                _ => {
                    warn!("Missing or malformed {}, skipping", key);
                    None
                }
            }
        })
        .collect()
}
