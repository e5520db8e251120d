//! Axis definitions in a key-value store
//!
//! Every node is written as its variant tag plus the variant attributes under
//! name prefixed keys:
//!
//! ```text
//! axis-<name>-type          Device | Pointer | Combinator
//! axis-<name>-device        device GUID           (Device)
//! axis-<name>-channel       channel index         (Device)
//! axis-<name>-smooth        0 / 1                 (Device)
//! axis-<name>-invert        0 / 1                 (Device)
//! axis-<name>-sensitivity   float                 (Device)
//! axis-<name>-curvature     float                 (Device)
//! axis-<name>-deadzone      float                 (Device)
//! axis-<name>-axis          0 horizontal, 1 vert. (Pointer)
//! axis-<name>-center        float                 (Pointer)
//! axis-<name>-range         float                 (Pointer)
//! axis-<name>-method        combining function    (Combinator)
//! axis-<name>-sub-axis-1    dependency name       (Combinator)
//! axis-<name>-sub-axis-2    dependency name       (Combinator)
//! axes-count, axes-<i>      saved axis names, in order
//! ```
//!
//! Loading repairs missing or malformed attributes with the variant default
//! and logs the repair; only a missing or unknown type tag skips a node.

use std::str::FromStr;
use tracing::{debug, warn};

use super::store::KeyValueStore;
use crate::axis::chain_axis::{ChainAxis, ChainMethod, DependencySlot};
use crate::axis::device_axis::DeviceAxis;
use crate::axis::node::{AxisKind, AxisNode, AxisType};
use crate::axis::pointer_axis::{PointerAxis, ScreenDimension};
use crate::controller::device_sampler::DeviceGuid;

const ATTRIBUTES: [&str; 14] = [
    "type",
    "device",
    "channel",
    "smooth",
    "invert",
    "sensitivity",
    "curvature",
    "deadzone",
    "axis",
    "center",
    "range",
    "method",
    "sub-axis-1",
    "sub-axis-2",
];

const AXES_COUNT_KEY: &str = "axes-count";

pub fn axis_key(name: &str, attribute: &str) -> String {
    format!("axis-{}-{}", name, attribute)
}

fn list_key(index: usize) -> String {
    format!("axes-{}", index)
}

fn set_optional(store: &mut impl KeyValueStore, key: &str, value: Option<&str>) {
    match value {
        Some(value) => store.set_string(key, value),
        None => store.remove_key(key),
    }
}

/// Writes a node, replacing whatever was stored under its name
pub fn save_axis(store: &mut impl KeyValueStore, node: &AxisNode) {
    let name = node.name();
    delete_axis(store, name);
    store.set_string(&axis_key(name, "type"), &node.axis_type().to_string());

    match &node.kind {
        AxisKind::Device(axis) => {
            store.set_string(&axis_key(name, "device"), &axis.guid.to_string());
            store.set_int(&axis_key(name, "channel"), axis.channel as i64);
            store.set_int(&axis_key(name, "smooth"), axis.smooth as i64);
            store.set_int(&axis_key(name, "invert"), axis.invert as i64);
            store.set_float(&axis_key(name, "sensitivity"), axis.sensitivity() as f64);
            store.set_float(&axis_key(name, "curvature"), axis.curvature() as f64);
            store.set_float(&axis_key(name, "deadzone"), axis.deadzone() as f64);
        }
        AxisKind::Pointer(axis) => {
            store.set_int(&axis_key(name, "axis"), axis.dimension.as_index());
            store.set_float(&axis_key(name, "center"), axis.center() as f64);
            store.set_float(&axis_key(name, "range"), axis.range() as f64);
        }
        AxisKind::Combinator(chain) => {
            store.set_string(&axis_key(name, "method"), &chain.method.to_string());
            set_optional(store, &axis_key(name, "sub-axis-1"), chain.first());
            set_optional(store, &axis_key(name, "sub-axis-2"), chain.second());
        }
    }
    debug!("Saved {} axis {}", node.axis_type(), name);
}

/// Removes every key of a named axis
pub fn delete_axis(store: &mut impl KeyValueStore, name: &str) {
    for attribute in ATTRIBUTES {
        store.remove_key(&axis_key(name, attribute));
    }
}

fn read_float(store: &impl KeyValueStore, name: &str, attribute: &str, default: f32) -> f32 {
    let key = axis_key(name, attribute);
    match store.get_float(&key) {
        Some(value) if value.is_finite() => value as f32,
        Some(value) => {
            warn!("Invalid value {} for {}, using {}", value, key, default);
            default
        }
        None => {
            warn!("Missing or malformed {}, using {}", key, default);
            default
        }
    }
}

fn read_int(store: &impl KeyValueStore, name: &str, attribute: &str, default: i64) -> i64 {
    let key = axis_key(name, attribute);
    store.get_int(&key).unwrap_or_else(|| {
        warn!("Missing or malformed {}, using {}", key, default);
        default
    })
}

fn read_parsed<T: FromStr>(store: &impl KeyValueStore, name: &str, attribute: &str) -> Option<T> {
    let key = axis_key(name, attribute);
    let parsed = store.get_string(&key).and_then(|text| text.parse().ok());
    if parsed.is_none() {
        warn!("Missing or malformed {}, using default", key);
    }
    parsed
}

/// Rebuilds a node from its stored attributes
///
/// Returns `None` when the type tag is missing or unknown.
pub fn load_axis(store: &impl KeyValueStore, name: &str) -> Option<AxisNode> {
    let type_key = axis_key(name, "type");
    let Some(tag) = store.get_string(&type_key) else {
        warn!("No stored type for axis {}, skipping", name);
        return None;
    };
    let axis_type = match AxisType::from_str(&tag) {
        Ok(axis_type) => axis_type,
        Err(e) => {
            warn!("Skipping axis {}: {}", name, e);
            return None;
        }
    };

    let kind = match axis_type {
        AxisType::Device => {
            let defaults = DeviceAxis::default();
            let mut axis = DeviceAxis::new(
                read_parsed::<DeviceGuid>(store, name, "device").unwrap_or(defaults.guid),
                usize::try_from(read_int(store, name, "channel", 0)).unwrap_or(0),
            );
            axis.smooth = read_int(store, name, "smooth", defaults.smooth as i64) != 0;
            axis.invert = read_int(store, name, "invert", defaults.invert as i64) != 0;
            axis.set_sensitivity(read_float(store, name, "sensitivity", defaults.sensitivity()));
            axis.set_curvature(read_float(store, name, "curvature", defaults.curvature()));
            axis.set_deadzone(read_float(store, name, "deadzone", defaults.deadzone()));
            AxisKind::Device(axis)
        }
        AxisType::Pointer => {
            let defaults = PointerAxis::default();
            let index = read_int(store, name, "axis", defaults.dimension.as_index());
            let dimension = ScreenDimension::from_index(index).unwrap_or_else(|| {
                warn!("Unknown screen dimension {} for axis {}", index, name);
                defaults.dimension
            });
            AxisKind::Pointer(PointerAxis::new(
                dimension,
                read_float(store, name, "center", defaults.center()),
                read_float(store, name, "range", defaults.range()),
            ))
        }
        AxisType::Combinator => {
            let mut chain = ChainAxis::new(read_parsed(store, name, "method").unwrap_or_default());
            // Empty slots are legal, their keys are simply absent
            chain.set_slot(
                DependencySlot::First,
                store.get_string(&axis_key(name, "sub-axis-1")),
            );
            chain.set_slot(
                DependencySlot::Second,
                store.get_string(&axis_key(name, "sub-axis-2")),
            );
            AxisKind::Combinator(chain)
        }
    };
    Some(AxisNode::new(name, kind))
}

/// Writes the ordered list of saved axis names
pub fn save_axis_list(store: &mut impl KeyValueStore, names: &[String]) {
    let previous = store.get_int(AXES_COUNT_KEY).unwrap_or(0).max(0) as usize;
    for index in names.len()..previous {
        store.remove_key(&list_key(index));
    }
    store.set_int(AXES_COUNT_KEY, names.len() as i64);
    for (index, name) in names.iter().enumerate() {
        store.set_string(&list_key(index), name);
    }
}

pub fn load_axis_list(store: &impl KeyValueStore) -> Vec<String> {
    if !store.has_key(AXES_COUNT_KEY) {
        return Vec::new();
    }
    let count = store.get_int(AXES_COUNT_KEY).unwrap_or_else(|| {
        warn!("Malformed {}, assuming no saved axes", AXES_COUNT_KEY);
        0
    });
    (0..count.max(0) as usize)
        .filter_map(|index| {
            let name = store.get_string(&list_key(index));
            if name.is_none() {
                warn!("Missing axis name at {}", list_key(index));
            }
            name
        })
        .collect()
}

/// Dependencies of a combinator are restored separately, after every node exists
pub(crate) fn without_dependencies(node: &AxisNode) -> AxisNode {
    match &node.kind {
        AxisKind::Combinator(chain) => {
            let mut stripped = node.clone();
            stripped.kind = AxisKind::Combinator(ChainAxis::new(chain.method));
            stripped
        }
        _ => node.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::store::EmbeddedStore;

    fn device_node() -> AxisNode {
        let mut axis = DeviceAxis::new(DeviceGuid::from_bytes([0xab; 16]), 3);
        axis.smooth = true;
        axis.invert = true;
        axis.set_sensitivity(1.7);
        axis.set_curvature(2.3);
        axis.set_deadzone(0.15);
        AxisNode::device("throttle", axis)
    }

    #[test]
    fn variant_survives_store_round_trip() {
        let mut chain = ChainAxis::new(ChainMethod::Minimum);
        chain.set_slot(DependencySlot::Second, Some("throttle".into()));
        let nodes = [
            device_node(),
            AxisNode::pointer(
                "mouse",
                PointerAxis::new(ScreenDimension::Vertical, -0.3, 0.8),
            ),
            AxisNode::combinator("mix", chain),
        ];

        let mut store = EmbeddedStore::new();
        for node in &nodes {
            save_axis(&mut store, node);
        }
        assert!(!store.has_key(&axis_key("mix", "sub-axis-1")));

        for node in &nodes {
            assert_eq!(load_axis(&store, node.name()).as_ref(), Some(node));
        }
    }

    #[test]
    fn resaving_as_other_variant_drops_stale_keys() {
        let mut store = EmbeddedStore::new();
        save_axis(&mut store, &device_node());
        save_axis(
            &mut store,
            &AxisNode::pointer("throttle", PointerAxis::default()),
        );

        assert!(!store.has_key(&axis_key("throttle", "deadzone")));
        assert_eq!(
            load_axis(&store, "throttle").map(|n| n.axis_type()),
            Some(AxisType::Pointer)
        );

        delete_axis(&mut store, "throttle");
        assert!(store.is_empty());
    }

    #[test]
    fn missing_and_malformed_attributes_fall_back_to_defaults() {
        let mut store = EmbeddedStore::new();
        store.set_string(&axis_key("roll", "type"), "Device");
        store.set_string(&axis_key("roll", "device"), "not-a-guid");
        store.set_string(&axis_key("roll", "sensitivity"), "fast");
        store.set_float(&axis_key("roll", "deadzone"), f64::NAN);
        store.set_int(&axis_key("roll", "channel"), -4);

        let node = load_axis(&store, "roll").unwrap();
        assert_eq!(node.kind, AxisKind::Device(DeviceAxis::default()));

        store.set_string(&axis_key("pan", "type"), "Pointer");
        store.set_int(&axis_key("pan", "axis"), 7);
        let AxisKind::Pointer(pan) = load_axis(&store, "pan").unwrap().kind else {
            panic!("expected a pointer axis");
        };
        assert_eq!(pan, PointerAxis::default());

        store.set_string(&axis_key("mix", "type"), "Combinator");
        store.set_string(&axis_key("mix", "method"), "Median");
        let AxisKind::Combinator(mix) = load_axis(&store, "mix").unwrap().kind else {
            panic!("expected a combinator");
        };
        assert_eq!(mix, ChainAxis::new(ChainMethod::Sum));
    }

    #[test]
    fn unknown_or_missing_type_skips_the_node() {
        let mut store = EmbeddedStore::new();
        store.set_string(&axis_key("old", "type"), "Keyboard");
        assert!(load_axis(&store, "old").is_none());
        assert!(load_axis(&store, "never-saved").is_none());
    }

    #[test]
    fn axis_list_shrinks_cleanly() {
        let mut store = EmbeddedStore::new();
        let names: Vec<String> = ["a", "b", "c"].map(String::from).to_vec();
        save_axis_list(&mut store, &names);
        save_axis_list(&mut store, &names[..1]);

        assert_eq!(load_axis_list(&store), ["a"]);
        assert!(!store.has_key("axes-2"));
        assert!(load_axis_list(&EmbeddedStore::new()).is_empty());
    }
}
