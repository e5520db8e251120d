//! Named axis profile in the global store
//!
//! A profile holds every saveable axis of the registry. It is written only on an
//! explicit save; loading merges the stored axes into the registry.

use tracing::{info, warn};

use super::axis_codec::{
    delete_axis, load_axis, load_axis_list, save_axis, save_axis_list, without_dependencies,
};
use super::store::KeyValueStore;
use crate::axis::chain_axis::DependencySlot;
use crate::axis::error::AxisError;
use crate::axis::node::{AxisKind, AxisNode};
use crate::axis::registry::AxisRegistry;

/// Outcome of restoring stored axes into a registry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    /// Dependency links dropped because they would close a cycle
    pub rejected_links: usize,
}

/// Writes every saveable axis, returns the number written
pub fn save_profile(store: &mut impl KeyValueStore, registry: &AxisRegistry) -> usize {
    let names: Vec<String> = registry
        .nodes()
        .filter(|node| node.saveable)
        .map(|node| node.name().to_string())
        .collect();

    for stale in load_axis_list(&*store) {
        if !names.contains(&stale) {
            delete_axis(store, &stale);
        }
    }
    for node in registry.nodes().filter(|node| node.saveable) {
        save_axis(store, node);
    }
    save_axis_list(store, &names);
    info!("Saved axis profile with {} axes", names.len());
    names.len()
}

/// Registers every stored axis the registry does not have yet
pub fn load_profile(store: &impl KeyValueStore, registry: &mut AxisRegistry) -> LoadReport {
    let mut report = LoadReport::default();
    let mut nodes = Vec::new();
    for name in load_axis_list(store) {
        match load_axis(store, &name) {
            Some(node) => nodes.push(node),
            None => report.skipped += 1,
        }
    }

    let linked = register_all(registry, nodes, &mut report);
    report.rejected_links += restore_links(registry, &linked);
    info!(
        "Loaded axis profile: {} axes, {} skipped, {} links rejected",
        report.loaded, report.skipped, report.rejected_links
    );
    report
}

/// Registers nodes without their edges, returns the combinators to re-link
pub(crate) fn register_all(
    registry: &mut AxisRegistry,
    nodes: Vec<AxisNode>,
    report: &mut LoadReport,
) -> Vec<AxisNode> {
    let mut linked = Vec::new();
    for node in nodes {
        match registry.register(without_dependencies(&node)) {
            Ok(_) => {
                report.loaded += 1;
                if matches!(node.kind, AxisKind::Combinator(_)) {
                    linked.push(node);
                }
            }
            Err(e) => {
                warn!("Skipping stored axis {}: {}", node.name(), e);
                report.skipped += 1;
            }
        }
    }
    linked
}

/// Restores combinator edges one by one, each through the cycle check
pub(crate) fn restore_links(registry: &mut AxisRegistry, combinators: &[AxisNode]) -> usize {
    let mut rejected = 0;
    for node in combinators {
        let AxisKind::Combinator(chain) = &node.kind else {
            continue;
        };
        for slot in [DependencySlot::First, DependencySlot::Second] {
            let Some(target) = chain.slot(slot) else {
                continue;
            };
            match registry.set_dependency(node.name(), slot, Some(target)) {
                Ok(()) => {}
                Err(AxisError::CycleDetected { .. }) => {
                    warn!(
                        "Dropping stored link {} -> {}: it would close a cycle",
                        node.name(),
                        target
                    );
                    rejected += 1;
                }
                Err(e) => {
                    warn!("Dropping stored link {} -> {}: {}", node.name(), target, e);
                    rejected += 1;
                }
            }
        }
    }
    rejected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::chain_axis::{ChainAxis, ChainMethod};
    use crate::axis::device_axis::DeviceAxis;
    use crate::axis::pointer_axis::PointerAxis;
    use crate::persistence::axis_codec::axis_key;
    use crate::persistence::store::EmbeddedStore;

    fn combinator(name: &str, first: &str) -> AxisNode {
        let mut chain = ChainAxis::new(ChainMethod::Sum);
        chain.set_slot(DependencySlot::First, Some(first.into()));
        AxisNode::combinator(name, chain)
    }

    #[test]
    fn transient_axes_are_not_saved() {
        let mut registry = AxisRegistry::new();
        registry
            .register(AxisNode::device("stick", DeviceAxis::default()))
            .unwrap();
        registry
            .register(AxisNode::pointer("preview", PointerAxis::default()).transient())
            .unwrap();

        let mut store = EmbeddedStore::new();
        assert_eq!(save_profile(&mut store, &registry), 1);
        assert_eq!(load_axis_list(&store), ["stick"]);
        assert!(!store.has_key(&axis_key("preview", "type")));
    }

    #[test]
    fn removed_axes_disappear_on_next_save() {
        let mut registry = AxisRegistry::new();
        registry
            .register(AxisNode::device("a", DeviceAxis::default()))
            .unwrap();
        registry
            .register(AxisNode::device("b", DeviceAxis::default()))
            .unwrap();
        let mut store = EmbeddedStore::new();
        save_profile(&mut store, &registry);

        registry.remove("a");
        save_profile(&mut store, &registry);
        assert!(!store.has_key(&axis_key("a", "type")));
        assert_eq!(load_axis_list(&store), ["b"]);
    }

    #[test]
    fn forward_references_load_in_any_order() {
        let mut source = AxisRegistry::new();
        source.register(combinator("mix", "stick")).unwrap();
        source
            .register(AxisNode::device("stick", DeviceAxis::default()))
            .unwrap();
        let mut store = EmbeddedStore::new();
        save_profile(&mut store, &source);

        let mut registry = AxisRegistry::new();
        let report = load_profile(&store, &mut registry);
        assert_eq!(report.loaded, 2);
        assert_eq!(registry.get("mix").unwrap().dependencies(), ["stick"]);
    }

    #[test]
    fn stored_cycles_are_broken_on_load() {
        let mut store = EmbeddedStore::new();
        save_axis(&mut store, &combinator("a", "b"));
        save_axis(&mut store, &combinator("b", "a"));
        save_axis_list(&mut store, &["a".to_string(), "b".to_string()]);

        let mut registry = AxisRegistry::new();
        let report = load_profile(&store, &mut registry);
        assert_eq!(
            report,
            LoadReport {
                loaded: 2,
                skipped: 0,
                rejected_links: 1
            }
        );
        assert_eq!(registry.get("a").unwrap().dependencies(), ["b"]);
        assert!(registry.get("b").unwrap().dependencies().is_empty());
    }

    #[test]
    fn existing_axes_are_kept() {
        let mut store = EmbeddedStore::new();
        save_axis(&mut store, &AxisNode::device("stick", DeviceAxis::default()));
        save_axis_list(&mut store, &["stick".to_string(), "ghost".to_string()]);

        let mut registry = AxisRegistry::new();
        registry
            .register(AxisNode::pointer("stick", PointerAxis::default()))
            .unwrap();
        let report = load_profile(&store, &mut registry);

        assert_eq!(report.skipped, 2);
        assert!(matches!(
            registry.get("stick").unwrap().kind,
            AxisKind::Pointer(_)
        ));
    }
}
