//! Per-document embedded store
//!
//! A document carries exactly the axis and binding state its components
//! reference: the bound axes plus every axis they depend on, the component
//! list and each component's bindings. It is rewritten on every document save.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

use super::axis_codec::{load_axis, load_axis_list, save_axis, save_axis_list};
use super::binding_codec::{load_binding, load_component_list, save_binding, save_component_list};
use super::profile::{register_all, restore_links, LoadReport};
use super::store::{EmbeddedStore, PersistenceError};
use crate::axis::registry::AxisRegistry;
use crate::mapping::component::{ComponentAdapter, ComponentId};
use crate::mapping::manager::ControlManager;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub store: EmbeddedStore,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: EmbeddedStore::new(),
        }
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), PersistenceError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PersistenceError::Encode(e.to_string()))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| PersistenceError::Io(format!("{}: {}", path.display(), e)))?;
        info!("Saved document {} to {}", self.name, path.display());
        Ok(())
    }

    pub async fn load_from(path: &Path) -> Result<Self, PersistenceError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PersistenceError::Io(format!("{}: {}", path.display(), e)))?;
        let document: Document = toml::from_str(&content)
            .map_err(|e| PersistenceError::Decode(format!("{}: {}", path.display(), e)))?;
        debug!(
            "Loaded document {} with {} stored entries",
            document.name,
            document.store.len()
        );
        Ok(document)
    }
}

/// Summary of a document load
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentReport {
    pub axes: LoadReport,
    /// Stored axes whose registry namesake has different parameters
    pub conflicts: usize,
    pub bindings: usize,
}

// Bound axes plus everything they depend on, in registry order
fn referenced_closure(registry: &AxisRegistry, roots: BTreeSet<String>) -> Vec<String> {
    let mut wanted = roots;
    let mut stack: Vec<String> = wanted.iter().cloned().collect();
    while let Some(name) = stack.pop() {
        if let Some(node) = registry.get(&name) {
            for dependency in node.dependencies() {
                if wanted.insert(dependency.to_string()) {
                    stack.push(dependency.to_string());
                }
            }
        }
    }
    registry
        .nodes()
        .filter(|node| node.saveable && wanted.contains(node.name()))
        .map(|node| node.name().to_string())
        .collect()
}

/// Rewrites the document store from the current state, returns the number of axes written
pub fn save_document(
    document: &mut Document,
    registry: &AxisRegistry,
    manager: &ControlManager,
    components: &[ComponentId],
) -> usize {
    let store = &mut document.store;
    store.clear();

    let names = referenced_closure(registry, manager.referenced_axes(components));
    for name in &names {
        if let Some(node) = registry.get(name) {
            save_axis(store, node);
        }
    }
    save_axis_list(store, &names);

    save_component_list(store, components);
    let mut bindings = 0;
    for component in components {
        for binding in manager.bindings(*component) {
            save_binding(store, binding);
            bindings += 1;
        }
    }
    info!(
        "Stored {} axes and {} bindings in document {}",
        names.len(),
        bindings,
        document.name
    );
    names.len()
}

/// Restores axes missing from the registry and the stored bindings of the given components
pub fn load_document(
    document: &Document,
    registry: &mut AxisRegistry,
    manager: &mut ControlManager,
    components: &[Box<dyn ComponentAdapter>],
) -> DocumentReport {
    let store = &document.store;
    let mut report = DocumentReport::default();

    let mut fresh = Vec::new();
    for name in load_axis_list(store) {
        let Some(node) = load_axis(store, &name) else {
            report.axes.skipped += 1;
            continue;
        };
        match registry.get(&name) {
            Some(existing) if !existing.same_parameters(&node) => {
                warn!(
                    "Document {} defines axis {} differently, keeping the current one",
                    document.name, name
                );
                report.conflicts += 1;
            }
            Some(_) => debug!("Axis {} already present", name),
            None => fresh.push(node),
        }
    }
    let linked = register_all(registry, fresh, &mut report.axes);
    report.axes.rejected_links += restore_links(registry, &linked);

    let stored_components = load_component_list(store);
    for component in components {
        if !stored_components.contains(&component.id()) {
            continue;
        }
        for binding in manager.ensure_component(component.as_ref()).iter_mut() {
            if load_binding(store, binding) {
                report.bindings += 1;
            }
        }
    }
    info!(
        "Loaded document {}: {} axes added, {} conflicts, {} bindings",
        document.name, report.axes.loaded, report.conflicts, report.bindings
    );
    report
}
