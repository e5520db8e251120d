//! Control Manager - owns every binding, per component instance
//!
//! Bindings are created the first time a component is seen, one per declared
//! parameter, and live until the component is removed. Copying between
//! components works on parameter names only, so two components with partly
//! overlapping parameter sets can share their tuning.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::binding::ControlBinding;
use super::component::{ComponentAdapter, ComponentId};
use super::error::ControlError;
use crate::axis::registry::AxisRegistry;

/// Manager shared between the frame loop and editing collaborators
pub type SharedControls = Arc<RwLock<ControlManager>>;

#[derive(Debug, Default)]
pub struct ControlManager {
    bindings: HashMap<ComponentId, Vec<ControlBinding>>,
}

impl ControlManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedControls {
        Arc::new(RwLock::new(self))
    }

    /// Creates the missing bindings of a component from its parameter specs
    pub fn ensure_component(&mut self, component: &dyn ComponentAdapter) -> &mut Vec<ControlBinding> {
        let id = component.id();
        let bindings = self.bindings.entry(id).or_default();
        for spec in component.parameters() {
            if bindings.iter().all(|b| b.parameter != spec.name) {
                debug!("Creating binding for {} on {}", spec.name, id);
                bindings.push(ControlBinding::from_spec(id, &spec));
            }
        }
        bindings
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentId> {
        self.bindings.keys()
    }

    pub fn bindings(&self, component: ComponentId) -> &[ControlBinding] {
        self.bindings
            .get(&component)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn binding(&self, component: ComponentId, parameter: &str) -> Option<&ControlBinding> {
        self.bindings(component)
            .iter()
            .find(|b| b.parameter == parameter)
    }

    pub fn binding_mut(
        &mut self,
        component: ComponentId,
        parameter: &str,
    ) -> Option<&mut ControlBinding> {
        self.bindings
            .get_mut(&component)?
            .iter_mut()
            .find(|b| b.parameter == parameter)
    }

    /// Stores a binding, replacing the one with the same parameter
    pub fn insert_binding(&mut self, binding: ControlBinding) {
        let bindings = self.bindings.entry(binding.component).or_default();
        match bindings.iter_mut().find(|b| b.parameter == binding.parameter) {
            Some(existing) => *existing = binding,
            None => bindings.push(binding),
        }
    }

    /// Points a parameter at an axis, enabling it, or unbinds it
    pub fn bind(
        &mut self,
        component: ComponentId,
        parameter: &str,
        axis: Option<&str>,
    ) -> Result<(), ControlError> {
        let binding = self
            .binding_mut(component, parameter)
            .ok_or_else(|| ControlError::UnknownParameter {
                component,
                parameter: parameter.to_string(),
            })?;
        binding.axis = axis.map(String::from);
        binding.enabled = axis.is_some();
        info!("Bound {} of {} to {:?}", parameter, component, axis);
        Ok(())
    }

    /// Copies tuning for every parameter both components declare, returns the copied count
    pub fn copy_bindings(
        &mut self,
        source: ComponentId,
        target: ComponentId,
    ) -> Result<usize, ControlError> {
        let source_bindings = self
            .bindings
            .get(&source)
            .cloned()
            .ok_or(ControlError::UnknownComponent(source))?;
        let target_bindings = self
            .bindings
            .get_mut(&target)
            .ok_or(ControlError::UnknownComponent(target))?;

        let mut copied = 0;
        for binding in target_bindings.iter_mut() {
            if let Some(from) = source_bindings
                .iter()
                .find(|b| b.parameter == binding.parameter)
            {
                binding.copy_settings_from(from);
                copied += 1;
            }
        }
        debug!("Copied {} bindings from {} to {}", copied, source, target);
        Ok(copied)
    }

    /// Duplicates every binding of `source` onto a fresh component instance
    pub fn clone_component(
        &mut self,
        source: ComponentId,
        target: ComponentId,
    ) -> Result<usize, ControlError> {
        let cloned: Vec<ControlBinding> = self
            .bindings
            .get(&source)
            .ok_or(ControlError::UnknownComponent(source))?
            .iter()
            .cloned()
            .map(|mut binding| {
                binding.component = target;
                binding
            })
            .collect();
        let count = cloned.len();
        self.bindings.insert(target, cloned);
        info!("Cloned {} bindings from {} to {}", count, source, target);
        Ok(count)
    }

    pub fn remove_component(&mut self, component: ComponentId) -> Option<Vec<ControlBinding>> {
        let removed = self.bindings.remove(&component);
        if let Some(bindings) = &removed {
            info!("Removed {} bindings of {}", bindings.len(), component);
        }
        removed
    }

    /// Writes every live binding into its component, returns the number of writes
    pub fn apply(
        &mut self,
        registry: &AxisRegistry,
        components: &mut [Box<dyn ComponentAdapter>],
    ) -> usize {
        let mut written = 0;
        for component in components.iter_mut() {
            let bindings = self.ensure_component(component.as_ref());
            for binding in bindings.iter() {
                let Some(remapped) = binding.resolve(registry) else {
                    continue;
                };
                let value = binding.to_parameter_value(remapped);
                match component.write(&binding.parameter, value) {
                    Ok(()) => written += 1,
                    Err(e) => warn!(
                        "Failed to write {} of {}: {}",
                        binding.parameter,
                        component.name(),
                        e
                    ),
                }
            }
        }
        written
    }

    /// Enabled bindings whose axis currently exists
    pub fn active_controls<'a>(&'a self, registry: &AxisRegistry) -> Vec<&'a ControlBinding> {
        self.bindings
            .values()
            .flatten()
            .filter(|b| b.enabled)
            .filter(|b| b.axis.as_deref().is_some_and(|axis| registry.contains(axis)))
            .collect()
    }

    /// Axis names referenced by the bindings of the given components
    pub fn referenced_axes<'a>(
        &self,
        components: impl IntoIterator<Item = &'a ComponentId>,
    ) -> BTreeSet<String> {
        components
            .into_iter()
            .flat_map(|id| self.bindings(*id))
            .filter_map(|b| b.axis.clone())
            .collect()
    }
}
