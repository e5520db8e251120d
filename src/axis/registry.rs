//! Axis Registry - named node arena and the per-frame evaluation pass
//!
//! Nodes live in an arena of slots and are found through a name index.
//! Combinators store the *names* of their dependencies and are resolved through
//! the index on every evaluation, so a dependency may be missing, removed,
//! renamed or registered later without leaving a dangling reference behind.
//!
//! # Structural edits
//!
//! Every edit that can introduce an edge (`register`, `rename`,
//! `set_dependency`) first runs a depth-first reachability check over the graph
//! as it would look after the edit. An edit that would let a node reach itself
//! is rejected with [`AxisError::CycleDetected`] and leaves the registry
//! untouched.
//!
//! # Evaluation
//!
//! ```text
//! evaluate(sampler)
//!   └─ for every node: resolve(id), a post-order walk over an explicit stack
//!        Pending     ─► InProgress, push pending dependencies
//!        InProgress  ─► dependencies done: compute ─► Done(output)
//!        dependency already InProgress ─► cycle slipped past the edit checks: 0, CycleDetected
//!        Done        ─► memoized output
//! ```
//!
//! Each node is computed at most once per frame, and the call depth stays
//! constant however long a dependency chain gets.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::chain_axis::{ChainMethod, DependencySlot};
use super::device_axis::DeviceAxis;
use super::error::AxisError;
use super::node::{AxisKind, AxisNode, AxisStatus};
use super::pointer_axis::PointerAxis;
use crate::controller::device_sampler::DeviceSampler;

pub type AxisId = usize;

/// Registry shared between the frame loop, the command console and persistence
pub type SharedRegistry = Arc<RwLock<AxisRegistry>>;

/// Result of evaluating one node in one frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisOutput {
    pub value: f32,
    pub status: AxisStatus,
}

impl AxisOutput {
    fn fault(status: AxisStatus) -> Self {
        Self { value: 0.0, status }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Memo {
    Pending,
    InProgress { cycle: bool },
    Done(AxisOutput),
}

#[derive(Debug, Default)]
pub struct AxisRegistry {
    slots: Vec<Option<AxisNode>>,
    index: HashMap<String, AxisId>,
    memo: Vec<Memo>,
    // Vacated slots, reused by `register`
    free: Vec<AxisId>,
    frame: u64,
}

impl AxisRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AxisNode> {
        self.index
            .get(name)
            .and_then(|id| self.slots.get(*id))
            .and_then(Option::as_ref)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut AxisNode> {
        let id = *self.index.get(name)?;
        self.slots.get_mut(id).and_then(Option::as_mut)
    }

    /// Device parameters can change freely, they never add edges
    pub fn device_axis_mut(&mut self, name: &str) -> Option<&mut DeviceAxis> {
        match &mut self.get_mut(name)?.kind {
            AxisKind::Device(axis) => Some(axis),
            _ => None,
        }
    }

    pub fn pointer_axis_mut(&mut self, name: &str) -> Option<&mut PointerAxis> {
        match &mut self.get_mut(name)?.kind {
            AxisKind::Pointer(axis) => Some(axis),
            _ => None,
        }
    }

    /// Live nodes in slot order
    pub fn nodes(&self) -> impl Iterator<Item = &AxisNode> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Names of the combinators that reference `name`
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.nodes()
            .filter(|node| node.dependencies().contains(&name))
            .map(AxisNode::name)
            .collect()
    }

    pub fn register(&mut self, node: AxisNode) -> Result<AxisId, AxisError> {
        let name = node.name().to_string();
        if name.is_empty() {
            return Err(AxisError::EmptyName);
        }
        if self.contains(&name) {
            warn!("Rejected registration of {}: name already taken", name);
            return Err(AxisError::DuplicateName(name));
        }

        let edges: Vec<String> = node.dependencies().into_iter().map(String::from).collect();
        if let Some(to) = self.find_cycle(&name, &|n: &str| {
            if n == name {
                edges.clone()
            } else {
                self.edges_of(n)
            }
        }) {
            warn!("Rejected registration of {}: dependency {} leads back to it", name, to);
            return Err(AxisError::CycleDetected { from: name, to });
        }

        let axis_type = node.axis_type();
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                if let Some(memo) = self.memo.get_mut(id) {
                    *memo = Memo::Pending;
                }
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        debug!("Registered {} axis {} as #{}", axis_type, name, id);
        self.index.insert(name.clone(), id);

        let relinked = self.dependents(&name).len();
        if relinked > 0 {
            info!("Axis {} resolved {} waiting references", name, relinked);
        }
        Ok(id)
    }

    /// Renames a node and rewrites every reference to the old name
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), AxisError> {
        if new.is_empty() {
            return Err(AxisError::EmptyName);
        }
        let id = *self
            .index
            .get(old)
            .ok_or_else(|| AxisError::NotFound(old.to_string()))?;
        if old == new {
            return Ok(());
        }
        if self.contains(new) {
            warn!("Rejected rename of {} to {}: name already taken", old, new);
            return Err(AxisError::DuplicateName(new.to_string()));
        }

        // Nodes already waiting on `new` start resolving to this node
        if let Some(to) = self.find_cycle(new, &|n: &str| {
            let source = if n == new {
                old
            } else if n == old {
                return Vec::new();
            } else {
                n
            };
            self.edges_of(source)
                .into_iter()
                .map(|edge| if edge == old { new.to_string() } else { edge })
                .collect()
        }) {
            warn!("Rejected rename of {} to {}: {} leads back to it", old, new, to);
            return Err(AxisError::CycleDetected {
                from: new.to_string(),
                to,
            });
        }

        self.index.remove(old);
        self.index.insert(new.to_string(), id);
        let mut rewritten = 0;
        for node in self.slots.iter_mut().flatten() {
            if node.name() == old {
                node.set_name(new.to_string());
            }
            if let AxisKind::Combinator(chain) = &mut node.kind {
                if chain.rename_dependency(old, new) {
                    rewritten += 1;
                }
            }
        }
        info!(
            "Renamed axis {} to {}, {} references rewritten",
            old, new, rewritten
        );
        Ok(())
    }

    /// Points one slot of a combinator at another axis, or clears it
    pub fn set_dependency(
        &mut self,
        name: &str,
        slot: DependencySlot,
        target: Option<&str>,
    ) -> Result<(), AxisError> {
        let node = self
            .get(name)
            .ok_or_else(|| AxisError::NotFound(name.to_string()))?;
        let AxisKind::Combinator(chain) = &node.kind else {
            return Err(AxisError::NotCombinator(name.to_string()));
        };

        if let Some(target) = target {
            if target.is_empty() {
                return Err(AxisError::EmptyName);
            }
            let mut pending = chain.clone();
            pending.set_slot(slot, Some(target.to_string()));
            let edges: Vec<String> = pending.dependencies().map(String::from).collect();
            if let Some(to) = self.find_cycle(name, &|n: &str| {
                if n == name {
                    edges.clone()
                } else {
                    self.edges_of(n)
                }
            }) {
                warn!(
                    "Rejected link {} -> {}: {} leads back to {}",
                    name, target, to, name
                );
                return Err(AxisError::CycleDetected {
                    from: name.to_string(),
                    to: target.to_string(),
                });
            }
        }

        if let Some(AxisKind::Combinator(chain)) = self.get_mut(name).map(|node| &mut node.kind) {
            chain.set_slot(slot, target.map(String::from));
        }
        debug!("Linked {} {:?} to {:?}", name, slot, target);
        Ok(())
    }

    pub fn set_method(&mut self, name: &str, method: ChainMethod) -> Result<(), AxisError> {
        match self.get_mut(name).map(|node| &mut node.kind) {
            Some(AxisKind::Combinator(chain)) => {
                chain.method = method;
                Ok(())
            }
            Some(_) => Err(AxisError::NotCombinator(name.to_string())),
            None => Err(AxisError::NotFound(name.to_string())),
        }
    }

    /// Removes a node, dependents keep the name and report a missing dependency
    pub fn remove(&mut self, name: &str) -> Option<AxisNode> {
        let id = self.index.remove(name)?;
        let node = self.slots.get_mut(id).and_then(Option::take);
        self.free.push(id);
        let dependents = self.dependents(name);
        if dependents.is_empty() {
            info!("Removed axis {}", name);
        } else {
            warn!(
                "Removed axis {}, still referenced by {}",
                name,
                dependents.join(", ")
            );
        }
        node
    }

    pub fn clear(&mut self) {
        info!("Clearing {} axes", self.len());
        self.slots.clear();
        self.index.clear();
        self.memo.clear();
        self.free.clear();
    }

    fn edges_of(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|node| node.dependencies().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    // Depth first search from `origin`'s edges; returns the first edge that leads back to it
    fn find_cycle(&self, origin: &str, edges_of: &dyn Fn(&str) -> Vec<String>) -> Option<String> {
        for start in edges_of(origin) {
            let mut visited: HashSet<String> = HashSet::new();
            let mut stack = vec![start.clone()];
            while let Some(current) = stack.pop() {
                if current == origin {
                    return Some(start);
                }
                if !visited.insert(current.clone()) {
                    continue;
                }
                stack.extend(edges_of(&current));
            }
        }
        None
    }

    /// Evaluates every node once for the current frame
    pub fn evaluate(&mut self, sampler: &DeviceSampler) {
        self.frame += 1;
        self.memo.clear();
        self.memo.resize(self.slots.len(), Memo::Pending);

        for id in 0..self.slots.len() {
            if self.slots[id].is_some() {
                resolve(&self.slots, &self.index, &mut self.memo, id, sampler);
            }
        }
        debug!("Evaluated {} axes for frame {}", self.len(), self.frame);
    }

    /// Output of the last evaluation, `None` for unknown or not yet evaluated axes
    pub fn output(&self, name: &str) -> Option<AxisOutput> {
        let id = *self.index.get(name)?;
        match self.memo.get(id)? {
            Memo::Done(output) => Some(*output),
            _ => None,
        }
    }

    pub fn value(&self, name: &str) -> Option<f32> {
        self.output(name).map(|output| output.value)
    }

    pub fn status(&self, name: &str) -> Option<AxisStatus> {
        self.output(name).map(|output| output.status)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

// Dependency slots of `id` that currently resolve to a live node
fn dependency_ids(
    slots: &[Option<AxisNode>],
    index: &HashMap<String, AxisId>,
    id: AxisId,
) -> Vec<AxisId> {
    let Some(AxisKind::Combinator(chain)) = slots[id].as_ref().map(|node| &node.kind) else {
        return Vec::new();
    };
    chain
        .dependencies()
        .filter_map(|name| index.get(name).copied())
        .filter(|dep| slots[*dep].is_some())
        .collect()
}

fn resolve(
    slots: &[Option<AxisNode>],
    index: &HashMap<String, AxisId>,
    memo: &mut [Memo],
    root: AxisId,
    sampler: &DeviceSampler,
) {
    let mut stack = vec![root];
    while let Some(&id) = stack.last() {
        match memo[id] {
            Memo::Done(_) => {
                stack.pop();
            }
            Memo::Pending => {
                memo[id] = Memo::InProgress { cycle: false };
                for dep in dependency_ids(slots, index, id) {
                    match memo[dep] {
                        Memo::Pending => stack.push(dep),
                        // Only nodes still on the current path are in progress
                        Memo::InProgress { .. } => memo[dep] = Memo::InProgress { cycle: true },
                        Memo::Done(_) => {}
                    }
                }
            }
            Memo::InProgress { cycle } => {
                let output = if cycle {
                    AxisOutput::fault(AxisStatus::CycleDetected)
                } else {
                    compute(slots, index, memo, id, sampler)
                };
                memo[id] = Memo::Done(output);
                stack.pop();
            }
        }
    }
}

// Output of one node whose dependencies are already resolved or in progress
fn compute(
    slots: &[Option<AxisNode>],
    index: &HashMap<String, AxisId>,
    memo: &[Memo],
    id: AxisId,
    sampler: &DeviceSampler,
) -> AxisOutput {
    match slots[id].as_ref().map(|node| &node.kind) {
        Some(AxisKind::Device(axis)) => match axis.evaluate(sampler) {
            Ok(value) => AxisOutput {
                value,
                status: AxisStatus::Ok,
            },
            Err(e) => AxisOutput::fault(AxisStatus::from(&e)),
        },
        Some(AxisKind::Pointer(axis)) => AxisOutput {
            value: axis.evaluate(sampler.pointer()),
            status: AxisStatus::Ok,
        },
        Some(AxisKind::Combinator(chain)) => {
            let mut missing = chain.first().is_none() && chain.second().is_none();
            let mut inherited = AxisStatus::Ok;
            let mut pull = |dependency: Option<&str>| -> Option<f32> {
                let name = dependency?;
                match index.get(name).copied().filter(|dep| slots[*dep].is_some()) {
                    Some(dep) => {
                        let output = match memo[dep] {
                            Memo::Done(output) => output,
                            _ => AxisOutput::fault(AxisStatus::CycleDetected),
                        };
                        if inherited.is_ok() {
                            inherited = output.status;
                        }
                        Some(output.value)
                    }
                    None => {
                        missing = true;
                        None
                    }
                }
            };
            let first = pull(chain.first());
            let second = pull(chain.second());
            let status = if missing {
                AxisStatus::MissingDependency
            } else {
                inherited
            };
            AxisOutput {
                value: chain.combine(first, second),
                status,
            }
        }
        None => AxisOutput::fault(AxisStatus::MissingDependency),
    }
}
