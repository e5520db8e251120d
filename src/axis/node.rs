use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::chain_axis::ChainAxis;
use super::device_axis::DeviceAxis;
use super::pointer_axis::PointerAxis;
use crate::controller::device_sampler::SamplerError;

/// Per node health after the last evaluation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisStatus {
    #[default]
    Ok,
    MissingDependency,
    CycleDetected,
    UnknownDevice,
    ChannelOutOfRange,
}

impl AxisStatus {
    pub fn is_ok(self) -> bool {
        self == AxisStatus::Ok
    }
}

impl From<&SamplerError> for AxisStatus {
    fn from(error: &SamplerError) -> Self {
        match error {
            SamplerError::UnknownDevice(_) => AxisStatus::UnknownDevice,
            SamplerError::ChannelOutOfRange { .. } => AxisStatus::ChannelOutOfRange,
        }
    }
}

impl fmt::Display for AxisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisStatus::Ok => write!(f, "OK"),
            AxisStatus::MissingDependency => write!(f, "Missing dependency"),
            AxisStatus::CycleDetected => write!(f, "Cycle detected"),
            AxisStatus::UnknownDevice => write!(f, "Device not connected"),
            AxisStatus::ChannelOutOfRange => write!(f, "Channel out of range"),
        }
    }
}

/// Variant tag, persisted alongside the variant parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisType {
    Device,
    Pointer,
    Combinator,
}

impl fmt::Display for AxisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisType::Device => write!(f, "Device"),
            AxisType::Pointer => write!(f, "Pointer"),
            AxisType::Combinator => write!(f, "Combinator"),
        }
    }
}

impl FromStr for AxisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Device" => Ok(AxisType::Device),
            "Pointer" => Ok(AxisType::Pointer),
            "Combinator" => Ok(AxisType::Combinator),
            other => Err(format!("Unknown axis type: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AxisKind {
    Device(DeviceAxis),
    Pointer(PointerAxis),
    Combinator(ChainAxis),
}

impl AxisKind {
    pub fn axis_type(&self) -> AxisType {
        match self {
            AxisKind::Device(_) => AxisType::Device,
            AxisKind::Pointer(_) => AxisType::Pointer,
            AxisKind::Combinator(_) => AxisType::Combinator,
        }
    }
}

/// A named node of the axis graph
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisNode {
    name: String,
    pub kind: AxisKind,
    /// Transient preview nodes are never written to a store
    pub saveable: bool,
}

impl AxisNode {
    pub fn new(name: impl Into<String>, kind: AxisKind) -> Self {
        Self {
            name: name.into(),
            kind,
            saveable: true,
        }
    }

    pub fn device(name: impl Into<String>, axis: DeviceAxis) -> Self {
        Self::new(name, AxisKind::Device(axis))
    }

    pub fn pointer(name: impl Into<String>, axis: PointerAxis) -> Self {
        Self::new(name, AxisKind::Pointer(axis))
    }

    pub fn combinator(name: impl Into<String>, axis: ChainAxis) -> Self {
        Self::new(name, AxisKind::Combinator(axis))
    }

    pub fn transient(mut self) -> Self {
        self.saveable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // The registry index is keyed by name, renames go through the registry
    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn axis_type(&self) -> AxisType {
        self.kind.axis_type()
    }

    /// Names this node reads from
    pub fn dependencies(&self) -> Vec<&str> {
        match &self.kind {
            AxisKind::Combinator(chain) => chain.dependencies().collect(),
            _ => Vec::new(),
        }
    }

    /// Same variant and parameters, names aside
    pub fn same_parameters(&self, other: &AxisNode) -> bool {
        self.kind == other.kind
    }
}
