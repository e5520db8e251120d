//! Component side of the control binding layer
//!
//! A component is any controllable object that exposes a fixed set of
//! parameters. The binding layer only learns about a component through
//! [`ComponentAdapter`]: the declared parameter specs and a write call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::mapping::error::ControlError;

/// Stable identity of a component instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(Uuid);

impl ComponentId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ComponentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// How a parameter consumes its remapped value
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// On when the remapped value reaches `threshold`
    Toggle { threshold: f32 },
    /// Absolute value, e.g. a steering angle
    Continuous,
    /// Relative input integrated by the component, e.g. a rotation speed
    Rate,
}

/// Declared parameter of a component, with the defaults of a fresh binding
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    /// Bounds the component accepts
    pub domain: (f32, f32),
    pub min: f32,
    pub center: f32,
    pub max: f32,
    pub positive_only: bool,
}

impl ParameterSpec {
    /// Bidirectional parameter over `[min, max]`
    pub fn continuous(name: impl Into<String>, min: f32, center: f32, max: f32) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Continuous,
            domain: (min.min(max), min.max(max)),
            min,
            center,
            max,
            positive_only: false,
        }
    }

    pub fn rate(name: impl Into<String>, min: f32, center: f32, max: f32) -> Self {
        Self {
            kind: ParameterKind::Rate,
            ..Self::continuous(name, min, center, max)
        }
    }

    /// On/off parameter driven past the halfway point
    pub fn toggle(name: impl Into<String>) -> Self {
        Self {
            kind: ParameterKind::Toggle { threshold: 0.5 },
            ..Self::continuous(name, 0.0, 0.0, 1.0)
        }
    }

    /// Magnitude only: negative axis values collapse onto `center`
    pub fn positive_only(mut self) -> Self {
        self.positive_only = true;
        self
    }
}

/// Value written into a component parameter
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParameterValue {
    Toggle(bool),
    Continuous(f32),
    Rate(f32),
}

/// Boundary to a controllable component
pub trait ComponentAdapter: Send + Sync + 'static {
    fn id(&self) -> ComponentId;

    /// Human readable component name for logs
    fn name(&self) -> String {
        format!("Component {}", self.id())
    }

    /// Parameter set of this component, names are unique
    fn parameters(&self) -> Vec<ParameterSpec>;

    /// Writes a remapped value, the only call the binding layer makes into a component
    fn write(&mut self, parameter: &str, value: ParameterValue) -> Result<(), ControlError>;
}
