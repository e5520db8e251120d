//! Control binding layer
//!
//! Maps resolved axis values onto component parameters. Components are only
//! reached through [`ComponentAdapter`], the layer never inspects them beyond
//! their declared parameter specs.

pub mod binding;
pub mod component;
pub mod error;
pub mod manager;

pub use binding::ControlBinding;
pub use component::{ComponentAdapter, ComponentId, ParameterKind, ParameterSpec, ParameterValue};
pub use error::ControlError;
pub use manager::{ControlManager, SharedControls};
