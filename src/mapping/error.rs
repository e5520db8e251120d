//! Errors of the control binding layer

use thiserror::Error;

use super::component::ComponentId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    /// The component has no parameter of that name
    #[error("Unknown parameter {parameter} on component {component}")]
    UnknownParameter {
        component: ComponentId,
        parameter: String,
    },

    /// Nothing is registered under the component id
    #[error("Unknown component: {0}")]
    UnknownComponent(ComponentId),

    /// The component refused the value
    #[error("Component rejected value: {0}")]
    WriteRejected(String),
}
