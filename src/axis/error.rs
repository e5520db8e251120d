// Axis registry errors, reported only for rejected structural edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AxisError {
    #[error("An axis named {0} already exists")]
    DuplicateName(String),

    #[error("Linking {from} to {to} would create a cycle")]
    CycleDetected { from: String, to: String },

    #[error("Axis name must not be empty")]
    EmptyName,

    #[error("No axis named {0}")]
    NotFound(String),

    #[error("Axis {0} is not a combinator")]
    NotCombinator(String),
}
