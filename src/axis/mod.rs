//! Named axis graph
//!
//! An axis is a named scalar source with an output in [-1, 1]:
//!
//! - [`device_axis`] - one channel of a physical device, with response shaping
//! - [`pointer_axis`] - pointer position relative to the screen
//! - [`chain_axis`] - combinator over up to two other axes, referenced by name
//!
//! The [`registry`] owns every node, keeps names unique, rejects edits that
//! would close a dependency cycle and evaluates the graph once per frame.

pub mod chain_axis;
pub mod device_axis;
pub mod error;
pub mod node;
pub mod pointer_axis;
pub mod registry;

pub use chain_axis::{ChainAxis, ChainMethod, DependencySlot};
pub use device_axis::DeviceAxis;
pub use error::AxisError;
pub use node::{AxisKind, AxisNode, AxisStatus, AxisType};
pub use pointer_axis::{PointerAxis, ScreenDimension};
pub use registry::{AxisOutput, AxisRegistry, SharedRegistry};
