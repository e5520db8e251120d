//! Named, composable input axes bound to component parameters
//!
//! ```text
//! DeviceBackend ─▶ DeviceSampler ─▶ AxisRegistry ─▶ ControlManager ─▶ ComponentAdapter
//!                                        ▲   │
//!                              ConfigStore   Document (EmbeddedStore)
//! ```

pub mod axis;
pub mod commands;
pub mod config;
pub mod controller;
pub mod frame;
pub mod mapping;
pub mod persistence;
