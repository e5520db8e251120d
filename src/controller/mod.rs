//! Device input subsystem
//!
//! 1. [`backend`] - Platform seam producing raw, GUID keyed device events
//! 2. [`device_sampler`] - Raw and smoothed per-device signal state
//! 3. [`mapping_db`] - Controller mapping database refresh
//!
//! # Architecture
//!
//! ```text
//! gilrs ──► GilrsBackend ──► RawDeviceEvent ──► DeviceSampler ──► read(guid, channel)
//!                 ▲
//!   MappingDbUpdater (text mappings)
//! ```
//!
//! The sampler is advanced once per frame by the frame driver, before any axis
//! is evaluated.

pub mod backend;
pub mod device_sampler;
pub mod gilrs_backend;
pub mod mapping_db;
