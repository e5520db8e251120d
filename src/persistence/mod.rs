//! # Persistence Module
//!
//! Axis definitions and control bindings are written to two kinds of flat,
//! typed key-value stores:
//!
//! ```text
//!  AxisRegistry ──save_profile──▶ ConfigStore   (global, one file per profile)
//!       ▲        ◀─load_profile──
//!       │
//!  ControlManager ─save_document─▶ Document.store (embedded, per document)
//!                 ◀─load_document─
//! ```
//!
//! ## Error Handling Strategy
//! Only file access reports errors. Missing or malformed keys never fail a load:
//! attributes fall back to their defaults, nodes without a valid type are
//! skipped and every repair is logged.

pub mod axis_codec;
pub mod binding_codec;
pub mod document;
pub mod profile;
pub mod store;

pub use document::{load_document, save_document, Document, DocumentReport};
pub use profile::{load_profile, save_profile, LoadReport};
pub use store::{ConfigStore, EmbeddedStore, KeyValueStore, PersistenceError, StoreValue};
