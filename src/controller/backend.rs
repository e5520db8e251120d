//! Raw device events and the backend seam that produces them
//!
//! A [`DeviceBackend`] is polled once per frame, between evaluation passes. It
//! turns whatever the platform delivers into [`RawDeviceEvent`]s keyed by the
//! stable device GUID, never by a connection index.

use std::collections::VecDeque;
use tracing::{debug, info};

use crate::controller::device_sampler::{DeviceGuid, DeviceInfo};

pub const HAT_CENTERED: u8 = 0x00;
pub const HAT_UP: u8 = 0x01;
pub const HAT_RIGHT: u8 = 0x02;
pub const HAT_DOWN: u8 = 0x04;
pub const HAT_LEFT: u8 = 0x08;

/// Event delivered by a backend between two frames
#[derive(Debug, Clone, PartialEq)]
pub enum RawDeviceEvent {
    Connected(DeviceInfo),
    Disconnected(DeviceGuid),
    /// Analog axis motion, already normalised to [-1, 1]
    AxisMotion {
        guid: DeviceGuid,
        axis: usize,
        value: f32,
    },
    /// Relative ball motion in raw device units
    BallMotion {
        guid: DeviceGuid,
        ball: usize,
        xrel: i32,
    },
    HatMotion {
        guid: DeviceGuid,
        hat: usize,
        value: u8,
    },
    Button {
        guid: DeviceGuid,
        button: usize,
        pressed: bool,
    },
    PointerMoved {
        x: f32,
        y: f32,
    },
    ScreenResized {
        width: f32,
        height: f32,
    },
}

// Backend errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to initialize device backend: {0}")]
    InitializationError(String),

    #[error("Failed to apply controller mappings: {0}")]
    MappingError(String),
}

/// Source of raw device events
pub trait DeviceBackend {
    /// Human readable backend name for logs and the console
    fn name(&self) -> &str;

    /// Drains every event that arrived since the previous poll
    fn poll(&mut self) -> Vec<RawDeviceEvent>;

    /// Installs a controller mapping database, returns the number of accepted entries
    fn apply_mappings(&mut self, mappings: &str) -> Result<usize, BackendError>;
}

/// Scripted backend used by tests and headless runs
///
/// Each call to [`DeviceBackend::poll`] hands out the next queued frame of events.
#[derive(Debug, Default)]
pub struct MockBackend {
    frames: VecDeque<Vec<RawDeviceEvent>>,
    applied_mappings: Vec<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the events delivered on one future poll
    pub fn push_frame(&mut self, events: Vec<RawDeviceEvent>) {
        self.frames.push_back(events);
    }

    pub fn applied_mappings(&self) -> &[String] {
        &self.applied_mappings
    }
}

impl DeviceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn poll(&mut self) -> Vec<RawDeviceEvent> {
        let events = self.frames.pop_front().unwrap_or_default();
        debug!("Mock backend delivering {} events", events.len());
        events
    }

    fn apply_mappings(&mut self, mappings: &str) -> Result<usize, BackendError> {
        let count = crate::controller::mapping_db::count_mappings(mappings);
        info!("Mock backend accepted {} controller mappings", count);
        self.applied_mappings.push(mappings.to_string());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_backend_hands_out_frames_in_order() {
        let guid = DeviceGuid::nil();
        let mut backend = MockBackend::new();
        backend.push_frame(vec![RawDeviceEvent::Disconnected(guid)]);
        backend.push_frame(Vec::new());

        assert_eq!(backend.poll(), vec![RawDeviceEvent::Disconnected(guid)]);
        assert!(backend.poll().is_empty());
        assert!(backend.poll().is_empty());
    }
}
