//! Frame driver - one evaluation pass per tick
//!
//! Every frame walks the same three stages, encoded as states so a stage can
//! not be skipped or run twice:
//!
//! ```text
//!   Idle ──sample()──▶ Sampled ──evaluate()──▶ Evaluated ──apply()──▶ Idle
//!    │                   │                        │
//!    │ mapping updates,  │ registry write lock,   │ registry read lock,
//!    │ backend events,   │ memoized graph pass    │ bindings written
//!    │ smoothing tick    │                        │ into components
//! ```
//!
//! Device events and mapping database updates are only applied in `sample`,
//! so the registry never sees a device list change mid-evaluation.

use statum::{machine, state};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::axis::registry::SharedRegistry;
use crate::controller::backend::DeviceBackend;
use crate::controller::device_sampler::{DeviceChange, DeviceSampler};
use crate::controller::mapping_db::MappingDbUpdate;
use crate::mapping::component::ComponentAdapter;
use crate::mapping::manager::SharedControls;

#[state]
#[derive(Debug, Clone)]
pub enum FrameState {
    Idle,
    Sampled,
    Evaluated,
}

#[machine]
pub struct FrameDriver<S: FrameState> {
    backend: Box<dyn DeviceBackend>,
    sampler: DeviceSampler,
    registry: SharedRegistry,
    controls: SharedControls,
    components: Vec<Box<dyn ComponentAdapter>>,
    mapping_updates: Option<mpsc::Receiver<MappingDbUpdate>>,
    frames: u64,
}

// Available in every stage
impl<S: FrameState> FrameDriver<S> {
    pub fn sampler(&self) -> &DeviceSampler {
        &self.sampler
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn controls(&self) -> &SharedControls {
        &self.controls
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Completed frames
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameDriver<Idle> {
    pub fn create(
        backend: Box<dyn DeviceBackend>,
        sampler: DeviceSampler,
        registry: SharedRegistry,
        controls: SharedControls,
    ) -> Self {
        info!("Creating frame driver on the {} backend", backend.name());
        Self::new(backend, sampler, registry, controls, Vec::new(), None, 0)
    }

    /// Routes mapping database updates into the backend between frames
    pub fn with_mapping_updates(mut self, receiver: mpsc::Receiver<MappingDbUpdate>) -> Self {
        self.mapping_updates = Some(receiver);
        self
    }

    pub fn add_component(&mut self, component: Box<dyn ComponentAdapter>) {
        info!("Driving {}", component.name());
        self.components.push(component);
    }

    pub fn components(&self) -> &[Box<dyn ComponentAdapter>] {
        &self.components
    }

    fn apply_mapping_updates(&mut self) {
        let Some(receiver) = self.mapping_updates.as_mut() else {
            return;
        };
        loop {
            match receiver.try_recv() {
                Ok(update) => match self.backend.apply_mappings(&update.mappings) {
                    Ok(accepted) => info!(
                        "Installed {} of {} controller mappings from {} (fetched {})",
                        accepted,
                        update.entries,
                        update.source.display(),
                        update.fetched_at.format("%H:%M:%S")
                    ),
                    Err(e) => warn!("Failed to install controller mappings: {}", e),
                },
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    debug!("Mapping updater gone, no further updates");
                    self.mapping_updates = None;
                    break;
                }
            }
        }
    }

    /// Drains the backend and advances the sampler by `delta`
    pub fn sample(mut self, delta: Duration) -> FrameDriver<Sampled> {
        self.apply_mapping_updates();

        let events = self.backend.poll();
        if !events.is_empty() {
            debug!("Frame {}: {} device events", self.frames, events.len());
        }
        self.sampler.handle_events(events);
        for change in self.sampler.take_changes() {
            match change {
                DeviceChange::Added(guid) => debug!("Device list gained {}", guid),
                DeviceChange::Removed(guid) => debug!("Device list lost {}", guid),
            }
        }
        self.sampler.sample(delta);
        self.transition()
    }
}

impl FrameDriver<Sampled> {
    /// Evaluates every axis against the sampled device state
    pub async fn evaluate(self) -> FrameDriver<Evaluated> {
        {
            let mut registry = self.registry.write().await;
            registry.evaluate(&self.sampler);
        }
        self.transition()
    }
}

impl FrameDriver<Evaluated> {
    /// Writes the bound parameters of every driven component
    pub async fn apply(mut self) -> FrameDriver<Idle> {
        {
            let registry = self.registry.read().await;
            let mut controls = self.controls.write().await;
            let written = controls.apply(&registry, &mut self.components);
            debug!("Frame {}: {} parameter writes", self.frames, written);
        }
        self.frames += 1;
        self.transition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{AxisNode, AxisRegistry, AxisStatus, DeviceAxis, PointerAxis};
    use crate::controller::backend::{MockBackend, RawDeviceEvent};
    use crate::controller::device_sampler::{DeviceGuid, DeviceInfo, SamplerSettings};
    use crate::mapping::component::{ComponentId, ParameterSpec, ParameterValue};
    use crate::mapping::error::ControlError;
    use crate::mapping::manager::ControlManager;
    use chrono::Local;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    type Writes = Arc<Mutex<Vec<(String, ParameterValue)>>>;

    struct Thruster {
        id: ComponentId,
        writes: Writes,
    }

    impl ComponentAdapter for Thruster {
        fn id(&self) -> ComponentId {
            self.id
        }

        fn parameters(&self) -> Vec<ParameterSpec> {
            vec![ParameterSpec::continuous("thrust", 0.0, 1.0, 2.0).positive_only()]
        }

        fn write(&mut self, parameter: &str, value: ParameterValue) -> Result<(), ControlError> {
            self.writes.lock().unwrap().push((parameter.to_string(), value));
            Ok(())
        }
    }

    const STICK: DeviceGuid = DeviceGuid::from_bytes([7; 16]);

    fn driver_with(
        backend: MockBackend,
        registry: AxisRegistry,
        axis: &str,
    ) -> (FrameDriver<Idle>, Writes) {
        let writes = Writes::default();
        let thruster = Thruster {
            id: ComponentId::new_v4(),
            writes: writes.clone(),
        };
        let mut manager = ControlManager::new();
        manager.ensure_component(&thruster);
        manager.bind(thruster.id, "thrust", Some(axis)).unwrap();

        let mut driver = FrameDriver::create(
            Box::new(backend),
            DeviceSampler::new(SamplerSettings::default()),
            registry.shared(),
            manager.shared(),
        );
        driver.add_component(Box::new(thruster));
        (driver, writes)
    }

    async fn step(driver: FrameDriver<Idle>) -> FrameDriver<Idle> {
        driver
            .sample(Duration::from_millis(16))
            .evaluate()
            .await
            .apply()
            .await
    }

    #[tokio::test]
    async fn pointer_reaches_component_in_one_frame() {
        let mut backend = MockBackend::new();
        backend.push_frame(vec![
            RawDeviceEvent::ScreenResized {
                width: 1000.0,
                height: 800.0,
            },
            RawDeviceEvent::PointerMoved { x: 750.0, y: 400.0 },
        ]);
        let mut registry = AxisRegistry::new();
        registry
            .register(AxisNode::pointer("mouse", PointerAxis::default()))
            .unwrap();

        let (driver, writes) = driver_with(backend, registry, "mouse");
        let driver = step(driver).await;

        assert_eq!(driver.frames(), 1);
        assert_eq!(driver.registry().read().await.value("mouse"), Some(1.0));
        assert_eq!(
            writes.lock().unwrap().as_slice(),
            [("thrust".to_string(), ParameterValue::Continuous(2.0))]
        );
    }

    #[tokio::test]
    async fn disconnect_between_frames_stops_writes() {
        let mut backend = MockBackend::new();
        backend.push_frame(vec![
            RawDeviceEvent::Connected(DeviceInfo::joystick(STICK, "Stick", 2, 0, 0, 4)),
            RawDeviceEvent::AxisMotion {
                guid: STICK,
                axis: 1,
                value: 0.5,
            },
        ]);
        backend.push_frame(vec![RawDeviceEvent::Disconnected(STICK)]);
        let mut registry = AxisRegistry::new();
        registry
            .register(AxisNode::device("throttle", DeviceAxis::new(STICK, 1)))
            .unwrap();

        let (driver, writes) = driver_with(backend, registry, "throttle");
        let driver = step(driver).await;
        assert_eq!(driver.registry().read().await.value("throttle"), Some(0.5));
        assert_eq!(writes.lock().unwrap().len(), 1);

        let driver = step(driver).await;
        assert_eq!(
            driver.registry().read().await.status("throttle"),
            Some(AxisStatus::UnknownDevice)
        );
        assert_eq!(driver.sampler().device_count(), 0);
        assert_eq!(writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mapping_updates_are_installed_between_frames() {
        let (sender, receiver) = mpsc::channel(4);
        sender
            .send(MappingDbUpdate {
                mappings: "03000000de280000ff11000001000000,Steam Virtual Gamepad,a:b0,".into(),
                entries: 1,
                source: PathBuf::from("gamecontrollerdb.txt"),
                fetched_at: Local::now(),
            })
            .await
            .unwrap();
        drop(sender);

        let (driver, _) = driver_with(MockBackend::new(), AxisRegistry::new(), "none");
        let driver = step(driver.with_mapping_updates(receiver)).await;
        let driver = step(driver).await;
        assert_eq!(driver.frames(), 2);
        assert!(driver.mapping_updates.is_none());
    }
}
