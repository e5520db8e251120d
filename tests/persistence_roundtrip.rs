use axis_controls::axis::{
    AxisKind, AxisNode, AxisRegistry, ChainAxis, ChainMethod, DependencySlot, DeviceAxis,
    PointerAxis, ScreenDimension,
};
use axis_controls::controller::device_sampler::DeviceGuid;
use axis_controls::mapping::{
    ComponentAdapter, ComponentId, ControlError, ControlManager, ParameterSpec, ParameterValue,
};
use axis_controls::persistence::{
    load_document, load_profile, save_document, save_profile, ConfigStore, Document,
};

const PAD: DeviceGuid = DeviceGuid::from_bytes([0x42; 16]);

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

fn assert_same_node(expected: &AxisNode, actual: &AxisNode) {
    assert_eq!(expected.name(), actual.name());
    match (&expected.kind, &actual.kind) {
        (AxisKind::Device(a), AxisKind::Device(b)) => {
            assert_eq!((a.guid, a.channel, a.smooth, a.invert), (b.guid, b.channel, b.smooth, b.invert));
            assert!(close(a.sensitivity(), b.sensitivity()));
            assert!(close(a.curvature(), b.curvature()));
            assert!(close(a.deadzone(), b.deadzone()));
        }
        (AxisKind::Pointer(a), AxisKind::Pointer(b)) => {
            assert_eq!(a.dimension, b.dimension);
            assert!(close(a.center(), b.center()));
            assert!(close(a.range(), b.range()));
        }
        (AxisKind::Combinator(a), AxisKind::Combinator(b)) => assert_eq!(a, b),
        (a, b) => panic!("variant changed from {:?} to {:?}", a, b),
    }
}

fn sample_registry() -> AxisRegistry {
    let mut stick = DeviceAxis::new(PAD, 2);
    stick.invert = true;
    stick.smooth = true;
    stick.set_sensitivity(1.35);
    stick.set_curvature(1.8);
    stick.set_deadzone(0.07);

    let mut registry = AxisRegistry::new();
    registry
        .register(AxisNode::combinator("blend", ChainAxis::new(ChainMethod::Maximum)))
        .unwrap();
    registry.register(AxisNode::device("stick", stick)).unwrap();
    registry
        .register(AxisNode::pointer(
            "mouse-y",
            PointerAxis::new(ScreenDimension::Vertical, 0.25, 0.6),
        ))
        .unwrap();
    registry
        .set_dependency("blend", DependencySlot::First, Some("stick"))
        .unwrap();
    registry
        .set_dependency("blend", DependencySlot::Second, Some("mouse-y"))
        .unwrap();
    registry
        .register(AxisNode::pointer("preview", PointerAxis::default()).transient())
        .unwrap();
    registry
}

struct Camera {
    id: ComponentId,
}

impl ComponentAdapter for Camera {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::continuous("distance", 40.0, 60.0, 80.0).positive_only(),
            ParameterSpec::rate("orbit", -90.0, 0.0, 90.0),
        ]
    }

    fn write(&mut self, _: &str, _: ParameterValue) -> Result<(), ControlError> {
        Ok(())
    }
}

#[tokio::test]
async fn profile_survives_a_config_store_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles").join("default.toml");
    let source = sample_registry();

    let mut store = ConfigStore::open(&path).await;
    assert_eq!(save_profile(&mut store, &source), 3);
    store.save().await.unwrap();

    let reopened = ConfigStore::load(&path).await.unwrap();
    let mut restored = AxisRegistry::new();
    let report = load_profile(&reopened, &mut restored);
    assert_eq!(report.loaded, 3);
    assert_eq!(report.skipped, 0);
    assert!(!restored.contains("preview"));

    for node in source.nodes().filter(|node| node.saveable) {
        assert_same_node(node, restored.get(node.name()).unwrap());
    }
}

#[tokio::test]
async fn document_carries_bound_axes_and_bindings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crane.toml");
    let source = sample_registry();
    let camera = Camera {
        id: ComponentId::new_v4(),
    };

    let mut manager = ControlManager::new();
    manager.ensure_component(&camera);
    manager.bind(camera.id, "distance", Some("blend")).unwrap();
    if let Some(orbit) = manager.binding_mut(camera.id, "orbit") {
        orbit.max = 45.0;
    }

    let mut document = Document::new("crane");
    assert_eq!(save_document(&mut document, &source, &manager, &[camera.id]), 3);
    document.save_to(&path).await.unwrap();

    let loaded = Document::load_from(&path).await.unwrap();
    assert_eq!(loaded, document);

    let mut registry = AxisRegistry::new();
    let mut restored = ControlManager::new();
    let components: Vec<Box<dyn ComponentAdapter>> = vec![Box::new(Camera { id: camera.id })];
    let report = load_document(&loaded, &mut registry, &mut restored, &components);

    assert_eq!(report.axes.loaded, 3);
    assert_eq!(report.conflicts, 0);
    assert_eq!(report.bindings, 2);
    for name in ["stick", "mouse-y", "blend"] {
        assert_same_node(source.get(name).unwrap(), registry.get(name).unwrap());
    }
    assert_eq!(
        restored.binding(camera.id, "distance").unwrap().axis.as_deref(),
        Some("blend")
    );
    assert!(close(restored.binding(camera.id, "orbit").unwrap().max, 45.0));
}

#[tokio::test]
async fn document_for_unknown_axis_degrades_quietly() {
    let camera = Camera {
        id: ComponentId::new_v4(),
    };
    let mut manager = ControlManager::new();
    manager.ensure_component(&camera);
    manager.bind(camera.id, "distance", Some("gone")).unwrap();

    let mut document = Document::new("orphan");
    assert_eq!(
        save_document(&mut document, &AxisRegistry::new(), &manager, &[camera.id]),
        0
    );

    let mut registry = AxisRegistry::new();
    let mut restored = ControlManager::new();
    let components: Vec<Box<dyn ComponentAdapter>> = vec![Box::new(Camera { id: camera.id })];
    let report = load_document(&document, &mut registry, &mut restored, &components);

    assert_eq!(report.axes.loaded, 0);
    assert!(registry.is_empty());
    assert!(restored.active_controls(&registry).is_empty());
    assert_eq!(
        restored.binding(camera.id, "distance").unwrap().axis.as_deref(),
        Some("gone")
    );
}
