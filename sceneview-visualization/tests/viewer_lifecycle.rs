//! End-to-end tests of the viewer runtime with in-memory hosts and sources

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Notify;

use sceneview_core::{IdCyclePolicy, NodeId, NodeIdAllocator, ProgressCode};
use sceneview_visualization::{
    assign_progress, HeadlessContainer, HostContainer, LoadError, LoadFailureKind, ModelSource, ResizeSignal,
    StaticModelSource, SurfaceLayer, Viewer, ViewerBuilder, ViewerConfig, ViewerStatus, Viewport,
};

const FRAME: f32 = 1.0 / 60.0;

/// Scene description with a mesh root and two mesh children
fn three_mesh_scene() -> Value {
    json!({
        "metadata": { "version": 4.6, "type": "Object" },
        "geometries": [{
            "uuid": "tri",
            "type": "BufferGeometry",
            "data": {
                "attributes": {
                    "position": { "itemSize": 3, "array": [0, 0, 0, 1, 0, 0, 0, 1, 0] }
                }
            }
        }],
        "object": {
            "uuid": "root",
            "type": "Mesh",
            "name": "frame",
            "geometry": "tri",
            "children": [
                { "uuid": "a", "type": "Mesh", "name": "a", "geometry": "tri",
                  "matrix": [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 2, 0, 0, 1] },
                { "uuid": "b", "type": "Mesh", "name": "b", "geometry": "tri",
                  "matrix": [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 2, 1] }
            ]
        }
    })
}

/// The scene serialized into a string field of an API envelope
fn envelope(scene: Value) -> Value {
    json!({ "status": "ok", "result": { "file": scene.to_string() } })
}

struct Unreachable;

#[async_trait]
impl ModelSource for Unreachable {
    fn describe(&self) -> String {
        "unreachable".to_string()
    }

    async fn fetch(&self) -> Result<Value, LoadError> {
        Err(LoadError::HttpStatus(503))
    }
}

/// Holds the payload back until the gate opens
struct Gated {
    gate: Arc<Notify>,
    payload: Value,
}

#[async_trait]
impl ModelSource for Gated {
    fn describe(&self) -> String {
        "gated".to_string()
    }

    async fn fetch(&self) -> Result<Value, LoadError> {
        self.gate.notified().await;
        Ok(self.payload.clone())
    }
}

fn build(source: impl ModelSource + 'static, container: &HeadlessContainer) -> Viewer {
    ViewerBuilder::new(ViewerConfig::default())
        .source(Arc::new(source))
        .build(Box::new(container.clone()))
        .unwrap()
}

fn loaded_viewer() -> (Viewer, HeadlessContainer) {
    let container = HeadlessContainer::new(Viewport::new(800, 600));
    let viewer = build(StaticModelSource::new("memory", envelope(three_mesh_scene())), &container);
    (viewer, container)
}

#[test]
fn test_status_codes_follow_node_ids() {
    let ids = NodeIdAllocator::starting_at(5);
    let mut root = sceneview_io::extract_scene(&three_mesh_scene(), &ids).unwrap();
    assert_eq!(assign_progress(&mut root, &IdCyclePolicy), 3);

    for node in root.iter() {
        let status = node.progress().unwrap();
        assert_eq!(status.status_code as u32, node.id.get() % 4 + 1);
        let code = ProgressCode::from_code(status.status_code).unwrap();
        assert_eq!(status.status_text, code.text());
    }
    let first = root.find(NodeId(5)).unwrap().progress().unwrap();
    assert_eq!((first.status_code, first.status_text.as_str()), (2, "In Progress"));
    assert_eq!(IdCyclePolicy::code_for_id(8).text(), "Not Started");
}

#[tokio::test]
async fn test_loading_then_idle_exactly_once() {
    let gate = Arc::new(Notify::new());
    let container = HeadlessContainer::new(Viewport::new(800, 600));
    let mut viewer = build(
        Gated {
            gate: gate.clone(),
            payload: three_mesh_scene(),
        },
        &container,
    );

    // Published during construction, before the fetch can complete.
    assert_eq!(viewer.status(), ViewerStatus::Loading);
    let mut subscription = viewer.subscribe_status();
    let first = subscription.current();
    let collector = tokio::spawn(async move {
        let mut seen = vec![first];
        while let Some(status) = subscription.changed().await {
            seen.push(status);
        }
        seen
    });

    for _ in 0..3 {
        viewer.advance(FRAME);
        tokio::task::yield_now().await;
    }
    assert_eq!(viewer.status(), ViewerStatus::Loading);
    assert!(viewer.model().is_none());

    gate.notify_one();
    assert_eq!(viewer.finish_loading().await, ViewerStatus::Idle);
    drop(viewer);

    let seen = collector.await.unwrap();
    assert_eq!(seen, vec![ViewerStatus::Loading, ViewerStatus::Idle]);
}

#[tokio::test]
async fn test_load_completes_through_ticks() {
    let (mut viewer, _container) = loaded_viewer();
    for _ in 0..100 {
        if viewer.status() != ViewerStatus::Loading {
            break;
        }
        viewer.advance(FRAME);
        tokio::task::yield_now().await;
    }
    assert_eq!(viewer.status(), ViewerStatus::Idle);
    assert!(!viewer.is_loading());
    assert!(viewer.model().is_some());
}

#[tokio::test]
async fn test_successful_load_labels_every_mesh() {
    let (mut viewer, _container) = loaded_viewer();
    assert_eq!(viewer.finish_loading().await, ViewerStatus::Idle);

    let model = viewer.model().expect("model assigned");
    assert_eq!(model.mesh_count(), 3);
    let ids: Vec<u32> = model.iter().map(|node| node.id.get()).collect();
    assert_eq!(ids, vec![0, 1, 2]);

    let codes: BTreeSet<u8> = model
        .iter()
        .filter_map(|node| node.label.as_ref().map(|label| label.code))
        .collect();
    assert_eq!(codes, BTreeSet::from([1, 2, 3]));
    let texts: Vec<String> = model
        .iter()
        .filter_map(|node| node.label.as_ref().map(|label| label.text.clone()))
        .collect();
    assert_eq!(texts, vec!["Not Started", "In Progress", "Partially Installed"]);

    viewer.advance(FRAME);
    assert_eq!(viewer.labels().len(), 3);
    assert!(viewer.labels().iter().all(|label| label.visible));
    assert!(viewer.last_failure().is_none());
}

#[tokio::test]
async fn test_model_is_framed_by_camera() {
    let (mut viewer, _container) = loaded_viewer();
    viewer.finish_loading().await;
    viewer.advance(FRAME);

    let bounds = viewer.model().unwrap().world_bounds(sceneview_core::Matrix4::identity());
    let camera = viewer.camera();
    assert!((camera.target - bounds.center()).norm() < 1e-4);
    for corner in bounds.corners() {
        let ndc = camera.project(&corner).unwrap();
        assert!(ndc.x.abs() <= 1.0 + 1e-4 && ndc.y.abs() <= 1.0 + 1e-4);
    }
}

#[tokio::test]
async fn test_failed_fetch_publishes_error() {
    let container = HeadlessContainer::new(Viewport::new(800, 600));
    let mut viewer = build(Unreachable, &container);
    assert_eq!(viewer.finish_loading().await, ViewerStatus::Error);
    assert!(viewer.model().is_none());
    assert!(viewer.scene().is_empty());

    let failure = viewer.last_failure().unwrap();
    assert_eq!(failure.kind, LoadFailureKind::NetworkFailure);
    assert!(failure.message.contains("503"));

    // The render loop keeps going after a failed load.
    assert!(viewer.advance(FRAME));
}

#[tokio::test]
async fn test_payload_without_scene_publishes_error() {
    let container = HeadlessContainer::new(Viewport::new(800, 600));
    let source = StaticModelSource::new("memory", json!({ "status": "ok", "result": [] }));
    let mut viewer = build(source, &container);
    assert_eq!(viewer.finish_loading().await, ViewerStatus::Error);
    assert_eq!(
        viewer.last_failure().map(|failure| failure.kind),
        Some(LoadFailureKind::ExtractionFailure)
    );
}

#[tokio::test]
async fn test_scene_render_skipped_when_nothing_changed() {
    let (mut viewer, _container) = loaded_viewer();
    viewer.finish_loading().await;

    viewer.advance(FRAME);
    let after_first = viewer.frame_stats();
    viewer.advance(FRAME);
    let after_second = viewer.frame_stats();

    assert_eq!(after_second.scene_renders, after_first.scene_renders);
    assert_eq!(after_second.label_renders, after_first.label_renders + 1);

    viewer.update_viewer();
    viewer.advance(FRAME);
    assert_eq!(viewer.frame_stats().scene_renders, after_second.scene_renders + 1);
}

#[tokio::test]
async fn test_resize_updates_camera_and_both_renderers() {
    let signal = ResizeSignal::new(Viewport::new(800, 600));
    let container = HeadlessContainer::new(Viewport::new(800, 600));
    let mut viewer = ViewerBuilder::default()
        .source(Arc::new(Unreachable))
        .resize_signal(&signal)
        .build(Box::new(container.clone()))
        .unwrap();
    viewer.advance(FRAME);
    let renders = viewer.frame_stats().scene_renders;

    let resized = Viewport::new(1024, 512);
    signal.notify(resized);
    viewer.advance(FRAME);

    assert_eq!(viewer.camera().aspect_ratio, 2.0);
    assert_eq!(viewer.renderer_size(), resized);
    assert_eq!(viewer.label_renderer_size(), resized);
    assert_eq!(viewer.frame_stats().scene_renders, renders + 1);
}

#[tokio::test]
async fn test_dispose_releases_everything_once() {
    let signal = ResizeSignal::new(Viewport::new(800, 600));
    let container = HeadlessContainer::new(Viewport::new(800, 600));
    let mut viewer = ViewerBuilder::default()
        .source(Arc::new(StaticModelSource::new("memory", three_mesh_scene())))
        .resize_signal(&signal)
        .build(Box::new(container.clone()))
        .unwrap();
    viewer.finish_loading().await;
    assert_eq!(signal.subscriber_count(), 1);

    viewer.dispose();
    assert!(viewer.is_disposed());
    assert_eq!(signal.subscriber_count(), 0);
    assert!(container.layers().is_empty());
    assert!(viewer.scene().is_empty());
    assert!(viewer.model().is_none());

    let stats = viewer.frame_stats();
    signal.notify(Viewport::new(300, 300));
    assert!(!viewer.advance(FRAME));
    assert_eq!(viewer.frame_stats(), stats);
    assert_eq!(viewer.renderer_size(), Viewport::new(800, 600));

    viewer.dispose();
    assert!(viewer.is_disposed());
}

#[tokio::test]
async fn test_late_load_after_dispose_is_dropped() {
    let gate = Arc::new(Notify::new());
    let container = HeadlessContainer::new(Viewport::new(800, 600));
    let mut viewer = build(
        Gated {
            gate: gate.clone(),
            payload: three_mesh_scene(),
        },
        &container,
    );
    viewer.dispose();

    gate.notify_one();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(viewer.finish_loading().await, ViewerStatus::Loading);
    assert!(viewer.model().is_none());
    assert!(viewer.scene().is_empty());
}

#[tokio::test]
async fn test_viewers_are_independent() {
    let first = HeadlessContainer::new(Viewport::new(800, 600));
    let second = HeadlessContainer::new(Viewport::new(400, 400));
    let mut a = build(StaticModelSource::new("memory", three_mesh_scene()), &first);
    let mut b = build(Unreachable, &second);

    assert_eq!(a.finish_loading().await, ViewerStatus::Idle);
    assert_eq!(b.finish_loading().await, ViewerStatus::Error);
    assert_ne!(a.id(), b.id());

    b.dispose();
    assert!(first.has_layer(SurfaceLayer::Scene));
    assert!(a.model().is_some());
}

#[tokio::test]
async fn test_hidden_mesh_shows_no_label() {
    let mut scene = three_mesh_scene();
    scene["object"]["children"][1]["visible"] = json!(false);
    let container = HeadlessContainer::new(Viewport::new(800, 600));
    let mut viewer = build(StaticModelSource::new("memory", scene), &container);
    assert_eq!(viewer.finish_loading().await, ViewerStatus::Idle);
    viewer.advance(FRAME);

    assert_eq!(viewer.scene().mesh_draws().len(), 2);
    let labelled: Vec<u32> = viewer.labels().iter().map(|label| label.node.get()).collect();
    assert_eq!(labelled.len(), 2);
    assert!(!labelled.contains(&2));
}
