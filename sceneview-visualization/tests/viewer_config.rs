use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

use sceneview_core::{NodeIdAllocator, ProgressCode, ProgressPolicy, ProgressStatus, SceneNode};
use sceneview_visualization::{
    CameraConfig, ControlAction, ControlInput, ControlsConfig, HeadlessContainer, PointerButton,
    StaticModelSource, Viewer, ViewerBuilder, ViewerConfig, ViewerStatus, Viewport,
};

fn two_panels() -> Value {
    json!({
        "metadata": { "type": "Object" },
        "geometries": [{
            "uuid": "quad",
            "type": "BufferGeometry",
            "data": {
                "attributes": {
                    "position": { "itemSize": 3, "array": [0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0] }
                },
                "index": { "array": [0, 1, 2, 0, 2, 3] }
            }
        }],
        "object": {
            "type": "Group",
            "children": [
                { "type": "Mesh", "name": "left", "geometry": "quad" },
                { "type": "Mesh", "name": "right", "geometry": "quad",
                  "matrix": [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 1, 0, 0, 1] }
            ]
        }
    })
}

fn container() -> Box<HeadlessContainer> {
    Box::new(HeadlessContainer::new(Viewport::new(640, 480)))
}

fn builder(config: ViewerConfig) -> ViewerBuilder {
    ViewerBuilder::new(config).source(Arc::new(StaticModelSource::new("memory", two_panels())))
}

/// Reports every panel as done
struct AllInstalled;

impl ProgressPolicy for AllInstalled {
    fn status_for(&self, _node: &SceneNode) -> ProgressStatus {
        ProgressStatus::new(ProgressCode::Installed)
    }
}

#[tokio::test]
async fn test_custom_progress_policy() {
    let mut viewer = builder(ViewerConfig::default())
        .progress_policy(Arc::new(AllInstalled))
        .build(container())
        .unwrap();
    assert_eq!(viewer.finish_loading().await, ViewerStatus::Idle);

    let model = viewer.model().unwrap();
    let labels: Vec<(u8, &str)> = model
        .iter()
        .filter_map(|node| node.label.as_ref())
        .map(|label| (label.code, label.text.as_str()))
        .collect();
    assert_eq!(labels, vec![(4, "Installed"), (4, "Installed")]);
}

#[tokio::test]
async fn test_shared_allocator_keeps_ids_unique() {
    let ids = NodeIdAllocator::new();
    let mut first = builder(ViewerConfig::default())
        .node_ids(ids.clone())
        .build(container())
        .unwrap();
    let mut second = builder(ViewerConfig::default())
        .node_ids(ids.clone())
        .build(container())
        .unwrap();
    first.finish_loading().await;
    second.finish_loading().await;

    let collect = |viewer: &Viewer| -> BTreeSet<u32> {
        viewer.model().unwrap().iter().map(|node| node.id.get()).collect()
    };
    let (a, b) = (collect(&first), collect(&second));
    assert!(a.is_disjoint(&b));
    assert_eq!(a.union(&b).copied().collect::<Vec<_>>(), (0..6).collect::<Vec<_>>());
    assert_eq!(ids.peek().get(), 6);
}

#[tokio::test]
async fn test_config_builders_reach_the_viewer() {
    let config = ViewerConfig::default()
        .with_background([0.1, 0.2, 0.3])
        .with_camera(CameraConfig {
            fov_degrees: 50.0,
            ..CameraConfig::default()
        })
        .with_controls(ControlsConfig {
            right_button: ControlAction::None,
            ..ControlsConfig::default()
        })
        .with_model_rotation_x(0.0);
    let mut viewer = builder(config).build(container()).unwrap();

    assert_eq!(viewer.scene().background, [0.1, 0.2, 0.3]);
    assert!((viewer.camera().fov - 50f32.to_radians()).abs() < 1e-6);
    let press = ControlInput::PointerDown {
        button: PointerButton::Right,
        x: 10.0,
        y: 10.0,
    };
    assert!(!viewer.handle_input(press));

    viewer.finish_loading().await;
    let root = viewer.model().unwrap();
    let z = root.transform.transform_vector(&sceneview_core::Vector3f::z());
    assert!((z.z - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_clear_highlight() {
    let mut viewer = builder(ViewerConfig::default()).build(container()).unwrap();
    viewer.finish_loading().await;
    let model_id = viewer.model_id().unwrap();
    assert_eq!(viewer.model().map(|model| model.id), Some(model_id));

    viewer.highlight_object(model_id).unwrap();
    viewer.advance(0.016);
    let renders = viewer.frame_stats().scene_renders;

    viewer.clear_highlight();
    assert_eq!(viewer.scene().highlighted(), None);
    viewer.advance(0.016);
    assert_eq!(viewer.frame_stats().scene_renders, renders + 1);

    // Nothing to clear the second time, so no redraw either.
    viewer.clear_highlight();
    viewer.advance(0.016);
    assert_eq!(viewer.frame_stats().scene_renders, renders + 1);
}
