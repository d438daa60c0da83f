//! The egui layer driven with synthetic pointer input

use serde_json::{json, Value};
use std::sync::Arc;

use egui::{Event, Modifiers, PointerButton, Pos2, RawInput, Rect, Shape, Vec2};
use sceneview_core::NodeId;
use sceneview_visualization::{
    HeadlessContainer, HierarchyResponse, StaticModelSource, Viewer, ViewerBuilder, ViewerStatus,
    ViewerUi, Viewport,
};

fn ceiling() -> Value {
    json!({
        "metadata": { "version": 4.6, "type": "Object" },
        "geometries": [{
            "uuid": "tri",
            "type": "BufferGeometry",
            "data": { "attributes": {
                "position": { "itemSize": 3, "array": [0, 0, 0, 1, 0, 0, 0, 1, 0] }
            } }
        }],
        "object": {
            "type": "Group",
            "userData": { "name": "Ceiling" },
            "children": [
                { "type": "Mesh", "name": "panel", "geometry": "tri" },
                { "type": "Mesh", "name": "lamp", "geometry": "tri",
                  "matrix": [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 1, 0, 0, 1] }
            ]
        }
    })
}

async fn loaded_viewer() -> Viewer {
    let mut viewer = ViewerBuilder::default()
        .source(Arc::new(StaticModelSource::new("memory", ceiling())))
        .build(Box::new(HeadlessContainer::new(Viewport::new(800, 600))))
        .unwrap();
    assert_eq!(viewer.finish_loading().await, ViewerStatus::Idle);
    viewer.advance(0.016);
    viewer
}

/// Runs one egui frame over the viewer and returns the panel response with
/// the number of text shapes painted
fn frame(
    ctx: &egui::Context,
    ui: &mut ViewerUi,
    viewer: &mut Viewer,
    time: f64,
    events: Vec<Event>,
) -> (HierarchyResponse, usize) {
    let input = RawInput {
        screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))),
        time: Some(time),
        events,
        ..Default::default()
    };
    let mut response = HierarchyResponse::default();
    let output = ctx.run(input, |ctx| {
        response = ui.show(ctx, viewer);
    });
    let texts = output
        .shapes
        .iter()
        .filter(|clipped| matches!(clipped.shape, Shape::Text(_)))
        .count();
    (response, texts)
}

fn button(pos: Pos2, pressed: bool) -> Event {
    Event::PointerButton {
        pos,
        button: PointerButton::Primary,
        pressed,
        modifiers: Modifiers::NONE,
    }
}

#[tokio::test]
async fn test_clicking_a_row_highlights_the_object() {
    let mut viewer = loaded_viewer().await;
    let mut ui = ViewerUi::new(&viewer);
    let ctx = egui::Context::default();

    let (first, _) = frame(&ctx, &mut ui, &mut viewer, 0.0, Vec::new());
    let ids: Vec<NodeId> = first.rows.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![NodeId(0), NodeId(1), NodeId(2)]);
    let lamp = first.rows[2].1.center();

    let mut clicked = None;
    let steps = [
        vec![Event::PointerMoved(lamp)],
        vec![button(lamp, true)],
        vec![button(lamp, false)],
    ];
    for (i, events) in steps.into_iter().enumerate() {
        let (response, _) = frame(&ctx, &mut ui, &mut viewer, 0.1 * (i + 1) as f64, events);
        clicked = clicked.or(response.clicked);
    }

    assert_eq!(clicked, Some(NodeId(2)));
    assert_eq!(ui.widget().selection(), Some(NodeId(2)));
    assert_eq!(viewer.scene().highlighted(), Some(NodeId(2)));

    // The highlight is picked up by the next tick.
    let renders = viewer.frame_stats().scene_renders;
    viewer.advance(0.016);
    assert_eq!(viewer.frame_stats().scene_renders, renders + 1);
}

#[tokio::test]
async fn test_labels_are_painted_without_the_panel() {
    let mut viewer = loaded_viewer().await;
    let mut ui = ViewerUi::new(&viewer).with_hierarchy(false);
    let ctx = egui::Context::default();

    let visible = viewer.labels().iter().filter(|label| label.visible).count();
    assert_eq!(visible, 2);
    let (response, texts) = frame(&ctx, &mut ui, &mut viewer, 0.0, Vec::new());
    assert!(response.rows.is_empty());
    assert_eq!(texts, visible);
}
