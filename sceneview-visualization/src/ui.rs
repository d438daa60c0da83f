//! egui presentation of the viewer's overlays
//!
//! Draws the projected status labels over the scene and the hierarchy
//! inspector as a side panel. Everything here works on a bare
//! [`egui::Context`], so it runs the same inside a window or headless.

use egui::{Color32, FontId, LayerId, Pos2, Rect, RichText, Vec2};
use tracing::warn;

use sceneview_core::{NodeId, ProgressCode};

use crate::labels::ProjectedLabel;
use crate::viewer::Viewer;
use crate::widget::{HierarchyWidget, WidgetView};

/// Indent per hierarchy level, in points
const ROW_INDENT: f32 = 14.0;
const LABEL_PADDING: Vec2 = Vec2::new(6.0, 2.0);
const LABEL_FONT_SIZE: f32 = 12.0;

/// Badge color for a progress code
pub fn status_color(code: u8) -> Color32 {
    match ProgressCode::from_code(code) {
        Some(ProgressCode::NotStarted) => Color32::from_rgb(120, 120, 120),
        Some(ProgressCode::InProgress) => Color32::from_rgb(214, 150, 20),
        Some(ProgressCode::PartiallyInstalled) => Color32::from_rgb(40, 110, 200),
        Some(ProgressCode::Installed) => Color32::from_rgb(40, 160, 70),
        None => Color32::DARK_GRAY,
    }
}

/// Paint every visible label as a colored badge centered on its anchor.
///
/// Label positions are viewport pixels; `pixels_per_point` converts them to
/// egui points. Labels are expected back to front, so nearer ones end up on
/// top. Returns how many badges were painted.
pub fn paint_labels(ctx: &egui::Context, labels: &[ProjectedLabel], pixels_per_point: f32) -> usize {
    let painter = ctx.layer_painter(LayerId::background());
    let mut painted = 0;
    for label in labels.iter().filter(|label| label.visible) {
        let center = Pos2::new(label.x / pixels_per_point, label.y / pixels_per_point);
        let galley = painter.layout_no_wrap(
            label.text.clone(),
            FontId::proportional(LABEL_FONT_SIZE),
            Color32::WHITE,
        );
        let rect = Rect::from_center_size(center, galley.size() + LABEL_PADDING * 2.0);
        painter.rect_filled(rect, 3.0, status_color(label.code));
        painter.galley(rect.min + LABEL_PADDING, galley, Color32::WHITE);
        painted += 1;
    }
    painted
}

/// What the hierarchy panel reported for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyResponse {
    /// Row clicked this frame
    pub clicked: Option<NodeId>,
    /// Screen rectangle of every row shown
    pub rows: Vec<(NodeId, Rect)>,
}

/// Lay out `view` as a left side panel
pub fn hierarchy_panel(ctx: &egui::Context, view: &WidgetView) -> HierarchyResponse {
    let mut response = HierarchyResponse::default();
    egui::SidePanel::left("hierarchy")
        .resizable(true)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Objects");
            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| match view {
                WidgetView::Tree(rows) => {
                    for row in rows {
                        ui.horizontal(|ui| {
                            ui.add_space(row.depth as f32 * ROW_INDENT);
                            let row_response = ui.selectable_label(row.selected, row.label.as_str());
                            if row_response.clicked() {
                                response.clicked = Some(row.id);
                            }
                            response.rows.push((row.id, row_response.rect));
                        });
                    }
                }
                WidgetView::Error(_) => {
                    for line in view.lines() {
                        ui.label(RichText::new(line).color(Color32::LIGHT_RED));
                    }
                }
                _ => {
                    for line in view.lines() {
                        ui.label(line);
                    }
                }
            });
        });
    response
}

/// The viewer's egui layer: status badges plus an optional hierarchy panel
/// whose clicks highlight objects.
#[derive(Debug)]
pub struct ViewerUi {
    widget: HierarchyWidget,
    show_hierarchy: bool,
}

impl ViewerUi {
    pub fn new(viewer: &Viewer) -> Self {
        Self {
            widget: HierarchyWidget::new(viewer),
            show_hierarchy: true,
        }
    }

    pub fn with_hierarchy(mut self, show: bool) -> Self {
        self.show_hierarchy = show;
        self
    }

    pub fn widget(&self) -> &HierarchyWidget {
        &self.widget
    }

    /// Lay out one frame. A clicked row is highlighted in `viewer` right away.
    pub fn show(&mut self, ctx: &egui::Context, viewer: &mut Viewer) -> HierarchyResponse {
        paint_labels(ctx, viewer.labels(), ctx.pixels_per_point());
        if !self.show_hierarchy {
            return HierarchyResponse::default();
        }

        let response = hierarchy_panel(ctx, &self.widget.view(viewer));
        if let Some(node) = response.clicked {
            if let Err(e) = self.widget.click(viewer, node) {
                warn!(node = %node, error = %e, "could not highlight clicked object");
            }
        }
        response
    }
}
