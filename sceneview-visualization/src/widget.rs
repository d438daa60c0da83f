//! Hierarchy inspector model
//!
//! Presentation-agnostic state behind a clickable object tree: it follows the
//! viewer's status, mirrors the loaded model as indented rows and routes
//! clicks back into [`Viewer::highlight_object`].

use sceneview_core::{NodeId, NodeKind, Result, SceneNode};

use crate::loader::LoadFailure;
use crate::status::{StatusSubscription, ViewerStatus};
use crate::viewer::Viewer;

/// One visible row of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: NodeId,
    pub label: String,
    pub depth: usize,
    pub selected: bool,
}

/// What the widget shows right now
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetView {
    /// A load is in progress
    Placeholder,
    Error(Option<LoadFailure>),
    /// Idle without a model
    Empty,
    Tree(Vec<TreeRow>),
}

impl WidgetView {
    /// Plain-text rendering, two spaces of indent per level and `*` marking
    /// the selection
    pub fn lines(&self) -> Vec<String> {
        match self {
            WidgetView::Placeholder => vec!["Model not loaded".to_string()],
            WidgetView::Error(Some(failure)) => vec![format!("Failed to load model: {}", failure.message)],
            WidgetView::Error(None) => vec!["Failed to load model".to_string()],
            WidgetView::Empty => Vec::new(),
            WidgetView::Tree(rows) => rows
                .iter()
                .map(|row| {
                    let marker = if row.selected { " *" } else { "" };
                    format!("{}{}{}", "  ".repeat(row.depth), row.label, marker)
                })
                .collect(),
        }
    }
}

#[derive(Debug)]
pub struct HierarchyWidget {
    status: StatusSubscription,
    selection: Option<NodeId>,
}

impl HierarchyWidget {
    /// Start following `viewer`
    pub fn new(viewer: &Viewer) -> Self {
        Self {
            status: viewer.subscribe_status(),
            selection: None,
        }
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn view(&self, viewer: &Viewer) -> WidgetView {
        match self.status.current() {
            ViewerStatus::Loading => WidgetView::Placeholder,
            ViewerStatus::Error => WidgetView::Error(viewer.last_failure().cloned()),
            ViewerStatus::Idle => match viewer.model() {
                Some(model) => {
                    let mut rows = Vec::new();
                    self.collect_rows(model, 0, &mut rows);
                    WidgetView::Tree(rows)
                }
                None => WidgetView::Empty,
            },
        }
    }

    /// Pass-through `Object3D` nodes get no row; their children are listed at
    /// the depth the skipped node would have had.
    fn collect_rows(&self, node: &SceneNode, depth: usize, rows: &mut Vec<TreeRow>) {
        let child_depth = if matches!(node.kind, NodeKind::Object3D) {
            depth
        } else {
            rows.push(TreeRow {
                id: node.id,
                label: node.display_name(),
                depth,
                selected: self.selection == Some(node.id),
            });
            depth + 1
        };
        for child in &node.children {
            self.collect_rows(child, child_depth, rows);
        }
    }

    /// Highlight `node` in the viewer and select it here
    pub fn click(&mut self, viewer: &mut Viewer, node: NodeId) -> Result<()> {
        viewer.highlight_object(node)?;
        self.selection = Some(node);
        Ok(())
    }
}
