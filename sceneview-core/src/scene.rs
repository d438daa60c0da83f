//! The scene: top-level nodes, lights and view-wide state

use nalgebra::Matrix4;

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::light::Light;
use crate::node::{MeshData, NodeKind, SceneNode, StatusLabel};

/// One mesh to draw, resolved to world space
#[derive(Debug, Clone, Copy)]
pub struct MeshDraw<'a> {
    pub node: NodeId,
    pub world: Matrix4<f32>,
    pub mesh: &'a MeshData,
    pub highlighted: bool,
}

/// One label to project, resolved to world space
#[derive(Debug, Clone, Copy)]
pub struct LabelAnchor<'a> {
    pub node: NodeId,
    pub world: Matrix4<f32>,
    pub label: &'a StatusLabel,
}

/// Root of everything a viewer draws.
///
/// Every mutation bumps [`revision`](Scene::revision) so renderers can cache
/// uploaded geometry until something changes.
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: [f32; 3],
    lights: Vec<Light>,
    children: Vec<SceneNode>,
    highlighted: Option<NodeId>,
    revision: u64,
}

impl Scene {
    /// Create an empty scene with the given background color
    pub fn new(background: [f32; 3]) -> Self {
        Self {
            background,
            lights: Vec::new(),
            children: Vec::new(),
            highlighted: None,
            revision: 0,
        }
    }

    /// Insert a top-level node, taking ownership of its subtree
    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = node.id;
        self.children.push(node);
        self.revision += 1;
        id
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
        self.revision += 1;
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Top-level nodes
    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    /// Detach a top-level node and return it
    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.children.iter().position(|node| node.id == id)?;
        if self.highlighted.is_some_and(|h| self.children[index].find(h).is_some()) {
            self.highlighted = None;
        }
        self.revision += 1;
        Some(self.children.remove(index))
    }

    /// Drop every node and light
    pub fn clear(&mut self) {
        self.children.clear();
        self.lights.clear();
        self.highlighted = None;
        self.revision += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Find any node in the scene by id
    pub fn find(&self, id: NodeId) -> Option<&SceneNode> {
        self.children.iter().find_map(|node| node.find(id))
    }

    /// Find any node in the scene by id, mutably. Callers that change what is
    /// drawn should follow up with [`mark_changed`](Scene::mark_changed).
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.children.iter_mut().find_map(|node| node.find_mut(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    /// Emphasize one node, or none
    pub fn set_highlight(&mut self, id: Option<NodeId>) -> Result<()> {
        if let Some(id) = id {
            if !self.contains(id) {
                return Err(Error::UnknownNode(id));
            }
        }
        if self.highlighted != id {
            self.highlighted = id;
            self.revision += 1;
        }
        Ok(())
    }

    pub fn highlighted(&self) -> Option<NodeId> {
        self.highlighted
    }

    /// Counter bumped by every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Record an out-of-band change made through [`find_mut`](Scene::find_mut)
    pub fn mark_changed(&mut self) {
        self.revision += 1;
    }

    /// All nodes, depth-first
    pub fn iter(&self) -> impl Iterator<Item = &SceneNode> {
        self.children.iter().flat_map(|node| node.iter())
    }

    /// Visible meshes with their world matrices. A node is highlighted when it
    /// or one of its ancestors is the highlighted node.
    pub fn mesh_draws(&self) -> Vec<MeshDraw<'_>> {
        let mut draws = Vec::new();
        for root in &self.children {
            self.collect_draws(root, Matrix4::identity(), false, &mut draws);
        }
        draws
    }

    fn collect_draws<'a>(
        &self,
        node: &'a SceneNode,
        parent: Matrix4<f32>,
        highlighted: bool,
        draws: &mut Vec<MeshDraw<'a>>,
    ) {
        if !node.visible {
            return;
        }
        let world = parent * node.transform.matrix;
        let highlighted = highlighted || self.highlighted == Some(node.id);
        if let NodeKind::Mesh(mesh) = &node.kind {
            draws.push(MeshDraw {
                node: node.id,
                world,
                mesh,
                highlighted,
            });
        }
        for child in &node.children {
            self.collect_draws(child, world, highlighted, draws);
        }
    }

    /// Every visible node carrying a status label, with its world matrix.
    /// Labels under a hidden node are skipped along with its subtree.
    pub fn label_anchors(&self) -> Vec<LabelAnchor<'_>> {
        let mut anchors = Vec::new();
        for root in &self.children {
            collect_anchors(root, Matrix4::identity(), &mut anchors);
        }
        anchors
    }

    /// Bounding box of all geometry in world space
    pub fn bounds(&self) -> Aabb {
        self.children
            .iter()
            .map(|node| node.world_bounds(Matrix4::identity()))
            .fold(Aabb::empty(), |acc, bounds| acc.union(&bounds))
    }
}

fn collect_anchors<'a>(node: &'a SceneNode, parent: Matrix4<f32>, anchors: &mut Vec<LabelAnchor<'a>>) {
    if !node.visible {
        return;
    }
    let world = parent * node.transform.matrix;
    if let Some(label) = &node.label {
        anchors.push(LabelAnchor {
            node: node.id,
            world,
            label,
        });
    }
    for child in &node.children {
        collect_anchors(child, world, anchors);
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new([0.0, 0.0, 0.0])
    }
}
