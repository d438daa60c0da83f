//! Scene nodes: the tree the viewer populates once per load

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::bounds::Aabb;
use crate::geometry::{Geometry, Material};
use crate::id::{NodeId, NodeIdAllocator};
use crate::progress::{ProgressStatus, PROGRESS_KEY};
use crate::transform::Transform3D;
use crate::Point3f;

/// Geometry and material of a mesh node
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub geometry: Arc<Geometry>,
    pub material: Material,
}

/// What a node is, mirroring the `type` names of scene descriptions
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain pass-through transform node
    Object3D,
    Group,
    Mesh(MeshData),
    Line(Arc<Geometry>),
    Points(Arc<Geometry>),
    /// Any other node type, kept by name so hierarchies survive intact
    Other(String),
}

impl NodeKind {
    /// Type name as it appears in scene descriptions
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Object3D => "Object3D",
            NodeKind::Group => "Group",
            NodeKind::Mesh(_) => "Mesh",
            NodeKind::Line(_) => "Line",
            NodeKind::Points(_) => "Points",
            NodeKind::Other(name) => name,
        }
    }
}

/// Screen-space annotation attached to a mesh node.
///
/// A label is a snapshot of the node's progress status at assignment time and
/// is dropped together with the node that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLabel {
    pub text: String,
    pub code: u8,
    pub class_name: String,
    /// Anchor in the owning node's local space
    pub offset: Point3f,
}

impl StatusLabel {
    /// Label anchored at the node's local origin showing `status`
    pub fn for_status(status: &ProgressStatus) -> Self {
        Self {
            text: status.status_text.clone(),
            code: status.status_code,
            class_name: format!("status-text status-{}", status.status_code),
            offset: Point3f::origin(),
        }
    }
}

/// A node of the scene graph.
///
/// Children are owned by their parent, so dropping a node releases its whole
/// subtree, including any attached labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub uuid: String,
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform3D,
    pub visible: bool,
    pub user_data: Map<String, Value>,
    pub label: Option<StatusLabel>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Create a node with an explicit id and a fresh uuid
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            uuid: uuid::Uuid::new_v4().to_string(),
            name: String::new(),
            kind,
            transform: Transform3D::identity(),
            visible: true,
            user_data: Map::new(),
            label: None,
            children: Vec::new(),
        }
    }

    /// Create a node taking the next id from `ids`
    pub fn allocate(ids: &NodeIdAllocator, kind: NodeKind) -> Self {
        Self::new(ids.allocate(), kind)
    }

    /// Create a mesh node taking the next id from `ids`
    pub fn mesh(ids: &NodeIdAllocator, geometry: Arc<Geometry>, material: Material) -> Self {
        Self::allocate(ids, NodeKind::Mesh(MeshData { geometry, material }))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    pub fn with_transform(mut self, transform: Transform3D) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_user_data(mut self, user_data: Map<String, Value>) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child node
    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Type name as it appears in scene descriptions
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    /// Whether this node carries triangle geometry
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    /// Geometry of mesh, line and point nodes
    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(&*mesh.geometry),
            NodeKind::Line(geometry) | NodeKind::Points(geometry) => Some(&**geometry),
            _ => None,
        }
    }

    /// Name shown for this node in hierarchy views: `userData.name`, or
    /// `Object_{name}` when the user data carries none or an empty one.
    pub fn display_name(&self) -> String {
        let user_name = self
            .user_data
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty());
        match user_name {
            Some(name) => name.to_string(),
            None => format!("Object_{}", self.name),
        }
    }

    /// Store a progress status in the node's metadata
    pub fn set_progress(&mut self, status: &ProgressStatus) {
        if let Ok(value) = serde_json::to_value(status) {
            self.user_data.insert(PROGRESS_KEY.to_string(), value);
        }
    }

    /// Progress status stored in the node's metadata, if any
    pub fn progress(&self) -> Option<ProgressStatus> {
        self.user_data
            .get(PROGRESS_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Rotate the node about its local X axis
    pub fn rotate_x(&mut self, angle: f32) {
        self.transform.rotate_x(angle);
    }

    /// Pre-order, depth-first iterator over this node and its descendants
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Pre-order iterator yielding each node with its world matrix, taking
    /// `parent` as the world matrix of this node's parent.
    pub fn iter_world(&self, parent: Matrix4<f32>) -> WorldDescendants<'_> {
        WorldDescendants {
            stack: vec![(self, parent)],
        }
    }

    /// Visit this node and every descendant depth-first, parents before children
    pub fn traverse<F>(&self, mut f: F)
    where
        F: FnMut(&SceneNode),
    {
        for node in self.iter() {
            f(node);
        }
    }

    /// Mutable depth-first visit, parents before children
    pub fn traverse_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut SceneNode),
    {
        self.visit_mut(&mut f);
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(&mut SceneNode)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    /// Find a node in this subtree by id
    pub fn find(&self, id: NodeId) -> Option<&SceneNode> {
        self.iter().find(|node| node.id == id)
    }

    /// Find a node in this subtree by id, mutably
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Number of mesh nodes in this subtree
    pub fn mesh_count(&self) -> usize {
        self.iter().filter(|node| node.is_mesh()).count()
    }

    /// Bounding box of all geometry in this subtree, in the space of the
    /// parent whose world matrix is `parent`.
    pub fn world_bounds(&self, parent: Matrix4<f32>) -> Aabb {
        self.iter_world(parent)
            .filter_map(|(node, world)| {
                node.geometry()
                    .map(|geometry| geometry.bounding_box().transformed(&world))
            })
            .fold(Aabb::empty(), |acc, bounds| acc.union(&bounds))
    }
}

/// Iterator returned by [`SceneNode::iter`]
pub struct Descendants<'a> {
    stack: Vec<&'a SceneNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SceneNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Iterator returned by [`SceneNode::iter_world`]
pub struct WorldDescendants<'a> {
    stack: Vec<(&'a SceneNode, Matrix4<f32>)>,
}

impl<'a> Iterator for WorldDescendants<'a> {
    type Item = (&'a SceneNode, Matrix4<f32>);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, parent) = self.stack.pop()?;
        let world = parent * node.transform.matrix;
        self.stack
            .extend(node.children.iter().rev().map(|child| (child, world)));
        Some((node, world))
    }
}
