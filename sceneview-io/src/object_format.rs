//! Reader for the JSON "Object" scene format
//!
//! A document carries shared `geometries` and `materials` tables plus one
//! `object` tree whose nodes reference table entries by uuid. Node ids are
//! allocated in pre-order, so a parent always has a smaller id than its
//! children.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use sceneview_core::{
    Geometry, Material, MeshData, NodeIdAllocator, NodeKind, Point3f, SceneNode, Transform3D,
    Vector3f,
};

use crate::error::{Result, SceneIoError};

#[derive(Debug, Deserialize)]
struct ObjectDocument {
    #[serde(default)]
    geometries: Vec<GeometryDef>,
    #[serde(default)]
    materials: Vec<MaterialDef>,
    object: ObjectDef,
}

#[derive(Debug, Deserialize)]
struct ObjectDef {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    matrix: Option<Vec<f32>>,
    #[serde(default)]
    visible: Option<bool>,
    #[serde(default, rename = "userData")]
    user_data: Map<String, Value>,
    #[serde(default)]
    geometry: Option<String>,
    #[serde(default)]
    material: Option<MaterialRef>,
    #[serde(default)]
    children: Vec<ObjectDef>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaterialRef {
    One(String),
    Many(Vec<String>),
}

impl MaterialRef {
    fn first(&self) -> Option<&str> {
        match self {
            MaterialRef::One(uuid) => Some(uuid),
            MaterialRef::Many(uuids) => uuids.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeometryDef {
    uuid: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<GeometryData>,
    #[serde(default)]
    width: Option<f32>,
    #[serde(default)]
    height: Option<f32>,
    #[serde(default)]
    depth: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GeometryData {
    #[serde(default)]
    attributes: HashMap<String, AttributeDef>,
    #[serde(default)]
    index: Option<IndexDef>,
}

#[derive(Debug, Deserialize)]
struct AttributeDef {
    #[serde(rename = "itemSize")]
    item_size: usize,
    array: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct IndexDef {
    array: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct MaterialDef {
    uuid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    color: Option<u32>,
    #[serde(default)]
    opacity: Option<f32>,
}

/// Convert an object-format scene description into a node tree
pub fn parse_scene(description: &Value, ids: &NodeIdAllocator) -> Result<SceneNode> {
    let document = ObjectDocument::deserialize(description)?;

    let mut geometries = HashMap::with_capacity(document.geometries.len());
    for def in &document.geometries {
        geometries.insert(def.uuid.as_str(), Arc::new(build_geometry(def)?));
    }

    let materials: HashMap<&str, Material> = document
        .materials
        .iter()
        .map(|def| (def.uuid.as_str(), build_material(def)))
        .collect();

    let tables = Tables {
        geometries,
        materials,
    };
    tables.convert(&document.object, ids)
}

struct Tables<'a> {
    geometries: HashMap<&'a str, Arc<Geometry>>,
    materials: HashMap<&'a str, Material>,
}

impl Tables<'_> {
    fn convert(&self, def: &ObjectDef, ids: &NodeIdAllocator) -> Result<SceneNode> {
        // Parent id first, then children in document order.
        let id = ids.allocate();
        let kind = self.node_kind(def)?;

        let mut node = SceneNode::new(id, kind)
            .with_name(def.name.clone())
            .with_user_data(def.user_data.clone());
        if let Some(uuid) = &def.uuid {
            node.uuid = uuid.clone();
        }
        if let Some(matrix) = &def.matrix {
            node.transform = Transform3D::from_column_major(matrix)?;
        }
        node.visible = def.visible.unwrap_or(true);

        for child in &def.children {
            node.add_child(self.convert(child, ids)?);
        }
        Ok(node)
    }

    fn node_kind(&self, def: &ObjectDef) -> Result<NodeKind> {
        let kind = match def.kind.as_str() {
            "Object3D" => NodeKind::Object3D,
            "Group" | "Scene" => NodeKind::Group,
            "Mesh" | "SkinnedMesh" | "InstancedMesh" => {
                let material = def
                    .material
                    .as_ref()
                    .and_then(MaterialRef::first)
                    .and_then(|uuid| self.materials.get(uuid))
                    .cloned()
                    .unwrap_or_default();
                NodeKind::Mesh(MeshData {
                    geometry: self.geometry_for(def)?,
                    material,
                })
            }
            "Line" | "LineSegments" | "LineLoop" => NodeKind::Line(self.geometry_for(def)?),
            "Points" => NodeKind::Points(self.geometry_for(def)?),
            other => NodeKind::Other(other.to_string()),
        };
        Ok(kind)
    }

    fn geometry_for(&self, def: &ObjectDef) -> Result<Arc<Geometry>> {
        let Some(uuid) = def.geometry.as_deref() else {
            return Ok(Arc::new(Geometry::new()));
        };
        self.geometries
            .get(uuid)
            .cloned()
            .ok_or_else(|| SceneIoError::MissingGeometry {
                object: def.uuid.clone().unwrap_or_else(|| def.name.clone()),
                uuid: uuid.to_string(),
            })
    }
}

fn build_material(def: &MaterialDef) -> Material {
    let mut material = Material {
        name: def.name.clone(),
        ..Material::default()
    };
    if let Some(color) = def.color {
        material.color = Material::color_from_hex(color);
    }
    if let Some(opacity) = def.opacity {
        material.opacity = opacity;
    }
    material
}

fn build_geometry(def: &GeometryDef) -> Result<Geometry> {
    match def.kind.as_str() {
        "BufferGeometry" => match &def.data {
            Some(data) => buffer_geometry(data),
            None => Ok(Geometry::new()),
        },
        "BoxGeometry" => Ok(box_geometry(
            def.width.unwrap_or(1.0),
            def.height.unwrap_or(1.0),
            def.depth.unwrap_or(1.0),
        )),
        // Parametric shapes we do not tessellate still yield a node so the
        // hierarchy and its status labels stay complete.
        _ => Ok(Geometry::new()),
    }
}

fn buffer_geometry(data: &GeometryData) -> Result<Geometry> {
    let position = data
        .attributes
        .get("position")
        .ok_or_else(|| SceneIoError::InvalidAttribute {
            name: "position".to_string(),
            reason: "missing".to_string(),
        })?;
    let vertices: Vec<Point3f> = triples("position", position)?
        .map(|[x, y, z]| Point3f::new(x, y, z))
        .collect();

    let mut geometry = match &data.index {
        Some(index) => {
            if index.array.len() % 3 != 0 {
                return Err(SceneIoError::InvalidAttribute {
                    name: "index".to_string(),
                    reason: format!("length {} is not a multiple of 3", index.array.len()),
                });
            }
            let faces = index
                .array
                .chunks_exact(3)
                .map(|face| [face[0], face[1], face[2]])
                .collect();
            Geometry::from_vertices_and_faces(vertices, faces)
        }
        None => Geometry::from_triangle_soup(vertices),
    };

    if !geometry.faces_in_range() {
        return Err(SceneIoError::InvalidAttribute {
            name: "index".to_string(),
            reason: "references a vertex past the end of position".to_string(),
        });
    }

    if let Some(normal) = data.attributes.get("normal") {
        geometry.set_normals(
            triples("normal", normal)?
                .map(|[x, y, z]| Vector3f::new(x, y, z))
                .collect(),
        );
    }
    if let Some(color) = data.attributes.get("color") {
        geometry.set_colors(triples("color", color)?.collect());
    }
    Ok(geometry)
}

fn triples<'a>(
    name: &str,
    attribute: &'a AttributeDef,
) -> Result<impl Iterator<Item = [f32; 3]> + 'a> {
    if attribute.item_size != 3 || attribute.array.len() % 3 != 0 {
        return Err(SceneIoError::InvalidAttribute {
            name: name.to_string(),
            reason: format!(
                "expected xyz triples, got itemSize {} with {} values",
                attribute.item_size,
                attribute.array.len()
            ),
        });
    }
    Ok(attribute
        .array
        .chunks_exact(3)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]]))
}

fn box_geometry(width: f32, height: f32, depth: f32) -> Geometry {
    let (x, y, z) = (width / 2.0, height / 2.0, depth / 2.0);
    let vertices = vec![
        Point3f::new(-x, -y, -z),
        Point3f::new(x, -y, -z),
        Point3f::new(x, y, -z),
        Point3f::new(-x, y, -z),
        Point3f::new(-x, -y, z),
        Point3f::new(x, -y, z),
        Point3f::new(x, y, z),
        Point3f::new(-x, y, z),
    ];
    let faces = vec![
        [4, 5, 6], [4, 6, 7], // +z
        [1, 0, 3], [1, 3, 2], // -z
        [5, 1, 2], [5, 2, 6], // +x
        [0, 4, 7], [0, 7, 3], // -x
        [7, 6, 2], [7, 2, 3], // +y
        [0, 1, 5], [0, 5, 4], // -y
    ];
    Geometry::from_vertices_and_faces(vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_box_geometry_is_closed() {
        let geometry = box_geometry(2.0, 4.0, 6.0);
        assert_eq!(geometry.face_count(), 12);
        assert!(geometry.faces_in_range());
        let bounds = geometry.bounding_box();
        assert_eq!(bounds.max, Point3f::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_bad_item_size_is_rejected() {
        let description = json!({
            "metadata": { "type": "Object" },
            "geometries": [{
                "uuid": "g",
                "type": "BufferGeometry",
                "data": { "attributes": { "position": { "itemSize": 2, "array": [0, 0, 1, 1] } } }
            }],
            "object": { "type": "Mesh", "geometry": "g" }
        });
        let err = parse_scene(&description, &NodeIdAllocator::new()).unwrap_err();
        assert!(matches!(err, SceneIoError::InvalidAttribute { .. }));
    }

    #[test]
    fn test_index_out_of_range_is_rejected() {
        let description = json!({
            "metadata": { "type": "Object" },
            "geometries": [{
                "uuid": "g",
                "type": "BufferGeometry",
                "data": {
                    "attributes": { "position": { "itemSize": 3, "array": [0, 0, 0, 1, 0, 0, 0, 1, 0] } },
                    "index": { "array": [0, 1, 3] }
                }
            }],
            "object": { "type": "Mesh", "geometry": "g" }
        });
        assert!(parse_scene(&description, &NodeIdAllocator::new()).is_err());
    }
}
