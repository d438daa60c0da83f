//! Integration tests for locating and converting object-format scenes

use approx::assert_relative_eq;
use serde_json::{json, Value};
use std::sync::Arc;

use sceneview_core::{NodeId, NodeIdAllocator, NodeKind, Point3f};
use sceneview_io::{extract_scene, SceneIoError};

/// A ceiling panel assembly: a group holding two panels that share geometry
fn ceiling_document() -> Value {
    json!({
        "metadata": { "version": 4.6, "type": "Object", "generator": "Object3D.toJSON" },
        "geometries": [{
            "uuid": "panel-geometry",
            "type": "BufferGeometry",
            "data": {
                "attributes": {
                    "position": {
                        "itemSize": 3,
                        "type": "Float32Array",
                        "array": [0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0],
                        "normalized": false
                    },
                    "normal": {
                        "itemSize": 3,
                        "type": "Float32Array",
                        "array": [0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1],
                        "normalized": false
                    }
                },
                "index": { "type": "Uint16Array", "array": [0, 1, 2, 0, 2, 3] }
            }
        }],
        "materials": [{ "uuid": "steel", "type": "MeshStandardMaterial", "name": "steel", "color": 16711680 }],
        "object": {
            "uuid": "assembly",
            "type": "Group",
            "name": "ceiling",
            "userData": { "name": "Ceiling props" },
            "children": [
                {
                    "uuid": "panel-a",
                    "type": "Mesh",
                    "name": "A",
                    "geometry": "panel-geometry",
                    "material": "steel"
                },
                {
                    "uuid": "spacer",
                    "type": "Object3D",
                    "children": [{
                        "uuid": "panel-b",
                        "type": "Mesh",
                        "name": "B",
                        "geometry": "panel-geometry",
                        "material": ["steel"],
                        "matrix": [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 4, 0, 0, 1]
                    }]
                }
            ]
        }
    })
}

#[test]
fn test_converts_envelope_payload() {
    let payload = json!({ "file": { "name": "pretty_ceiling_props.json", "content": ceiling_document() } });
    let root = extract_scene(&payload, &NodeIdAllocator::new()).unwrap();

    assert_eq!(root.uuid, "assembly");
    assert_eq!(root.display_name(), "Ceiling props");
    assert_eq!(root.node_count(), 4);
    assert_eq!(root.mesh_count(), 2);

    let ids: Vec<NodeId> = root.iter().map(|node| node.id).collect();
    assert_eq!(ids, vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);

    let types: Vec<&str> = root.iter().map(|node| node.type_name()).collect();
    assert_eq!(types, vec!["Group", "Mesh", "Object3D", "Mesh"]);
}

#[test]
fn test_meshes_share_geometry_and_material() {
    let root = extract_scene(&ceiling_document(), &NodeIdAllocator::new()).unwrap();
    let a = root.find(NodeId(1)).unwrap();
    let b = root.find(NodeId(3)).unwrap();

    let (NodeKind::Mesh(mesh_a), NodeKind::Mesh(mesh_b)) = (&a.kind, &b.kind) else {
        panic!("panels should be meshes");
    };
    assert!(Arc::ptr_eq(&mesh_a.geometry, &mesh_b.geometry));
    assert_eq!(mesh_a.geometry.face_count(), 2);
    assert!(mesh_a.geometry.normals.is_some());
    assert_eq!(mesh_a.material.name, "steel");
    assert_eq!(mesh_b.material.color, [1.0, 0.0, 0.0]);
}

#[test]
fn test_matrices_are_applied_in_world_bounds() {
    let root = extract_scene(&ceiling_document(), &NodeIdAllocator::new()).unwrap();
    let bounds = root.world_bounds(nalgebra_identity());
    assert_relative_eq!(bounds.min, Point3f::new(0.0, 0.0, 0.0));
    assert_relative_eq!(bounds.max, Point3f::new(5.0, 1.0, 0.0));
}

#[test]
fn test_ids_continue_from_shared_allocator() {
    let ids = NodeIdAllocator::starting_at(7);
    let root = extract_scene(&ceiling_document(), &ids).unwrap();
    assert_eq!(root.id, NodeId(7));
    assert_eq!(ids.peek(), NodeId(11));
}

#[test]
fn test_missing_description() {
    let payload = json!({ "files": [ { "name": "readme.txt" } ] });
    let err = extract_scene(&payload, &NodeIdAllocator::new()).unwrap_err();
    assert!(matches!(err, SceneIoError::MissingSceneDescription));
}

#[test]
fn test_dangling_geometry_reference() {
    let mut document = ceiling_document();
    document["geometries"] = json!([]);
    let err = extract_scene(&document, &NodeIdAllocator::new()).unwrap_err();
    match err {
        SceneIoError::MissingGeometry { object, uuid } => {
            assert_eq!(object, "panel-a");
            assert_eq!(uuid, "panel-geometry");
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn nalgebra_identity() -> sceneview_core::Matrix4<f32> {
    sceneview_core::Matrix4::identity()
}
