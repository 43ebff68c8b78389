use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use tinyjson::JsonValue;

/// The parts of a glTF document that matter for rendering, decoded from JSON
/// but not yet uploaded to the GPU.
///
/// The model is trusted input: anything malformed panics during parsing,
/// which aborts the viewer before a window ever opens.
pub struct Document {
    pub scene: usize,
    pub scenes: Vec<Scene>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
}

pub struct Scene {
    pub node_indices: Vec<usize>,
}

pub struct Node {
    pub mesh_index: Option<usize>,
    pub child_node_indices: Vec<usize>,
    pub transform: Mat4,
}

pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

pub struct Primitive {
    /// Attribute semantic names paired with accessor indices, sorted by name.
    pub attributes: Vec<(String, usize)>,
    pub indices: usize,
    pub mode: u32,
}

pub struct Accessor {
    pub buffer_view: usize,
    pub byte_offset: usize,
    pub count: usize,
    pub component_type: u32,
    pub component_count: i32,
    pub normalized: bool,
}

pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// 0 means tightly packed.
    pub byte_stride: usize,
    pub target: Option<u32>,
}

pub struct Buffer {
    /// None for the BIN chunk of a GLB.
    pub uri: Option<String>,
    pub byte_length: usize,
}

impl Document {
    pub fn parse(gltf: &str) -> Document {
        let gltf: JsonValue = gltf.parse().unwrap();

        let scenes_json = gltf["scenes"].get::<Vec<_>>().unwrap();
        let mut scenes = Vec::with_capacity(scenes_json.len());
        for scene in scenes_json {
            let node_indices = scene["nodes"].get::<Vec<_>>().unwrap();
            let node_indices = node_indices.iter().map(take_usize).collect::<Vec<_>>();
            scenes.push(Scene { node_indices });
        }
        let scene = take_usize(&gltf["scene"]);

        let nodes_json = gltf["nodes"].get::<Vec<_>>().unwrap();
        let mut nodes = Vec::with_capacity(nodes_json.len());
        for node in nodes_json {
            let node: &HashMap<_, _> = node.get().unwrap();
            let child_node_indices = if let Some(children) = node.get("children") {
                let children = children.get::<Vec<_>>().unwrap();
                children.iter().map(take_usize).collect::<Vec<_>>()
            } else {
                Vec::new()
            };
            let mesh_index = node.get("mesh").map(take_usize);
            let transform = if let Some(matrix_values) = node.get("matrix") {
                let matrix_values = matrix_values.get::<Vec<_>>().unwrap();
                let mut matrix: [f32; 16] = [0.0; 16];
                assert_eq!(16, matrix_values.len());
                for (i, value) in matrix_values.iter().enumerate() {
                    matrix[i] = *value.get::<f64>().unwrap() as f32;
                }
                Mat4::from_cols_slice(&matrix)
            } else {
                let translation = node.get("translation").map(take_vec3).unwrap_or(Vec3::ZERO);
                let scale = node.get("scale").map(take_vec3).unwrap_or(Vec3::ONE);
                let rotation = node
                    .get("rotation")
                    .map(take_quat)
                    .unwrap_or(Quat::IDENTITY);
                Mat4::from_scale_rotation_translation(scale, rotation, translation)
            };
            nodes.push(Node {
                mesh_index,
                child_node_indices,
                transform,
            });
        }

        let meshes_json = gltf["meshes"].get::<Vec<_>>().unwrap();
        let mut meshes = Vec::with_capacity(meshes_json.len());
        for mesh in meshes_json {
            let primitives_json = mesh["primitives"].get::<Vec<_>>().unwrap();
            let mut primitives = Vec::with_capacity(primitives_json.len());
            for primitive in primitives_json {
                let primitive: &HashMap<_, _> = primitive.get().unwrap();
                let attributes_json = primitive["attributes"].get::<HashMap<_, _>>().unwrap();
                let mut attributes = attributes_json
                    .iter()
                    .map(|(name, accessor)| (name.clone(), take_usize(accessor)))
                    .collect::<Vec<_>>();
                attributes.sort();
                let indices = take_usize(&primitive["indices"]);
                let mode = primitive.get("mode").map(take_usize).unwrap_or(4) as u32;
                primitives.push(Primitive {
                    attributes,
                    indices,
                    mode,
                });
            }
            meshes.push(Mesh { primitives });
        }

        let accessors_json = gltf["accessors"].get::<Vec<_>>().unwrap();
        let mut accessors = Vec::with_capacity(accessors_json.len());
        for accessor in accessors_json {
            let accessor: &HashMap<_, _> = accessor.get().unwrap();
            let component_count = match accessor["type"].get::<String>().unwrap().as_ref() {
                "SCALAR" => 1,
                "VEC2" => 2,
                "VEC3" => 3,
                "VEC4" => 4,
                type_ => panic!("unsupported accessor type \"{type_}\""),
            };
            accessors.push(Accessor {
                buffer_view: take_usize(&accessor["bufferView"]),
                byte_offset: accessor.get("byteOffset").map(take_usize).unwrap_or(0),
                count: take_usize(&accessor["count"]),
                component_type: take_usize(&accessor["componentType"]) as u32,
                component_count,
                normalized: accessor
                    .get("normalized")
                    .map(|v| *v.get::<bool>().unwrap())
                    .unwrap_or(false),
            });
        }

        let buffer_views_json = gltf["bufferViews"].get::<Vec<_>>().unwrap();
        let mut buffer_views = Vec::with_capacity(buffer_views_json.len());
        for buffer_view in buffer_views_json {
            let buffer_view: &HashMap<_, _> = buffer_view.get().unwrap();
            buffer_views.push(BufferView {
                buffer: take_usize(&buffer_view["buffer"]),
                byte_offset: buffer_view.get("byteOffset").map(take_usize).unwrap_or(0),
                byte_length: take_usize(&buffer_view["byteLength"]),
                byte_stride: buffer_view.get("byteStride").map(take_usize).unwrap_or(0),
                target: buffer_view.get("target").map(|v| take_usize(v) as u32),
            });
        }

        let buffers_json = gltf["buffers"].get::<Vec<_>>().unwrap();
        let mut buffers = Vec::with_capacity(buffers_json.len());
        for buffer in buffers_json {
            let buffer: &HashMap<_, _> = buffer.get().unwrap();
            buffers.push(Buffer {
                uri: buffer
                    .get("uri")
                    .map(|uri| uri.get::<String>().unwrap().clone()),
                byte_length: take_usize(&buffer["byteLength"]),
            });
        }

        Document {
            scene,
            scenes,
            nodes,
            meshes,
            accessors,
            buffer_views,
            buffers,
        }
    }
}

/// Walks the node tree depth-first from the given roots, multiplying
/// transforms on the way down, and reports every mesh instance it finds
/// along with its world transform.
pub fn visit_mesh_instances(
    nodes: &[Node],
    root_indices: &[usize],
    root_transform: Mat4,
    visit: &mut dyn FnMut(usize, Mat4),
) {
    let mut node_queue = root_indices
        .iter()
        .map(|&i| (root_transform, &nodes[i]))
        .collect::<Vec<_>>();
    while let Some((parent_transform, node)) = node_queue.pop() {
        let transform = parent_transform * node.transform;
        if let Some(mesh_index) = node.mesh_index {
            visit(mesh_index, transform);
        }
        for &child_index in &node.child_node_indices {
            node_queue.push((transform, &nodes[child_index]));
        }
    }
}

/// Return usize if JsonValue is a number, otherwise panic.
fn take_usize(json_value: &JsonValue) -> usize {
    let i: &f64 = json_value.get().unwrap();
    *i as usize
}

/// Return Vec3 if JsonValue is a three-element array, otherwise panic.
fn take_vec3(json_value: &JsonValue) -> Vec3 {
    let values: &Vec<JsonValue> = json_value.get().unwrap();
    assert_eq!(3, values.len());
    let x = *values[0].get::<f64>().unwrap() as f32;
    let y = *values[1].get::<f64>().unwrap() as f32;
    let z = *values[2].get::<f64>().unwrap() as f32;
    Vec3::new(x, y, z)
}

/// Return Quat if JsonValue is a four-element array, otherwise panic.
fn take_quat(json_value: &JsonValue) -> Quat {
    let values: &Vec<JsonValue> = json_value.get().unwrap();
    assert_eq!(4, values.len());
    let x = *values[0].get::<f64>().unwrap() as f32;
    let y = *values[1].get::<f64>().unwrap() as f32;
    let z = *values[2].get::<f64>().unwrap() as f32;
    let w = *values[3].get::<f64>().unwrap() as f32;
    Quat::from_xyzw(x, y, z, w)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_GLTF: &str = r#"{
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0, "translation": [1, 2, 3]}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteLength": 36, "target": 34962},
            {"buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963}
        ],
        "buffers": [{"uri": "tri.bin", "byteLength": 42}]
    }"#;

    #[test]
    fn parses_the_rendering_related_fields() {
        let document = Document::parse(TRIANGLE_GLTF);
        assert_eq!(0, document.scene);
        assert_eq!(vec![0], document.scenes[0].node_indices);

        let node = &document.nodes[0];
        assert_eq!(Some(0), node.mesh_index);
        assert!(node.child_node_indices.is_empty());
        let translation = node.transform.transform_point3(Vec3::ZERO);
        assert!(translation.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));

        let primitive = &document.meshes[0].primitives[0];
        assert_eq!(vec![("POSITION".to_string(), 0)], primitive.attributes);
        assert_eq!(1, primitive.indices);
        assert_eq!(4, primitive.mode);

        let position = &document.accessors[0];
        assert_eq!(0, position.buffer_view);
        assert_eq!(0, position.byte_offset);
        assert_eq!(3, position.count);
        assert_eq!(5126, position.component_type);
        assert_eq!(3, position.component_count);
        assert!(!position.normalized);
        let indices = &document.accessors[1];
        assert_eq!(5123, indices.component_type);
        assert_eq!(1, indices.component_count);

        let views = &document.buffer_views;
        assert_eq!((0, 36, 0), (views[0].byte_offset, views[0].byte_length, views[0].byte_stride));
        assert_eq!(Some(34962), views[0].target);
        assert_eq!((36, 6), (views[1].byte_offset, views[1].byte_length));
        assert_eq!(Some(34963), views[1].target);

        assert_eq!(Some("tri.bin"), document.buffers[0].uri.as_deref());
        assert_eq!(42, document.buffers[0].byte_length);
    }

    #[test]
    fn node_matrix_is_read_column_major() {
        let gltf = TRIANGLE_GLTF.replace(
            r#""nodes": [{"mesh": 0, "translation": [1, 2, 3]}]"#,
            r#""nodes": [{"mesh": 0, "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 4,5,6,1]}]"#,
        );
        let document = Document::parse(&gltf);
        let translation = document.nodes[0].transform.transform_point3(Vec3::ZERO);
        assert!(translation.abs_diff_eq(Vec3::new(4.0, 5.0, 6.0), 1e-6));
    }

    #[test]
    fn node_trs_scales_before_translating() {
        let gltf = TRIANGLE_GLTF.replace(
            r#""nodes": [{"mesh": 0, "translation": [1, 2, 3]}]"#,
            r#""nodes": [{"mesh": 0, "translation": [10, 0, 0], "scale": [2, 2, 2]}]"#,
        );
        let document = Document::parse(&gltf);
        let transformed = document.nodes[0].transform.transform_point3(Vec3::X);
        assert!(transformed.abs_diff_eq(Vec3::new(12.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn node_rotation_is_an_xyzw_quaternion() {
        // 90 degrees around +Z.
        let gltf = TRIANGLE_GLTF.replace(
            r#""nodes": [{"mesh": 0, "translation": [1, 2, 3]}]"#,
            r#""nodes": [{"mesh": 0, "rotation": [0, 0, 0.7071068, 0.7071068]}]"#,
        );
        let document = Document::parse(&gltf);
        let transformed = document.nodes[0].transform.transform_point3(Vec3::X);
        assert!(transformed.abs_diff_eq(Vec3::Y, 1e-5));
    }

    fn meshless(children: Vec<usize>, transform: Mat4) -> Node {
        Node {
            mesh_index: None,
            child_node_indices: children,
            transform,
        }
    }

    fn with_mesh(mesh_index: usize, transform: Mat4) -> Node {
        Node {
            mesh_index: Some(mesh_index),
            child_node_indices: Vec::new(),
            transform,
        }
    }

    #[test]
    fn visit_accumulates_transforms_down_the_tree() {
        let nodes = [
            meshless(vec![1], Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))),
            with_mesh(7, Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))),
        ];
        let mut visited = Vec::new();
        visit_mesh_instances(&nodes, &[0], Mat4::IDENTITY, &mut |mesh, transform| {
            visited.push((mesh, transform.transform_point3(Vec3::ZERO)));
        });
        assert_eq!(1, visited.len());
        assert_eq!(7, visited[0].0);
        assert!(visited[0].1.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn visit_skips_meshless_nodes_but_not_their_children() {
        let nodes = [
            meshless(vec![1, 2], Mat4::IDENTITY),
            with_mesh(0, Mat4::IDENTITY),
            with_mesh(1, Mat4::IDENTITY),
        ];
        let mut visited = Vec::new();
        visit_mesh_instances(&nodes, &[0], Mat4::IDENTITY, &mut |mesh, _| {
            visited.push(mesh);
        });
        visited.sort();
        assert_eq!(vec![0, 1], visited);
    }

    #[test]
    fn visit_applies_the_root_transform_to_every_root_node() {
        let nodes = [
            with_mesh(0, Mat4::from_translation(Vec3::X)),
            with_mesh(1, Mat4::from_translation(Vec3::Y)),
        ];
        let root_transform = Mat4::from_scale(Vec3::splat(2.0));
        let mut visited = Vec::new();
        visit_mesh_instances(&nodes, &[0, 1], root_transform, &mut |mesh, transform| {
            visited.push((mesh, transform.transform_point3(Vec3::ZERO)));
        });
        visited.sort_by_key(|(mesh, _)| *mesh);
        assert!(visited[0].1.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
        assert!(visited[1].1.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-6));
    }
}
