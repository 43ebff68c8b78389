use glam::Mat4;

use crate::renderer::draw_calls::{DrawCall, DrawCalls};
use crate::renderer::gl;

pub mod document;
mod loader;
mod program;

pub use loader::load_gltf_file;
pub use program::*;

use document::{Node, Scene};

/// A glTF model with its vertex and index data uploaded to the GPU: the
/// scene graph as parsed, one VAO per primitive, and one GL buffer per
/// buffer view the accessors reference.
pub struct Gltf {
    pub scene: usize,
    scenes: Vec<Scene>,
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    primitives: Vec<Primitive>,

    gl_vaos: Vec<gl::types::GLuint>,
    /// Indexed by buffer view; views that were never uploaded hold 0.
    gl_buffers: Vec<gl::types::GLuint>,
}

pub struct Mesh {
    pub primitive_indices: Vec<usize>,
}

pub struct Primitive {
    pub draw_call: DrawCall,
}

impl Gltf {
    /// Queues one draw per primitive of every mesh instance in the default
    /// scene, with the node hierarchy's transforms baked in.
    pub fn draw(&self, draw_calls: &mut DrawCalls, model_transform: Mat4) {
        let scene = &self.scenes[self.scene];
        document::visit_mesh_instances(
            &self.nodes,
            &scene.node_indices,
            model_transform,
            &mut |mesh_index, transform| {
                for &primitive_index in &self.meshes[mesh_index].primitive_indices {
                    let primitive = &self.primitives[primitive_index];
                    let mut draw_call = primitive.draw_call.clone();
                    draw_call.front_face = front_face(&transform);
                    draw_calls.add(draw_call, transform);
                }
            },
        );
    }
}

/// glTF spec section 3.7.4: a transform with a negative determinant flips
/// the winding order.
fn front_face(transform: &Mat4) -> gl::types::GLenum {
    (transform.determinant() > 0.0)
        .then_some(gl::CCW)
        .unwrap_or(gl::CW)
}

impl Drop for Gltf {
    fn drop(&mut self) {
        gl::call!(gl::DeleteVertexArrays(
            self.gl_vaos.len() as i32,
            self.gl_vaos.as_ptr(),
        ));
        gl::call!(gl::DeleteBuffers(
            self.gl_buffers.len() as i32,
            self.gl_buffers.as_ptr(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn winding_flips_with_the_transform_determinant() {
        assert_eq!(gl::CCW, front_face(&Mat4::IDENTITY));
        assert_eq!(
            gl::CW,
            front_face(&Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)))
        );
        // Two flips cancel out.
        assert_eq!(
            gl::CCW,
            front_face(&Mat4::from_scale(Vec3::new(-1.0, -1.0, 1.0)))
        );
    }
}
