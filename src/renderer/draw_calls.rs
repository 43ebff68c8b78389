use std::collections::HashMap;
use std::ffi::c_void;
use std::mem;
use std::ptr;

use glam::Mat4;

use crate::renderer::gl;
use crate::renderer::gltf::ATTR_LOC_MODEL_TRANSFORM_COLUMNS;
use crate::renderer::stream_buffer::StreamBuffer;

/// Everything needed to dispatch one instanced, indexed draw of a single
/// primitive. Doubles as the key the per-frame batching groups by.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DrawCall {
    pub mode: gl::types::GLenum,
    pub vao: gl::types::GLuint,
    pub front_face: gl::types::GLenum,
    pub index_buffer: gl::types::GLuint,
    pub index_type: gl::types::GLenum,
    pub index_byte_offset: usize,
    pub index_count: gl::types::GLsizei,
}

/// Collects the primitives to render during a frame, grouped so that every
/// set of instances sharing identical draw state goes out as a single
/// instanced draw. The instance transforms are streamed into one shared
/// vertex buffer and read through the MODEL_TRANSFORM attribute.
pub struct DrawCalls {
    calls: HashMap<DrawCall, Vec<Mat4>>,
    transforms: StreamBuffer,
}

impl DrawCalls {
    pub fn new() -> DrawCalls {
        DrawCalls {
            calls: HashMap::new(),
            transforms: StreamBuffer::new(),
        }
    }

    pub fn add(&mut self, draw_call: DrawCall, transform: Mat4) {
        self.calls.entry(draw_call).or_default().push(transform);
    }

    /// Issues every queued draw and empties the queue.
    pub fn draw(&mut self) {
        for (call, transforms) in &self.calls {
            let (buffer, offset) = self.transforms.upload(bytemuck::cast_slice(transforms));
            gl::call!(gl::BindVertexArray(call.vao));
            gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, buffer));
            for (i, &location) in ATTR_LOC_MODEL_TRANSFORM_COLUMNS.iter().enumerate() {
                gl::call!(gl::EnableVertexAttribArray(location));
                gl::call!(gl::VertexAttribPointer(
                    location,
                    4,
                    gl::FLOAT,
                    gl::FALSE,
                    mem::size_of::<Mat4>() as gl::types::GLsizei,
                    offset.add(i * mem::size_of::<[f32; 4]>()),
                ));
                gl::call!(gl::VertexAttribDivisor(location, 1));
            }
            gl::call!(gl::FrontFace(call.front_face));
            gl::call!(gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, call.index_buffer));
            gl::call!(gl::DrawElementsInstanced(
                call.mode,
                call.index_count,
                call.index_type,
                ptr::null::<c_void>().add(call.index_byte_offset),
                transforms.len() as gl::types::GLsizei,
            ));
        }
        self.calls.clear();
        self.transforms.clear();
    }
}
