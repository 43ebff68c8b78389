use std::ffi::c_void;
use std::ptr;

use crate::renderer::gl;

/// One growing GL buffer that per-frame data is bump-allocated into. A CPU
/// side copy of the current frame's bytes is kept around so that growing the
/// buffer can re-upload everything written so far.
pub struct StreamBuffer {
    buffer: gl::types::GLuint,
    size: usize,
    data: Vec<u8>,
}

impl StreamBuffer {
    pub fn new() -> StreamBuffer {
        let mut buffer = 0;
        gl::call!(gl::GenBuffers(1, &mut buffer));
        StreamBuffer {
            buffer,
            size: 0,
            data: Vec::new(),
        }
    }

    /// Writes the bytes into the buffer, and returns the buffer along with
    /// the offset the bytes start at, in the pointer form that vertex
    /// attribute offsets want.
    pub fn upload(&mut self, bytes: &[u8]) -> (gl::types::GLuint, *const c_void) {
        let offset = self.data.len();
        gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, self.buffer));
        if offset + bytes.len() > self.size {
            self.size = (self.size + bytes.len()) * 2;
            // Allocate the new space, then upload back the bytes written so
            // far this frame.
            gl::call!(gl::BufferData(
                gl::ARRAY_BUFFER,
                self.size as isize,
                ptr::null(),
                gl::DYNAMIC_DRAW,
            ));
            gl::call!(gl::BufferSubData(
                gl::ARRAY_BUFFER,
                0,
                self.data.len() as isize,
                self.data.as_ptr() as *const c_void,
            ));
        }
        gl::call!(gl::BufferSubData(
            gl::ARRAY_BUFFER,
            offset as isize,
            bytes.len() as isize,
            bytes.as_ptr() as *const c_void,
        ));
        self.data.extend_from_slice(bytes);
        (self.buffer, unsafe { ptr::null::<c_void>().add(offset) })
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl Drop for StreamBuffer {
    fn drop(&mut self) {
        gl::call!(gl::DeleteBuffers(1, &self.buffer));
    }
}
