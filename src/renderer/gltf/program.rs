use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::renderer::gl;

/// The vertex attribute location of the POSITION attribute of glTF models.
pub const ATTR_LOC_POSITION: gl::types::GLuint = 0;
/// The vertex attribute location of the NORMAL attribute of glTF models.
pub const ATTR_LOC_NORMAL: gl::types::GLuint = 1;
/// The vertex attribute location of the TANGENT attribute of glTF models.
pub const ATTR_LOC_TANGENT: gl::types::GLuint = 2;
/// The vertex attribute location of the TEXCOORD0 attribute of glTF models.
pub const ATTR_LOC_TEXCOORD_0: gl::types::GLuint = 3;
/// The vertex attribute location of the TEXCOORD1 attribute of glTF models.
pub const ATTR_LOC_TEXCOORD_1: gl::types::GLuint = 4;
/// The vertex attribute location of the COLOR0 attribute of glTF models.
pub const ATTR_LOC_COLOR_0: gl::types::GLuint = 5;
/// The vertex attribute locations of the individual columns of the
/// MODEL_TRANSFORM mat4 attribute, streamed per-instance at draw time.
pub const ATTR_LOC_MODEL_TRANSFORM_COLUMNS: [gl::types::GLuint; 4] = [6, 7, 8, 9];

pub struct ShaderProgram {
    pub program: gl::types::GLuint,
    pub proj_view_matrix_location: gl::types::GLint,
}

/// Compiles and links the fixed shader pair used to render the glTF model,
/// reading both sources from the given files.
pub fn create_program(vertex_path: &Path, fragment_path: &Path) -> anyhow::Result<ShaderProgram> {
    let vertex_source = fs::read_to_string(vertex_path)
        .with_context(|| format!("could not read vertex shader {}", vertex_path.display()))?;
    let fragment_source = fs::read_to_string(fragment_path)
        .with_context(|| format!("could not read fragment shader {}", fragment_path.display()))?;
    let vertex_shader = gl::create_shader(gl::VERTEX_SHADER, &vertex_source);
    let fragment_shader = gl::create_shader(gl::FRAGMENT_SHADER, &fragment_source);
    let program = gl::create_program(&[vertex_shader, fragment_shader]);
    gl::call!(gl::UseProgram(program));
    let proj_view_matrix_location = gl::get_uniform_location(program, "projViewMatrix")
        .context("the shader program has no projViewMatrix uniform")?;
    gl::call!(gl::DeleteShader(vertex_shader));
    gl::call!(gl::DeleteShader(fragment_shader));
    Ok(ShaderProgram {
        program,
        proj_view_matrix_location,
    })
}
