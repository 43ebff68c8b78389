use std::ffi::c_void;
use std::fs;
use std::path::Path;
use std::ptr;

use anyhow::Context;

use crate::renderer::draw_calls::DrawCall;
use crate::renderer::gl;
use crate::renderer::gltf::document::Document;
use crate::renderer::gltf::{self, Gltf};

/// Reads a glTF file plus the buffer files its uris point to, relative to
/// the model's directory, and uploads the lot to the GPU.
pub fn load_gltf_file(path: &Path) -> anyhow::Result<Gltf> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("could not read model file {}", path.display()))?;
    let document = Document::parse(&json);
    let model_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut buffer_files = Vec::with_capacity(document.buffers.len());
    for buffer in &document.buffers {
        let Some(uri) = &buffer.uri else {
            anyhow::bail!("buffers without a uri are not supported");
        };
        let bytes = fs::read(model_dir.join(uri))
            .with_context(|| format!("could not read buffer file \"{uri}\""))?;
        buffer_files.push((uri.clone(), bytes));
    }
    let resources = buffer_files
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect::<Vec<_>>();
    Ok(upload(document, &resources))
}

/// Uploads a parsed glTF document whose buffers are already in memory.
/// `resources` maps buffer uris to their contents; a uri-less buffer (the
/// BIN chunk of a GLB) matches the entry named "".
fn upload(document: Document, resources: &[(&str, &[u8])]) -> Gltf {
    let Document {
        scene,
        scenes,
        nodes,
        meshes,
        accessors,
        buffer_views,
        buffers,
    } = document;

    let mut buffer_data = Vec::with_capacity(buffers.len());
    for buffer in &buffers {
        let buffer_resource_name = buffer.uri.as_deref().unwrap_or("");
        let mut bytes = None;
        for (resource_name, data) in resources {
            if *resource_name == buffer_resource_name {
                bytes = Some(*data);
            }
        }
        let Some(bytes) = bytes else {
            panic!("could not find buffer with uri \"{buffer_resource_name}\"");
        };
        assert_eq!(
            buffer.byte_length,
            bytes.len(),
            "buffer \"{buffer_resource_name}\" does not match its advertised byteLength",
        );
        buffer_data.push(bytes);
    }

    // Every buffer view an accessor can reach gets a GL buffer of its own,
    // so that attribute and index offsets only ever need the accessor's own
    // byte offset. Views that are neither targeted nor referenced stay at 0
    // (image data, once textures happen).
    let mut needs_upload = buffer_views
        .iter()
        .map(|view| view.target.is_some())
        .collect::<Vec<_>>();
    for accessor in &accessors {
        needs_upload[accessor.buffer_view] = true;
    }
    let mut gl_buffers = vec![0; buffer_views.len()];
    for (i, view) in buffer_views.iter().enumerate() {
        if !needs_upload[i] {
            continue;
        }
        let bytes = &buffer_data[view.buffer][view.byte_offset..view.byte_offset + view.byte_length];
        let mut gl_buffer = 0;
        gl::call!(gl::GenBuffers(1, &mut gl_buffer));
        gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, gl_buffer));
        gl::call!(gl::BufferData(
            gl::ARRAY_BUFFER,
            view.byte_length as isize,
            bytes.as_ptr() as *const c_void,
            gl::STATIC_DRAW,
        ));
        gl_buffers[i] = gl_buffer;
    }
    gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, 0));

    let primitive_count: usize = meshes.iter().map(|mesh| mesh.primitives.len()).sum();
    let mut gl_vaos = vec![0; primitive_count];
    gl::call!(gl::GenVertexArrays(
        gl_vaos.len() as i32,
        gl_vaos.as_mut_ptr()
    ));
    let mut primitives = Vec::with_capacity(primitive_count);
    let mut gltf_meshes = Vec::with_capacity(meshes.len());
    for mesh in &meshes {
        let mut primitive_indices = Vec::with_capacity(mesh.primitives.len());
        for primitive in &mesh.primitives {
            let primitive_index = primitives.len();
            let vao = gl_vaos[primitive_index];
            gl::call!(gl::BindVertexArray(vao));
            for (attr_name, accessor_index) in &primitive.attributes {
                let location = match attr_name.as_str() {
                    "POSITION" => gltf::ATTR_LOC_POSITION,
                    "NORMAL" => gltf::ATTR_LOC_NORMAL,
                    "TANGENT" => gltf::ATTR_LOC_TANGENT,
                    "TEXCOORD_0" => gltf::ATTR_LOC_TEXCOORD_0,
                    "TEXCOORD_1" => gltf::ATTR_LOC_TEXCOORD_1,
                    "COLOR_0" => gltf::ATTR_LOC_COLOR_0,
                    attr => {
                        eprintln!("ignoring unsupported attribute semantic \"{attr}\"");
                        continue;
                    }
                };
                let accessor = &accessors[*accessor_index];
                let view = &buffer_views[accessor.buffer_view];
                let gl_buffer = gl_buffers[accessor.buffer_view];
                debug_assert_ne!(0, gl_buffer);
                gl::call!(gl::EnableVertexAttribArray(location));
                gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, gl_buffer));
                gl::call!(gl::VertexAttribPointer(
                    location,
                    accessor.component_count,
                    accessor.component_type,
                    if accessor.normalized { gl::TRUE } else { gl::FALSE },
                    view.byte_stride as gl::types::GLsizei,
                    ptr::null::<c_void>().add(accessor.byte_offset),
                ));
            }

            let index_accessor = &accessors[primitive.indices];
            primitives.push(gltf::Primitive {
                draw_call: DrawCall {
                    mode: primitive.mode,
                    vao,
                    front_face: gl::CCW,
                    index_buffer: gl_buffers[index_accessor.buffer_view],
                    index_type: index_accessor.component_type,
                    index_byte_offset: index_accessor.byte_offset,
                    index_count: index_accessor.count as gl::types::GLsizei,
                },
            });
            primitive_indices.push(primitive_index);
        }
        gltf_meshes.push(gltf::Mesh { primitive_indices });
    }
    gl::call!(gl::BindVertexArray(0));

    // TODO: Make a texture from each image
    // - included fields: images, bufferviews

    // TODO: Make the required uniforms from each material
    // - included fields: materials, textures
    // - would probably be wise to batch up e.g. all baseColorFactors into one UBO, etc.,
    //   then store offsets into that in the materials

    Gltf {
        scene,
        scenes,
        nodes,
        meshes: gltf_meshes,
        primitives,
        gl_vaos,
        gl_buffers,
    }
}
