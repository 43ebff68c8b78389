use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use glam::{Mat4, Vec3};
use sdl2::video::Window;
use sdl2::VideoSubsystem;

mod draw_calls;
mod gl;
mod gltf;
mod stream_buffer;

use draw_calls::DrawCalls;
use gltf::{Gltf, ShaderProgram};

/// The files the viewer reads from the working directory at startup. The
/// model's buffer uris are resolved next to the model file.
const MODEL_PATH: &str = "model.gltf";
const VERTEX_SHADER_PATH: &str = "main.vert";
const FRAGMENT_SHADER_PATH: &str = "main.frag";

pub struct Renderer {
    program: ShaderProgram,
    model: Gltf,
    draw_calls: DrawCalls,
    viewport: (i32, i32),
    start_time: Instant,
}

impl Renderer {
    pub fn new(video: &VideoSubsystem, window: &Window) -> anyhow::Result<Renderer> {
        gl::load_with(|s| video.gl_get_proc_address(s) as *const core::ffi::c_void);
        video.gl_set_swap_interval(1).unwrap();
        let (w, h) = window.drawable_size();
        gl::call!(gl::Viewport(0, 0, w as i32, h as i32));

        let program = gltf::create_program(
            Path::new(VERTEX_SHADER_PATH),
            Path::new(FRAGMENT_SHADER_PATH),
        )?;
        let model = gltf::load_gltf_file(Path::new(MODEL_PATH)).context("could not load model")?;

        Ok(Renderer {
            program,
            model,
            draw_calls: DrawCalls::new(),
            viewport: (w as i32, h as i32),
            start_time: Instant::now(),
        })
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.viewport = (width, height);
        gl::call!(gl::Viewport(0, 0, width, height));
    }

    pub fn render(&mut self) {
        let time = self.start_time.elapsed().as_secs_f32();

        gl::call!(gl::ClearColor(1.0, 0.75, 0.5, 1.0));
        gl::call!(gl::ClearDepthf(0.0));
        gl::call!(gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT));

        gl::call!(gl::Enable(gl::DEPTH_TEST));
        // Reversed depth range, the projection maps near to 1 and far to 0.
        gl::call!(gl::DepthFunc(gl::GREATER));

        let (width, height) = self.viewport;
        let aspect = width as f32 / height as f32;
        let proj_view = projection_matrix(aspect) * view_matrix(time);

        gl::call!(gl::UseProgram(self.program.program));
        gl::call!(gl::UniformMatrix4fv(
            self.program.proj_view_matrix_location,
            1,
            gl::FALSE,
            proj_view.to_cols_array().as_ptr(),
        ));

        self.model.draw(&mut self.draw_calls, model_matrix(time));
        self.draw_calls.draw();

        gl::call!(gl::Disable(gl::DEPTH_TEST));
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        gl::call!(gl::DeleteProgram(self.program.program));
    }
}

/// Hermite smoothstep between 0 and 1, as in GLSL.
fn smoothstep(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

/// The model spins one full turn around +X every two seconds, eased so that
/// it lingers at every full turn.
fn model_matrix(time: f32) -> Mat4 {
    let cycle = (0.5 * time).fract();
    let angle = 2.0 * std::f32::consts::PI * smoothstep(cycle);
    Mat4::from_rotation_x(angle)
}

/// Slow orbit around the origin, from slightly above, +Z up.
fn view_matrix(time: f32) -> Mat4 {
    let angle = 0.1 * time;
    let eye = Vec3::new(5.0 * angle.cos(), 5.0 * angle.sin(), 2.0);
    Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Z)
}

/// The near and far planes are swapped to get the reversed depth range the
/// rest of the renderer expects.
fn projection_matrix(aspect: f32) -> Mat4 {
    Mat4::perspective_rh_gl(45f32.to_radians(), aspect, 100.0, 0.001)
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    #[test]
    fn smoothstep_matches_glsl() {
        assert_eq!(0.0, smoothstep(0.0));
        assert_eq!(1.0, smoothstep(1.0));
        assert_eq!(0.5, smoothstep(0.5));
        // Clamped outside the unit interval.
        assert_eq!(0.0, smoothstep(-2.0));
        assert_eq!(1.0, smoothstep(3.0));
        // Eases in: barely moving near the ends of the interval.
        assert!(smoothstep(0.01) < 0.001);
        assert!(smoothstep(0.99) > 0.999);
    }

    #[test]
    fn model_spin_repeats_every_two_seconds() {
        assert!(model_matrix(0.0).abs_diff_eq(Mat4::IDENTITY, 1e-5));
        assert!(model_matrix(0.7).abs_diff_eq(model_matrix(2.7), 1e-4));
    }

    #[test]
    fn model_spin_is_a_rotation_around_x() {
        let spun = model_matrix(0.6).transform_point3(Vec3::X);
        assert!(spun.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn view_orbits_at_a_fixed_distance_from_the_origin() {
        for time in [0.0, 3.0, 17.5] {
            let view = view_matrix(time);
            let origin_in_view = view.transform_point3(Vec3::ZERO);
            assert!((origin_in_view.length() - 29f32.sqrt()).abs() < 1e-4);
        }
        // At t=0 the eye sits on the +X side of the orbit.
        let eye_in_view = view_matrix(0.0).transform_point3(Vec3::new(5.0, 0.0, 2.0));
        assert!(eye_in_view.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn projection_maps_closer_points_to_larger_depths() {
        let projection = projection_matrix(16.0 / 9.0);
        let depth = |z: f32| {
            let clip = projection * Vec4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };
        assert!(depth(-0.5) > depth(-5.0));
        assert!(depth(-5.0) > depth(-50.0));
    }
}
