//! SDL2 demo: a lit, spinning cube rendered through [`rasterlite::RenderContext`].

use std::f32::consts::FRAC_PI_4;
use std::time::Instant;

use rasterlite::math::vec3::Vec3;
use rasterlite::mesh::{BoundingBox, Mesh};
use rasterlite::pixel::Rgba8888;
use rasterlite::{CullMode, DepthBuffer, RasterTarget, RenderContext, RgbF32, ShaderFlags};

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::rect::Rect;

const WINDOW_WIDTH: usize = 800;
const WINDOW_HEIGHT: usize = 600;

const CUBE_VERTICES: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
];

const CUBE_NORMALS: [Vec3; 6] =
    [Vec3::BACK, Vec3::RIGHT, Vec3::FORWARD, Vec3::LEFT, Vec3::UP, Vec3::DOWN];

/// One chain per face: a quad decomposed as a two-triangle strip, 0x8000
/// retaining slot 0 of the predecessor triangle (see `mesh::ChainDecoder`).
fn cube_faces() -> Vec<u16> {
    let quad = |a: u16, b: u16, c: u16, d: u16, n: u16| -> Vec<u16> {
        vec![2, a, n, b, n, c, n, 0x8000 | d, n]
    };
    let mut faces = Vec::new();
    faces.extend(quad(0, 1, 2, 3, 0));
    faces.extend(quad(5, 4, 7, 6, 1));
    faces.extend(quad(4, 5, 6, 7, 2));
    faces.extend(quad(1, 0, 3, 2, 3));
    faces.extend(quad(3, 2, 6, 7, 4));
    faces.extend(quad(4, 0, 1, 5, 5));
    faces.push(0);
    faces
}

fn main() -> Result<(), String> {
    let sdl_context = sdl2::init()?;
    let video_subsystem = sdl_context.video()?;

    let window = video_subsystem
        .window("rasterlite", WINDOW_WIDTH as u32, WINDOW_HEIGHT as u32)
        .position_centered()
        .build()
        .map_err(|e| e.to_string())?;

    let mut canvas = window.into_canvas().build().map_err(|e| e.to_string())?;
    let texture_creator = canvas.texture_creator();
    let mut texture = texture_creator
        .create_texture_streaming(PixelFormatEnum::ARGB8888, WINDOW_WIDTH as u32, WINDOW_HEIGHT as u32)
        .map_err(|e| e.to_string())?;

    let mut pixels = vec![Rgba8888::default(); WINDOW_WIDTH * WINDOW_HEIGHT];
    let mut depth = vec![0.0f32; WINDOW_WIDTH * WINDOW_HEIGHT];

    let faces = cube_faces();
    let mesh = Mesh {
        vertices: &CUBE_VERTICES,
        normals: Some(&CUBE_NORMALS),
        texcoords: None,
        texture: None,
        faces: &faces,
        bounding_box: BoundingBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)),
        material: Default::default(),
        next: None,
    };

    let mut ctx: RenderContext<Rgba8888, WINDOW_WIDTH, WINDOW_HEIGHT, true> = RenderContext::new();
    ctx.set_perspective(FRAC_PI_4, WINDOW_WIDTH as f32 / WINDOW_HEIGHT as f32, 0.1, 100.0);
    ctx.set_look_at(Vec3::new(0.0, 1.5, -5.0), Vec3::ZERO, Vec3::UP);
    ctx.set_cull_mode(CullMode::ClockwiseBack);
    ctx.set_light_direction(Vec3::new(-0.4, -0.8, 0.4));
    ctx.set_material_color(RgbF32::new(0.8, 0.35, 0.2));
    ctx.set_specular_exponent(48);

    let start = Instant::now();
    let mut event_pump = sdl_context.event_pump()?;
    let mut running = true;

    while running {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } | Event::KeyDown { keycode: Some(Keycode::Escape), .. } => {
                    running = false;
                }
                _ => {}
            }
        }

        let t = start.elapsed().as_secs_f32();
        let model = rasterlite::math::mat4::Mat4::rotation_y(t)
            * rasterlite::math::mat4::Mat4::rotation_x(t * 0.6);
        ctx.set_model(model);

        ctx.attach_raster_target(RasterTarget::new(&mut pixels, WINDOW_WIDTH, WINDOW_HEIGHT));
        ctx.attach_depth_buffer(DepthBuffer::new(&mut depth, WINDOW_WIDTH, WINDOW_HEIGHT));
        for p in pixels.iter_mut() {
            *p = Rgba8888::default();
        }
        ctx.clear_depth_buffer();

        ctx.draw_mesh(&mesh, ShaderFlags::GOURAUD, true).map_err(|e| e.to_string())?;

        let bytes: &[u8] = bytemuck_cast_pixels(&pixels);
        texture
            .update(None, bytes, WINDOW_WIDTH * 4)
            .map_err(|e| e.to_string())?;

        canvas.clear();
        canvas.copy(&texture, None, Some(Rect::new(0, 0, WINDOW_WIDTH as u32, WINDOW_HEIGHT as u32)))?;
        canvas.present();
    }

    Ok(())
}

/// `Rgba8888` is a transparent `u32`; reinterpreting the slice as bytes
/// avoids a per-pixel copy into a separate byte buffer.
fn bytemuck_cast_pixels(pixels: &[Rgba8888]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(pixels.as_ptr() as *const u8, std::mem::size_of_val(pixels)) }
}
