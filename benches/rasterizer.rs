use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rasterlite::bench::{rasterize_triangle, RasterTarget, ScreenTriangle, ScreenVertex};
use rasterlite::color::RgbF32;
use rasterlite::math::vec2::Vec2;
use rasterlite::pixel::Rgba8888;
use rasterlite::shader::ShaderFlags;

const BUFFER_WIDTH: usize = 800;
const BUFFER_HEIGHT: usize = 600;

fn create_buffer() -> Vec<Rgba8888> {
    vec![Rgba8888::default(); BUFFER_WIDTH * BUFFER_HEIGHT]
}

fn vertex(x: f32, y: f32) -> ScreenVertex {
    ScreenVertex { x, y, inv_w: 1.0, color: RgbF32::new(1.0, 0.0, 0.0), texcoord: Vec2::ZERO }
}

fn small_triangle() -> ScreenTriangle {
    ScreenTriangle {
        vertices: [vertex(100.0, 100.0), vertex(120.0, 100.0), vertex(110.0, 120.0)],
        flags: ShaderFlags::FLAT,
    }
}

fn medium_triangle() -> ScreenTriangle {
    ScreenTriangle {
        vertices: [vertex(100.0, 100.0), vertex(300.0, 100.0), vertex(200.0, 300.0)],
        flags: ShaderFlags::FLAT,
    }
}

fn large_triangle() -> ScreenTriangle {
    ScreenTriangle {
        vertices: [vertex(50.0, 50.0), vertex(750.0, 100.0), vertex(400.0, 550.0)],
        flags: ShaderFlags::FLAT,
    }
}

fn benchmark_single_triangle(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_triangle");

    for (name, tri) in
        [("small", small_triangle()), ("medium", medium_triangle()), ("large", large_triangle())]
    {
        group.bench_with_input(BenchmarkId::new("edge_function", name), &tri, |b, tri| {
            let mut buffer = create_buffer();
            b.iter(|| {
                let mut target = RasterTarget::new(&mut buffer, BUFFER_WIDTH, BUFFER_HEIGHT);
                rasterize_triangle(black_box(tri), &mut target, None, None);
            });
        });
    }

    group.finish();
}

fn benchmark_many_triangles(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_triangles");

    let triangles: Vec<ScreenTriangle> = (0..20)
        .flat_map(|row| {
            (0..20).map(move |col| {
                let x = col as f32 * 40.0;
                let y = row as f32 * 30.0;
                ScreenTriangle {
                    vertices: [
                        vertex(x, y),
                        vertex(x + 35.0, y),
                        vertex(x + 17.5, y + 25.0),
                    ],
                    flags: ShaderFlags::FLAT,
                }
            })
        })
        .collect();

    group.bench_function("edge_function_400_triangles", |b| {
        let mut buffer = create_buffer();
        b.iter(|| {
            let mut target = RasterTarget::new(&mut buffer, BUFFER_WIDTH, BUFFER_HEIGHT);
            for tri in &triangles {
                rasterize_triangle(black_box(tri), &mut target, None, None);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_single_triangle, benchmark_many_triangles);
criterion_main!(benches);
