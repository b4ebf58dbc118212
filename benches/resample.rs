use criterion::{black_box, criterion_group, criterion_main, Criterion};
use raster_warp::{Filter, Graph, NodeId, PixelBuffer, Rectangle, Rgba, TransformKind, TransformNode};

const SIZE: i32 = 256;

fn source() -> PixelBuffer {
    let rect = Rectangle::new(0, 0, SIZE, SIZE);
    let pixels = (0..rect.area())
        .map(|i| {
            let v = (i % 251) as f32 / 251.0;
            Rgba::new(v, 1.0 - v, 0.5 * v, 1.0)
        })
        .collect();
    PixelBuffer::from_pixels(rect, pixels).unwrap()
}

fn graph(kind: TransformKind, filter: Filter) -> (Graph, NodeId) {
    let mut g = Graph::new();
    let s = g.add_source(source());
    let t = g.add_transform(
        TransformNode::new(kind)
            .with_filter(filter)
            .with_origin(SIZE as f64 / 2.0, SIZE as f64 / 2.0),
    );
    g.connect(s, t).unwrap();
    (g, t)
}

fn bench_filters(c: &mut Criterion) {
    let out = Rectangle::new(0, 0, SIZE, SIZE);
    for filter in [
        Filter::Nearest,
        Filter::Linear,
        Filter::Cubic,
        Filter::Lanczos,
        Filter::Generic,
    ] {
        let (g, t) = graph(TransformKind::Rotate { degrees: 30.0 }, filter);
        c.bench_function(&format!("rotate_30_{filter}"), |b| {
            b.iter(|| black_box(g.render(t, out).unwrap()))
        });
    }
}

fn bench_paths(c: &mut Criterion) {
    let out = Rectangle::new(0, 0, SIZE, SIZE);
    let cases = [
        ("integer_shift", TransformKind::Translate { x: 3.0, y: -7.0 }),
        (
            "axis_flip",
            TransformKind::Matrix {
                transform: "scale(-1,1)".into(),
            },
        ),
        ("downscale_half", TransformKind::Scale { x: 0.5, y: 0.5 }),
        (
            "projective",
            TransformKind::Matrix {
                transform: "matrix(1,0.1,0,0,1,0,0.001,0.0005,1)".into(),
            },
        ),
    ];
    for (name, kind) in cases {
        let (g, t) = graph(kind, Filter::Linear);
        c.bench_function(name, |b| b.iter(|| black_box(g.render(t, out).unwrap())));
    }
}

criterion_group!(benches, bench_filters, bench_paths);
criterion_main!(benches);
