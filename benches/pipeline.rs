use criterion::{black_box, criterion_group, criterion_main, Criterion};

use haze::core::types::{CameraKind, Viewport};
use haze::effects::{
    DepthFog, FogSettings, KawaseBlur, KawaseBlurSettings, Sharpen, VolumetricLighting,
};
use haze::frame::{AuxInputs, FrameContext};
use haze::material::MaterialRegistry;
use haze::pipeline::PostPipeline;
use haze::target::backing::HeadlessBacking;

fn registry() -> MaterialRegistry {
    let mut reg = MaterialRegistry::new();
    reg.register(haze::effects::blur::MATERIAL);
    reg.register(haze::effects::fog::MATERIAL);
    reg.register(haze::effects::fog::COMPOSITE_MATERIAL);
    reg.register(haze::effects::sharpen::MATERIAL);
    reg.register(haze::effects::volumetric::MATERIAL);
    reg
}

fn frame() -> FrameContext {
    FrameContext::new(CameraKind::Game, Viewport::new(1920, 1080)).with_inputs(AuxInputs {
        depth: true,
        normals: true,
    })
}

fn bench_record_blur_chain(c: &mut Criterion) {
    let mut pipeline = PostPipeline::new();
    pipeline.add_effect(KawaseBlur::new(KawaseBlurSettings {
        passes: 15,
        ..Default::default()
    }));
    let mut backing = HeadlessBacking::new();
    let reg = registry();
    let frame = frame();

    c.bench_function("record_blur_15_passes", |b| {
        b.iter(|| {
            pipeline.begin_frame(black_box(&frame)).unwrap();
            let cmds = pipeline.run(&frame, &mut backing, &reg);
            pipeline.end_frame();
            black_box(cmds.len())
        });
    });
}

fn bench_record_full_chain(c: &mut Criterion) {
    let mut fog = FogSettings::default();
    fog.depth.density = 0.5;
    let mut pipeline = PostPipeline::new();
    pipeline.add_effect(DepthFog::new(fog));
    pipeline.add_effect(KawaseBlur::default());
    pipeline.add_effect(VolumetricLighting::default());
    pipeline.add_effect(Sharpen::default());
    let mut backing = HeadlessBacking::new();
    let reg = registry();
    let frame = frame();

    c.bench_function("record_full_chain", |b| {
        b.iter(|| {
            pipeline.begin_frame(black_box(&frame)).unwrap();
            let cmds = pipeline.run(&frame, &mut backing, &reg);
            pipeline.end_frame();
            black_box(cmds.len())
        });
    });
}

fn bench_pool_resize_churn(c: &mut Criterion) {
    let mut pipeline = PostPipeline::new();
    pipeline.add_effect(KawaseBlur::default());
    let mut backing = HeadlessBacking::new();
    let reg = registry();
    let sizes = [(1920u32, 1080u32), (1280, 720)];

    c.bench_function("pool_resize_churn", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            let (w, h) = sizes[i % 2];
            let frame = FrameContext::new(CameraKind::Game, Viewport::new(w, h));
            pipeline.begin_frame(&frame).unwrap();
            let cmds = pipeline.run(&frame, &mut backing, &reg);
            pipeline.end_frame();
            black_box(cmds.len())
        });
    });
}

criterion_group!(
    benches,
    bench_record_blur_chain,
    bench_record_full_chain,
    bench_pool_resize_churn
);
criterion_main!(benches);
