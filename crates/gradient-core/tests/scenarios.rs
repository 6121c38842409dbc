use gradient_core::blend::BlendMode;
use gradient_core::clock::Timeline;
use gradient_core::compositor::{shade, ShapeSettings};
use gradient_core::layer::LayerUpdate;
use gradient_core::noise::Simplex;
use gradient_core::quality::FramePolicy;
use gradient_core::raster::render_snapshot;
use gradient_core::sampler::{FlowSettings, LayeredFlowSampler};
use gradient_core::store::{FrameSnapshot, GradientStore};
use gradient_core::{ColorPair, ColorSchemeRef, GradientParameters, ShareableGradient};
use glam::{Vec2, Vec3};

/// Straight-line evaluation of the whole per-pixel pipeline, written without
/// any of the crate's helpers except the raw lattice.
fn reference_pixel(uv: Vec2, time: f32) -> Vec3 {
    let n = Simplex::noise;
    let (noise_scale, flow_intensity) = (2.0f32, 0.3f32);
    let octaves = 5; // round(3 * 1.5)
    let t = time * 0.5;
    let eps = 0.01f32;

    let mut sum = 0.0f32;
    for k in 1..=octaves {
        let i = k as f32;
        let p = uv * i * noise_scale;
        let dx = (n(p + Vec2::new(eps, 0.0)) - n(p - Vec2::new(eps, 0.0))) / (2.0 * eps);
        let dy = (n(p + Vec2::new(0.0, eps)) - n(p - Vec2::new(0.0, eps))) / (2.0 * eps);
        let flow = Vec2::new(dy, -dx) * flow_intensity;
        let animated = uv + flow * (t * i * 0.5).sin() * 0.2;
        sum += n(animated * i * noise_scale + Vec2::splat(t * i * 0.3)) / i;
    }
    let s = sum * 0.5 + 0.5;

    let e = ((s - 0.3) / (0.7 - 0.3)).clamp(0.0, 1.0);
    let shape = e * e * (3.0 - 2.0 * e);
    let c1 = Vec3::new(0.9, 0.1, 0.1);
    let c2 = Vec3::new(0.0, 0.0, 0.9);
    let mixed = c1 + (c2 - c1) * shape;
    let lum = 0.299 * mixed.x + 0.587 * mixed.y + 0.114 * mixed.z;
    let vivid = Vec3::splat(lum) + (mixed - Vec3::splat(lum)) * 1.2;
    let grain = n(uv * 500.0) * 0.05;
    let out = vivid + Vec3::splat(grain);
    Vec3::new(
        out.x.max(0.0).powf(1.0 / 2.2).clamp(0.0, 1.0),
        out.y.max(0.0).powf(1.0 / 2.2).clamp(0.0, 1.0),
        out.z.max(0.0).powf(1.0 / 2.2).clamp(0.0, 1.0),
    )
}

#[test]
fn reference_scenario_matches_independent_evaluation() {
    let mut store = GradientStore::new();
    store.set_complexity(3);
    store.set_noise_scale(2.0);
    store.set_flow_intensity(0.3);
    store.set_threshold_min(0.3);
    store.set_threshold_max(0.7);
    store.set_custom_color1(Vec3::new(0.9, 0.1, 0.1));
    store.set_custom_color2(Vec3::new(0.0, 0.0, 0.9));
    store.set_custom_mode(true);

    let snap = store.snapshot(&FramePolicy::default(), &Timeline::new());
    let layer = &snap.layers[0];
    assert_eq!(layer.flow.octaves, 5);
    assert_eq!(layer.time, 0.0);

    let uv = Vec2::splat(0.5);
    let sampler = LayeredFlowSampler::new(Simplex);
    let s = sampler.sample(uv, layer.time, &layer.flow);
    let got = shade(&Simplex, s, uv, &layer.shape);
    let want = reference_pixel(uv, 0.0);
    assert!(
        (got - want).abs().max_element() < 1e-4,
        "got {got:?}, want {want:?}"
    );

    // Same agreement once time has moved on.
    let s = sampler.sample(uv, 3.7, &layer.flow);
    let got = shade(&Simplex, s, uv, &layer.shape);
    let want = reference_pixel(uv, 3.7);
    assert!((got - want).abs().max_element() < 1e-4, "t=3.7: got {got:?}, want {want:?}");
}

#[test]
fn pausing_freezes_the_rendered_frame() {
    let mut store = GradientStore::new();
    let policy = FramePolicy::default();
    let mut timeline = Timeline::new();
    for _ in 0..30 {
        store.tick(&mut timeline, 1.0 / 60.0, &policy);
    }

    store.set_playing(false);
    store.tick(&mut timeline, 1.0 / 60.0, &policy);
    let frozen = render_snapshot(&store.snapshot(&policy, &timeline), 24, 16);

    for _ in 0..10 {
        store.tick(&mut timeline, 1.0 / 60.0, &policy);
        let frame = render_snapshot(&store.snapshot(&policy, &timeline), 24, 16);
        assert_eq!(frame, frozen);
    }

    store.set_playing(true);
    store.tick(&mut timeline, 1.0 / 60.0, &policy);
    let moving = render_snapshot(&store.snapshot(&policy, &timeline), 24, 16);
    assert_ne!(moving, frozen);
}

#[test]
fn hidden_middle_layer_is_the_same_as_leaving_it_out() {
    let policy = FramePolicy::default();
    let timeline = Timeline::new();

    let mut three = GradientStore::new();
    three.set_multi_layer_mode(true);
    let bottom = three.layers().active_id().to_string();
    let middle = three.add_layer();
    let top = three.add_layer();
    three.update_layer(
        &bottom,
        LayerUpdate {
            params: Some(GradientParameters {
                colors: ColorSchemeRef::Named("neon".into()),
                ..GradientParameters::default()
            }),
            ..Default::default()
        },
    );
    three.update_layer(
        &middle,
        LayerUpdate {
            visible: Some(false),
            blend_mode: Some(BlendMode::Difference),
            ..Default::default()
        },
    );
    three.update_layer(
        &top,
        LayerUpdate {
            opacity: Some(0.6),
            blend_mode: Some(BlendMode::Screen),
            params: Some(GradientParameters {
                noise_scale: 3.5,
                colors: ColorSchemeRef::Inline(ColorPair::new(Vec3::new(0.2, 0.8, 0.4), Vec3::ONE)),
                ..GradientParameters::default()
            }),
            ..Default::default()
        },
    );

    let mut two = three.clone();
    two.remove_layer(&middle);

    let a = three.snapshot(&policy, &timeline);
    let b = two.snapshot(&policy, &timeline);
    assert_eq!(a.layers, b.layers);
    assert_eq!(render_snapshot(&a, 20, 12), render_snapshot(&b, 20, 12));
}

#[test]
fn the_last_layer_survives_removal() {
    let mut store = GradientStore::new();
    store.set_multi_layer_mode(true);
    let second = store.add_layer();
    let first = store.layers().layers()[0].id.clone();
    assert!(store.remove_layer(&first));
    assert!(!store.remove_layer(&second));
    assert_eq!(store.layers().len(), 1);
    assert_eq!(store.layers().active_id(), second);
}

#[test]
fn shared_link_round_trips_in_range_settings() {
    let mut source = GradientStore::new();
    source.apply_preset(gradient_core::Preset::Cosmic);
    source.set_flow_intensity(0.75);
    source.set_threshold_min(0.25);
    source.set_threshold_max(0.55);

    let link = source.shareable().share_url("https://example.org/gradient");
    let parsed = ShareableGradient::parse(&link).expect("link should parse");

    let mut target = GradientStore::new();
    target.import_settings(&parsed);
    assert_eq!(target.params(), source.params());
    assert_eq!(target.color_scheme(), source.color_scheme());

    let policy = FramePolicy::default();
    let timeline = Timeline::new();
    let a: FrameSnapshot = source.snapshot(&policy, &timeline);
    let b = target.snapshot(&policy, &timeline);
    assert_eq!(a.layers, b.layers);
}

#[test]
fn flow_settings_drive_octaves_not_complexity() {
    let sampler = LayeredFlowSampler::new(Simplex);
    let base = FlowSettings {
        octaves: 3,
        noise_scale: 2.0,
        flow_intensity: 0.3,
    };
    let more = FlowSettings { octaves: 4, ..base };
    let uv = Vec2::new(0.3, 0.6);
    assert_ne!(sampler.sample(uv, 1.0, &base), sampler.sample(uv, 1.0, &more));
    let unit = ShapeSettings {
        threshold_min: 0.3,
        threshold_max: 0.7,
        color1: Vec3::ZERO,
        color2: Vec3::ONE,
        grain_amount: 0.0,
        grain_scale: 1.0,
    };
    let c = shade(&Simplex, sampler.sample(uv, 1.0, &base), uv, &unit);
    assert!(c.min_element() >= 0.0 && c.max_element() <= 1.0);
}
