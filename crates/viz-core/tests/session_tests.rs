// Host-side tests for the visualizer session as a UI layer drives it.

mod common;

use common::{float_of, harness, harness_with, FakeSource};
use glam::Vec3;
use viz_core::constants::ROTATION_SPEED;
use viz_core::*;

#[test]
fn init_builds_default_object_with_controls_enabled() {
    let h = harness();
    let session = h.session.borrow();
    assert!(session.is_initialized());
    assert_eq!(session.mode(), Mode::ThreeD);
    assert_eq!(session.current_shader_3d(), "spiky");
    assert!(h.controls.log.borrow().enabled);
    assert_eq!(h.gfx.log.borrow().programs.len(), 1);
    let id = session.coordinator().active().unwrap().id();
    assert!(session.scene().unwrap().is_attached(id));
}

#[test]
fn frames_render_through_the_loop() {
    let h = harness();
    h.session
        .borrow_mut()
        .connect_audio(Box::new(FakeSource::with_bins(vec![128; 256])))
        .unwrap();
    Visualizer::start(&h.session);
    let frame_loop = h.session.borrow().frame_loop().clone();
    for _ in 0..3 {
        assert!(h.scheduler.fire(&frame_loop));
    }
    assert_eq!(h.gfx.log.borrow().renders, 3);
    assert_eq!(h.gfx.log.borrow().last_draw_count, 1);
    assert_eq!(h.controls.log.borrow().updates, 3);
    let level = float_of(&h.session.borrow().current_shader_params_3d(), "u_audioLevel");
    assert!(level.unwrap() > 0.4);
}

#[test]
fn render_failure_does_not_stop_the_loop() {
    let h = harness();
    Visualizer::start(&h.session);
    let frame_loop = h.session.borrow().frame_loop().clone();
    h.gfx.log.borrow_mut().fail_render = true;
    h.scheduler.fire(&frame_loop);
    h.gfx.log.borrow_mut().fail_render = false;
    h.scheduler.fire(&frame_loop);
    assert_eq!(frame_loop.borrow().fault_count(), 1);
    assert_eq!(h.gfx.log.borrow().renders, 1);
    assert!(h.scheduler.has_pending());
}

#[test]
fn switch_mode_pauses_and_restores_the_loop() {
    let h = harness();
    Visualizer::start(&h.session);
    let frame_loop = h.session.borrow().frame_loop().clone();
    h.session.borrow_mut().switch_mode(Mode::TwoD).unwrap();

    assert_eq!(frame_loop.borrow().pause_depth(), 0);
    assert!(h.scheduler.has_pending());
    assert_eq!(h.controls.log.borrow().resets, 1);
    assert!(!h.controls.log.borrow().enabled);
    assert_eq!(h.gfx.log.borrow().programs.len(), 1);
}

#[test]
fn switch_mode_and_reset_drops_custom_choices() {
    let h = harness();
    h.session.borrow_mut().change_shader_2d("waves");
    pollster::block_on(Visualizer::set_image(h.session.clone(), "a.png".into())).unwrap();
    assert!(h.session.borrow().coordinator().image().is_some());

    h.session.borrow_mut().switch_mode(Mode::ThreeD).unwrap();
    h.session.borrow_mut().switch_mode_and_reset(Mode::TwoD).unwrap();

    let session = h.session.borrow();
    assert_eq!(session.mode(), Mode::TwoD);
    assert_eq!(session.current_shader_2d(), "laser");
    assert!(session.coordinator().image().is_none());
    assert!(session.coordinator().active().unwrap().texture().is_none());
    assert!(h.gfx.log.borrow().textures.is_empty());
}

#[test]
fn unknown_shader_id_selects_default() {
    let h = harness();
    assert_eq!(h.session.borrow_mut().change_shader_3d("dna"), "dna");
    assert_eq!(h.session.borrow_mut().change_shader_3d("bogus"), "spiky");
    assert_eq!(h.session.borrow().current_shader_3d(), "spiky");
    assert_eq!(h.session.borrow_mut().change_shader_2d("bogus"), "laser");
}

#[test]
fn shader_listing_matches_catalogs() {
    let h = harness();
    let session = h.session.borrow();
    let ids: Vec<_> = session.list_shaders_2d().iter().map(|s| s.id).collect();
    assert_eq!(ids, ["laser", "rings", "waves", "fractal"]);
    let ids: Vec<_> = session.list_shaders_3d().iter().map(|s| s.id).collect();
    assert_eq!(ids, ["spiky", "wave", "dna", "liquid", "flower"]);
}

#[test]
fn params_of_inactive_mode_are_schema_defaults() {
    let h = harness();
    h.session.borrow_mut().change_shader_2d("rings");
    let params = h.session.borrow().current_shader_params_2d();
    let expected: Vec<_> = UniformSet::from_schema(shaders::lookup_2d("rings"))
        .iter()
        .collect();
    assert_eq!(params, expected);
}

#[test]
fn set_parameter_edits_live_entity_only() {
    let h = harness();
    let mut session = h.session.borrow_mut();
    assert!(session.set_parameter_3d("u_spikeAmount", UniformValue::Float(9.0)));
    assert_eq!(
        float_of(&session.current_shader_params_3d(), "u_spikeAmount"),
        Some(9.0)
    );

    let before = session.current_shader_params_3d();
    assert!(!session.set_parameter_3d("u_nonexistent", UniformValue::Float(1.0)));
    assert_eq!(session.current_shader_params_3d(), before);

    // 2D is not live
    assert!(!session.set_parameter_2d("u_speed", UniformValue::Float(1.0)));
}

#[test]
fn rotation_speed_scales_baseline_step() {
    let h = harness();
    let mut session = h.session.borrow_mut();
    session.set_rotation_speed(ROTATION_SPEED * 2.0);
    assert!((session.rotation_multiplier() - 2.0).abs() < 1e-6);
    session.frame().unwrap();
    let spin = session.coordinator().active().unwrap().spin();
    assert!((spin.x - ROTATION_SPEED * 2.0).abs() < 1e-6);

    // the multiplier survives a rebuild
    session.switch_mode(Mode::ThreeD).unwrap();
    session.frame().unwrap();
    let spin = session.coordinator().active().unwrap().spin();
    assert!((spin.y - ROTATION_SPEED * 2.0).abs() < 1e-6);
}

#[test]
fn rotation_speed_is_relative_to_configured_baseline() {
    let h = harness_with(VisualizerConfig {
        rotation_speed: 0.01,
        ..VisualizerConfig::default()
    });
    let mut session = h.session.borrow_mut();
    session.set_rotation_speed(0.01);
    assert!((session.rotation_multiplier() - 1.0).abs() < 1e-6);
    session.frame().unwrap();
    let spin = session.coordinator().active().unwrap().spin();
    assert!((spin.x - 0.01).abs() < 1e-6);
}

#[test]
fn zero_baseline_ignores_rotation_speed() {
    let h = harness_with(VisualizerConfig {
        rotation_speed: 0.0,
        ..VisualizerConfig::default()
    });
    let mut session = h.session.borrow_mut();
    session.set_rotation_speed(0.02);
    assert_eq!(session.rotation_multiplier(), 1.0);
    session.frame().unwrap();
    let spin = session.coordinator().active().unwrap().spin();
    assert_eq!(spin.x, 0.0);
}

#[test]
fn image_load_restores_orbited_camera() {
    let h = harness();
    h.controls.log.borrow_mut().orbit_to = Some(Vec3::new(5.0, 0.0, 0.5));
    h.session.borrow_mut().frame().unwrap();
    let eye = h.session.borrow().scene().unwrap().camera().eye;
    assert!((eye - Vec3::new(5.0, 0.0, 0.5)).length() < 1e-6);

    pollster::block_on(Visualizer::set_image(h.session.clone(), "a.png".into())).unwrap();

    let session = h.session.borrow();
    assert_eq!(session.mode(), Mode::TwoD);
    assert_eq!(h.controls.log.borrow().resets, 1);
    assert!(!h.controls.log.borrow().enabled);
    let eye = session.scene().unwrap().camera().eye;
    assert!((eye - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-6);
}

#[test]
fn model_load_restores_orbited_camera() {
    let h = harness();
    h.controls.log.borrow_mut().orbit_to = Some(Vec3::new(0.0, 4.0, 1.0));
    h.session.borrow_mut().frame().unwrap();

    pollster::block_on(Visualizer::set_model(
        h.session.clone(),
        "m.glb".into(),
        "glb".into(),
    ))
    .unwrap();

    let session = h.session.borrow();
    assert_eq!(session.mode(), Mode::ThreeD);
    assert_eq!(h.controls.log.borrow().resets, 1);
    let eye = session.scene().unwrap().camera().eye;
    assert!((eye - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-6);
}

#[test]
fn audio_resume_reuses_bound_source() {
    let h = harness();
    let mut session = h.session.borrow_mut();
    assert!(!session.is_audio_connected());
    assert!(!session.resume_audio());

    let source = FakeSource::default();
    session.connect_audio(Box::new(source.clone())).unwrap();
    assert!(session.is_audio_connected());
    assert!(session.resume_audio());
    assert_eq!(source.log.borrow().connects, 1);
    assert_eq!(source.log.borrow().resumes, 2);
}

#[test]
fn resize_refits_default_plane_in_2d() {
    let h = harness();
    h.session.borrow_mut().switch_mode(Mode::TwoD).unwrap();
    let (w0, h0) = h.gfx.log.borrow().last_extent.unwrap();
    assert!((w0 / h0 - 16.0 / 9.0).abs() < 1e-4);

    h.session.borrow_mut().on_viewport_resize(900.0, 900.0);
    let (w1, h1) = h.gfx.log.borrow().last_extent.unwrap();
    assert!((w1 - h1).abs() < 1e-4);
    assert!((h1 - h0).abs() < 1e-4);
    assert_eq!(h.gfx.log.borrow().geometries.len(), 1);
    assert_eq!(h.gfx.log.borrow().double_releases, 0);
}

#[test]
fn teardown_releases_everything_and_refuses_further_work() {
    let h = harness();
    Visualizer::start(&h.session);
    let mut session = h.session.borrow_mut();
    session.teardown();

    assert!(!session.is_initialized());
    assert_eq!(h.gfx.log.borrow().live(), 0);
    assert_eq!(h.gfx.log.borrow().double_releases, 0);
    assert!(h.controls.log.borrow().disposed);
    assert!(!h.scheduler.has_pending());

    assert!(session.frame().is_ok());
    assert!(matches!(
        session.switch_mode(Mode::TwoD),
        Err(VizError::MissingContext(_))
    ));
    assert!(matches!(
        session.switch_mode_and_reset(Mode::TwoD),
        Err(VizError::MissingContext(_))
    ));
    // teardown twice is harmless
    session.teardown();
    assert_eq!(h.gfx.log.borrow().double_releases, 0);
}

#[test]
fn second_init_is_ignored() {
    let h = harness();
    let other = common::FakeGraphics::new();
    let camera = VisualizerConfig::default().camera(10.0, 10.0);
    h.session
        .borrow_mut()
        .init(Services {
            surface: Box::new(other.clone()),
            scene: Box::new(Scene::new(camera, 10.0, 10.0)),
            controls: None,
        })
        .unwrap();
    assert_eq!(other.log.borrow().live(), 0);
    assert_eq!(h.gfx.log.borrow().programs.len(), 1);
}
