// Host-side tests for the 2D/3D mode state machine.

mod common;

use common::{FakeControls, FakeGraphics};
use std::rc::Rc;
use viz_core::assets::{normalize_model, prepare_image};
use viz_core::shaders::lookup_3d;
use viz_core::*;

fn scene() -> Scene {
    Scene::new(Camera::default(), 1600.0, 900.0)
}

#[test]
fn back_to_back_switches_leave_exactly_one_entity_live() {
    let mut gfx = FakeGraphics::new();
    let mut scene = scene();
    let mut controls = FakeControls::default();
    let mut modes = ModeCoordinator::default();

    modes
        .switch_to(Mode::ThreeD, &mut gfx, Some(&mut scene), Some(&mut controls))
        .unwrap();
    let first = modes.active().unwrap().id();
    gfx.log.borrow_mut().events.clear();
    modes
        .switch_to(Mode::TwoD, &mut gfx, Some(&mut scene), Some(&mut controls))
        .unwrap();

    let log = gfx.log.borrow();
    assert_eq!(log.programs.len(), 1);
    assert_eq!(log.geometries.len(), 1);
    assert_eq!(scene.attached().len(), 1);
    assert!(!scene.is_attached(first));
    assert!(scene.is_attached(modes.active().unwrap().id()));

    // every release of the old entity precedes the first allocation
    let first_create = log.events.iter().position(|e| e.starts_with("create")).unwrap();
    let last_release = log.events.iter().rposition(|e| e.starts_with("release")).unwrap();
    assert!(last_release < first_create);
}

#[test]
fn switching_to_current_mode_rebuilds() {
    let mut gfx = FakeGraphics::new();
    let mut scene = scene();
    let mut modes = ModeCoordinator::default();
    modes.switch_to(Mode::ThreeD, &mut gfx, Some(&mut scene), None).unwrap();
    let before = modes.active().unwrap().id();
    modes.switch_to(Mode::ThreeD, &mut gfx, Some(&mut scene), None).unwrap();
    assert_ne!(modes.active().unwrap().id(), before);
    assert_eq!(gfx.log.borrow().programs.len(), 1);
}

#[test]
fn controls_follow_mode() {
    let mut gfx = FakeGraphics::new();
    let mut scene = scene();
    let mut controls = FakeControls::default();
    let mut modes = ModeCoordinator::default();

    modes
        .switch_to(Mode::TwoD, &mut gfx, Some(&mut scene), Some(&mut controls))
        .unwrap();
    assert!(!controls.log.borrow().enabled);
    modes
        .switch_to(Mode::ThreeD, &mut gfx, Some(&mut scene), Some(&mut controls))
        .unwrap();
    assert!(controls.log.borrow().enabled);
    modes
        .reset_to_default(Mode::TwoD, &mut gfx, Some(&mut scene), Some(&mut controls))
        .unwrap();
    assert!(!controls.log.borrow().enabled);
}

#[test]
fn missing_scene_is_refused_without_teardown() {
    let mut gfx = FakeGraphics::new();
    let mut scene = scene();
    let mut modes = ModeCoordinator::default();
    modes.switch_to(Mode::ThreeD, &mut gfx, Some(&mut scene), None).unwrap();
    let live = gfx.log.borrow().live();

    let err = modes.switch_to(Mode::TwoD, &mut gfx, None, None).unwrap_err();
    assert!(matches!(err, VizError::MissingContext(_)));
    let err = modes.reset_to_default(Mode::TwoD, &mut gfx, None, None).unwrap_err();
    assert!(matches!(err, VizError::MissingContext(_)));

    assert_eq!(modes.mode(), Mode::ThreeD);
    assert_eq!(gfx.log.borrow().live(), live);
    assert!(modes.active().is_some());
}

#[test]
fn assets_and_shaders_survive_plain_switches() {
    let mut gfx = FakeGraphics::new();
    let mut scene = scene();
    let mut modes = ModeCoordinator::default();
    modes.set_image(Some(Rc::new(prepare_image(common::checker_image(64, 64)))));
    modes.set_model(Some(Rc::new(normalize_model(
        common::two_part_model(),
        lookup_3d("spiky"),
    ))));
    modes.switch_to(Mode::ThreeD, &mut gfx, Some(&mut scene), None).unwrap();
    modes.change_shader_3d("dna", &mut gfx);

    modes.switch_to(Mode::TwoD, &mut gfx, Some(&mut scene), None).unwrap();
    assert!(modes.active().unwrap().texture().is_some());
    modes.switch_to(Mode::ThreeD, &mut gfx, Some(&mut scene), None).unwrap();

    let entity = modes.active().unwrap();
    assert_eq!(entity.surfaces().len(), 2);
    assert_eq!(entity.shader().id, "dna");
}

#[test]
fn reset_clears_asset_and_shader_for_target_mode_only() {
    let mut gfx = FakeGraphics::new();
    let mut scene = scene();
    let mut modes = ModeCoordinator::default();
    modes.set_image(Some(Rc::new(prepare_image(common::checker_image(64, 64)))));
    modes.set_model(Some(Rc::new(normalize_model(
        common::two_part_model(),
        lookup_3d("spiky"),
    ))));
    modes.change_shader_2d("rings", &mut gfx);
    modes.change_shader_3d("liquid", &mut gfx);

    modes
        .reset_to_default(Mode::ThreeD, &mut gfx, Some(&mut scene), None)
        .unwrap();

    assert!(modes.model().is_none());
    assert_eq!(modes.shader_3d(), Shader3D::Spiky);
    assert_eq!(modes.active().unwrap().surfaces().len(), 1);
    assert!(modes.image().is_some());
    assert_eq!(modes.shader_2d(), Shader2D::Rings);
}

#[test]
fn shader_change_in_other_mode_only_records_choice() {
    let mut gfx = FakeGraphics::new();
    let mut scene = scene();
    let mut modes = ModeCoordinator::default();
    modes.switch_to(Mode::ThreeD, &mut gfx, Some(&mut scene), None).unwrap();
    let program = modes.active().unwrap().surfaces()[0].program;

    let chosen = modes.change_shader_2d("nope", &mut gfx);
    assert_eq!(chosen.id, "laser");
    assert_eq!(modes.active().unwrap().surfaces()[0].program, program);

    modes.switch_to(Mode::TwoD, &mut gfx, Some(&mut scene), None).unwrap();
    assert_eq!(modes.active().unwrap().shader().id, "laser");
}
