// Host-side tests for the shader catalog and its fallback policy.

use viz_core::shaders::*;
use viz_core::uniforms::UniformSet;

#[test]
fn unknown_ids_fall_back_to_catalog_defaults() {
    assert_eq!(lookup_2d("doesNotExist"), lookup_2d("laser"));
    assert_eq!(lookup_3d("doesNotExist"), lookup_3d("spiky"));
    assert_eq!(Shader2D::from_id(""), Shader2D::Laser);
    assert_eq!(Shader3D::from_id("LASER"), Shader3D::Spiky);
}

#[test]
fn every_variant_resolves_to_itself() {
    for s in Shader2D::ALL {
        assert_eq!(Shader2D::from_id(s.id()), s);
    }
    for s in Shader3D::ALL {
        assert_eq!(Shader3D::from_id(s.id()), s);
    }
}

#[test]
fn listings_are_stable_and_ordered() {
    let ids: Vec<_> = list_available_2d().iter().map(|s| s.id).collect();
    assert_eq!(ids, ["laser", "rings", "waves", "fractal"]);
    let names: Vec<_> = list_available_3d().iter().map(|s| s.display_name).collect();
    assert_eq!(
        names,
        ["Spiky", "Wave", "DNA Helix", "Liquid Metal", "Blooming Flower"]
    );
    assert_eq!(list_available_2d(), list_available_2d());
}

#[test]
fn schema_defaults_follow_declarations() {
    let schema = parameter_schema_2d("laser");
    let speed = schema.iter().find(|p| p.name == "u_speed").unwrap();
    assert_eq!(speed.default, ParamDefault::Float(3.0));
    let color = schema.iter().find(|p| p.name == "u_color").unwrap();
    assert_eq!(color.default, ParamDefault::Vec3([1.7, 0.2, 3.0]));
    assert!(lookup_3d("spiky").declares("u_spikeAmount"));
    assert!(!lookup_3d("wave").declares("u_spikeAmount"));
}

#[test]
fn uniform_sets_never_share_storage() {
    let shader = lookup_3d("flower");
    let mut a = UniformSet::from_schema(shader);
    let b = UniformSet::from_schema(shader);
    a.set("u_petalCount", viz_core::UniformValue::Float(3.0));
    assert_ne!(a.get("u_petalCount"), b.get("u_petalCount"));
    assert_eq!(b.get("u_petalCount"), Some(viz_core::UniformValue::Float(8.0)));
}

#[test]
fn every_definition_has_both_stages() {
    for def in all_definitions() {
        assert!(def.vertex.source.contains("fn vs_main"), "{}", def.id);
        assert!(def.fragment.source.contains("fn fs_main"), "{}", def.id);
    }
    assert!(COMMON_WGSL.contains("array<vec4<f32>, 24>"));
}
