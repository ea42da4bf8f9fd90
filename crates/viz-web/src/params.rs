use js_sys::{Array, Object, Reflect};
use viz_core::{ShaderSummary, UniformValue};
use wasm_bindgen::JsValue;

fn set(obj: &Object, key: &str, value: &JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), value);
}

fn floats(values: &[f32]) -> JsValue {
    values
        .iter()
        .map(|v| JsValue::from_f64(*v as f64))
        .collect::<Array>()
        .into()
}

pub fn uniform_to_js(value: UniformValue) -> JsValue {
    match value {
        UniformValue::Float(v) => JsValue::from_f64(v as f64),
        UniformValue::Vec2(v) => floats(&v),
        UniformValue::Vec3(v) => floats(&v),
        UniformValue::Bool(b) => JsValue::from_bool(b),
        UniformValue::Texture(t) => JsValue::from_bool(t.is_some()),
    }
}

/// Numbers, booleans and 2- or 3-element arrays. Textures cannot be set
/// from script.
pub fn uniform_from_js(value: &JsValue) -> Option<UniformValue> {
    if let Some(b) = value.as_bool() {
        return Some(UniformValue::Bool(b));
    }
    if let Some(v) = value.as_f64() {
        return Some(UniformValue::Float(v as f32));
    }
    if !Array::is_array(value) {
        return None;
    }
    let items: Vec<f32> = Array::from(value)
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect::<Option<_>>()?;
    match items.as_slice() {
        [x, y] => Some(UniformValue::Vec2([*x, *y])),
        [x, y, z] => Some(UniformValue::Vec3([*x, *y, *z])),
        _ => None,
    }
}

/// `{ name: value, ... }` in schema order.
pub fn params_to_js(params: &[(&'static str, UniformValue)]) -> JsValue {
    let obj = Object::new();
    for (name, value) in params {
        set(&obj, name, &uniform_to_js(*value));
    }
    obj.into()
}

/// `[{ id, displayName }, ...]`
pub fn summaries_to_js(list: &[ShaderSummary]) -> JsValue {
    list.iter()
        .map(|s| {
            let obj = Object::new();
            set(&obj, "id", &JsValue::from_str(s.id));
            set(&obj, "displayName", &JsValue::from_str(s.display_name));
            JsValue::from(obj)
        })
        .collect::<Array>()
        .into()
}
