//! Browser-side decoders: images are fetched and decoded with the `image`
//! crate; models are handed to a page-provided `vizDecodeModel(url, format)`
//! hook that resolves to a plain node tree.
//!
//! Node tree shape expected from the hook:
//! `{ name, position?: [x,y,z], quaternion?: [x,y,z,w], scale?: [x,y,z],
//!    mesh?: { positions: Float32Array, normals?, uvs?, indices? },
//!    children?: [...] }`

use glam::{Quat, Vec3};
use js_sys::{Array, Float32Array, Reflect, Uint32Array, Uint8Array};
use viz_core::assets::LoadFuture;
use viz_core::state::Transform;
use viz_core::{DecodedImage, ImageDecoder, MeshData, ModelDecoder, ModelFormat, ModelNode, VizError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = vizDecodeModel, catch)]
    fn viz_decode_model(url: &str, format: &str) -> Result<js_sys::Promise, JsValue>;
}

fn js_err(e: JsValue) -> anyhow::Error {
    anyhow::anyhow!("{}", e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

async fn fetch_bytes(url: &str) -> anyhow::Result<Vec<u8>> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let resp: web::Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(js_err)?
        .dyn_into()
        .map_err(js_err)?;
    if !resp.ok() {
        anyhow::bail!("HTTP {}", resp.status());
    }
    let buf = JsFuture::from(resp.array_buffer().map_err(js_err)?)
        .await
        .map_err(js_err)?;
    Ok(Uint8Array::new(&buf).to_vec())
}

pub struct HttpImageDecoder;

impl ImageDecoder for HttpImageDecoder {
    fn load(&self, url: &str) -> LoadFuture<DecodedImage> {
        let url = url.to_string();
        Box::pin(async move {
            let bytes = fetch_bytes(&url)
                .await
                .map_err(|e| VizError::decode(&url, e))?;
            let rgba = image::load_from_memory(&bytes)
                .map_err(|e| VizError::decode(&url, e))?
                .to_rgba8();
            log::info!("[assets] decoded {} ({}x{})", url, rgba.width(), rgba.height());
            Ok(DecodedImage {
                width: rgba.width(),
                height: rgba.height(),
                rgba: rgba.into_raw(),
            })
        })
    }
}

pub struct JsModelDecoder;

impl ModelDecoder for JsModelDecoder {
    fn load(&self, url: &str, format: ModelFormat) -> LoadFuture<ModelNode> {
        let url = url.to_string();
        Box::pin(async move {
            let promise = viz_decode_model(&url, format.extension())
                .map_err(|e| VizError::decode(&url, js_err(e)))?;
            let tree = JsFuture::from(promise)
                .await
                .map_err(|e| VizError::decode(&url, js_err(e)))?;
            node_from_js(&tree).map_err(|e| VizError::decode(&url, e))
        })
    }
}

fn get(obj: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(obj, &JsValue::from_str(key))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

fn floats(obj: &JsValue, key: &str) -> Vec<f32> {
    get(obj, key)
        .map(|v| Float32Array::new(&v).to_vec())
        .unwrap_or_default()
}

fn vec3_or(obj: &JsValue, key: &str, fallback: Vec3) -> Vec3 {
    match floats(obj, key).as_slice() {
        [x, y, z, ..] => Vec3::new(*x, *y, *z),
        _ => fallback,
    }
}

fn triples(flat: &[f32]) -> Vec<[f32; 3]> {
    flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
}

fn mesh_from_js(mesh: &JsValue) -> anyhow::Result<MeshData> {
    let positions = triples(&floats(mesh, "positions"));
    if positions.is_empty() {
        anyhow::bail!("mesh without positions");
    }
    let uvs = floats(mesh, "uvs")
        .chunks_exact(2)
        .map(|c| [c[0], c[1]])
        .collect();
    let indices = get(mesh, "indices")
        .map(|v| Uint32Array::new(&v).to_vec())
        .unwrap_or_default();
    Ok(MeshData {
        positions,
        normals: triples(&floats(mesh, "normals")),
        uvs,
        indices,
    }
    .with_complete_attributes())
}

fn node_from_js(node: &JsValue) -> anyhow::Result<ModelNode> {
    if !node.is_object() {
        anyhow::bail!("decoder returned a non-object node");
    }
    let rotation = match floats(node, "quaternion").as_slice() {
        [x, y, z, w, ..] => Quat::from_xyzw(*x, *y, *z, *w).normalize(),
        _ => Quat::IDENTITY,
    };
    let transform = Transform {
        translation: vec3_or(node, "position", Vec3::ZERO),
        rotation,
        scale: vec3_or(node, "scale", Vec3::ONE),
    };
    let mesh = get(node, "mesh").map(|m| mesh_from_js(&m)).transpose()?;
    let children = match get(node, "children") {
        Some(list) => Array::from(&list)
            .iter()
            .map(|child| node_from_js(&child))
            .collect::<anyhow::Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok(ModelNode {
        name: get(node, "name").and_then(|v| v.as_string()).unwrap_or_default(),
        transform,
        mesh,
        children,
    })
}
