//! Per-entity uniform storage driven by a shader's declared schema.
//!
//! The feature table maps every auto-populated parameter name onto a
//! [`FeatureChannel`]. A [`UniformSet`] resolves its bindings once, at
//! construction, so the per-frame update only touches channels the schema
//! actually declares.

use crate::audio::FeatureVector;
use crate::constants::MAX_PARAM_SLOTS;
use crate::graphics::TextureHandle;
use crate::shaders::{ParamDefault, ShaderDefinition};
use glam::Mat4;

/// Current value of one parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Bool(bool),
    Texture(Option<TextureHandle>),
}

impl UniformValue {
    fn from_default(default: ParamDefault) -> Self {
        match default {
            ParamDefault::Float(v) => Self::Float(v),
            ParamDefault::Vec2(v) => Self::Vec2(v),
            ParamDefault::Vec3(v) => Self::Vec3(v),
            ParamDefault::Bool(v) => Self::Bool(v),
            ParamDefault::Texture => Self::Texture(None),
        }
    }

    pub fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Shader-side representation in one `vec4` slot.
    pub fn packed(&self) -> [f32; 4] {
        match *self {
            Self::Float(v) => [v, 0.0, 0.0, 0.0],
            Self::Vec2([x, y]) => [x, y, 0.0, 0.0],
            Self::Vec3([x, y, z]) => [x, y, z, 0.0],
            Self::Bool(b) => [b as u8 as f32, 0.0, 0.0, 0.0],
            Self::Texture(t) => [t.is_some() as u8 as f32, 0.0, 0.0, 0.0],
        }
    }
}

/// Source of an auto-populated parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureChannel {
    Time,
    AudioLevel,
    Bass,
    Mid,
    Treble,
    Peak,
    Energy,
    Resolution,
    Texture,
    HasTexture,
}

/// Every parameter name the core fills automatically. Anything else keeps
/// its schema default until edited.
pub const FEATURE_TABLE: &[(&str, FeatureChannel)] = &[
    ("uTime", FeatureChannel::Time),
    ("u_time", FeatureChannel::Time),
    ("uAudioData", FeatureChannel::AudioLevel),
    ("u_audioLevel", FeatureChannel::AudioLevel),
    ("u_bass", FeatureChannel::Bass),
    ("u_mid", FeatureChannel::Mid),
    ("u_treble", FeatureChannel::Treble),
    ("u_peak", FeatureChannel::Peak),
    ("u_energy", FeatureChannel::Energy),
    ("u_resolution", FeatureChannel::Resolution),
    ("uTexture", FeatureChannel::Texture),
    ("u_texture", FeatureChannel::Texture),
    ("uHasTexture", FeatureChannel::HasTexture),
];

pub fn channel_of(name: &str) -> Option<FeatureChannel> {
    FEATURE_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
}

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    name: &'static str,
    value: UniformValue,
}

/// Values for exactly the parameters one shader declares, in slot order.
#[derive(Clone, Debug)]
pub struct UniformSet {
    shader: &'static ShaderDefinition,
    entries: Vec<Entry>,
    bindings: Vec<(usize, FeatureChannel)>,
}

impl UniformSet {
    /// Fresh copy of the shader's defaults.
    pub fn from_schema(shader: &'static ShaderDefinition) -> Self {
        let entries: Vec<Entry> = shader
            .schema
            .iter()
            .map(|decl| Entry {
                name: decl.name,
                value: UniformValue::from_default(decl.default),
            })
            .collect();
        let bindings = entries
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| channel_of(e.name).map(|c| (slot, c)))
            .collect();
        Self {
            shader,
            entries,
            bindings,
        }
    }

    pub fn shader(&self) -> &'static ShaderDefinition {
        self.shader
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, UniformValue)> + '_ {
        self.entries.iter().map(|e| (e.name, e.value))
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.value)
    }

    /// Overwrite a declared parameter. Unknown names and kind mismatches are
    /// ignored; returns whether the value was stored.
    pub fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) if entry.value.same_kind(&value) => {
                entry.value = value;
                true
            }
            Some(entry) => {
                log::debug!(
                    "[uniforms] {} expects {:?}, got {:?}",
                    name,
                    entry.value,
                    value
                );
                false
            }
            None => false,
        }
    }

    pub fn declares_channel(&self, channel: FeatureChannel) -> bool {
        self.bindings.iter().any(|(_, c)| *c == channel)
    }

    /// First value bound to `channel`, whichever name variant carries it.
    pub fn channel_value(&self, channel: FeatureChannel) -> Option<UniformValue> {
        self.bindings
            .iter()
            .find(|(_, c)| *c == channel)
            .map(|(slot, _)| self.entries[*slot].value)
    }

    /// Write `value` into every slot bound to `channel` that has a matching
    /// kind.
    pub fn set_channel(&mut self, channel: FeatureChannel, value: UniformValue) {
        for (slot, c) in &self.bindings {
            if *c == channel && self.entries[*slot].value.same_kind(&value) {
                self.entries[*slot].value = value;
            }
        }
    }

    /// Per-frame population from audio features, elapsed seconds and the
    /// viewport size in pixels.
    pub fn apply_features(&mut self, features: &FeatureVector, time: f32, viewport: [f32; 2]) {
        for &(slot, channel) in &self.bindings {
            let value = match channel {
                FeatureChannel::Time => UniformValue::Float(time),
                FeatureChannel::AudioLevel => UniformValue::Float(features.overall),
                FeatureChannel::Bass => UniformValue::Float(features.bass),
                FeatureChannel::Mid => UniformValue::Float(features.mid),
                FeatureChannel::Treble => UniformValue::Float(features.treble),
                FeatureChannel::Peak => UniformValue::Float(features.peak),
                FeatureChannel::Energy => UniformValue::Float(features.energy),
                FeatureChannel::Resolution => UniformValue::Vec2(viewport),
                FeatureChannel::Texture | FeatureChannel::HasTexture => continue,
            };
            let entry = &mut self.entries[slot];
            if entry.value.same_kind(&value) {
                entry.value = value;
            }
        }
    }

    /// Bind (or clear) the image on every texture slot and its flag.
    pub fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        self.set_channel(FeatureChannel::Texture, UniformValue::Texture(texture));
        self.set_channel(FeatureChannel::HasTexture, UniformValue::Bool(texture.is_some()));
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.entries.iter().find_map(|e| match e.value {
            UniformValue::Texture(t) => t,
            _ => None,
        })
    }

    /// Uniform block payload, one `vec4` per declared parameter.
    pub fn packed(&self) -> [[f32; 4]; MAX_PARAM_SLOTS] {
        let mut out = [[0.0; 4]; MAX_PARAM_SLOTS];
        for (dst, e) in out.iter_mut().zip(&self.entries) {
            *dst = e.value.packed();
        }
        out
    }
}

/// GPU layout of the shared `Uniforms` struct in `common.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub params: [[f32; 4]; MAX_PARAM_SLOTS],
}

impl UniformBlock {
    pub fn new(view_proj: Mat4, model: Mat4, uniforms: &UniformSet) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            params: uniforms.packed(),
        }
    }
}

impl PartialEq for UniformSet {
    fn eq(&self, other: &Self) -> bool {
        self.shader == other.shader && self.entries == other.entries
    }
}
