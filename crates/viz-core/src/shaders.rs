//! Static registry of the 2D and 3D shader variants.
//!
//! Variants are closed enums; every variant carries its own parameter schema.
//! Lookups by string id never fail: an unknown id resolves to the catalog
//! default (`laser` for 2D, `spiky` for 3D).

use crate::constants::{DEFAULT_SHADER_2D, DEFAULT_SHADER_3D, MAX_PARAM_SLOTS};

/// Bumped whenever a variant or schema changes.
pub const CATALOG_VERSION: u32 = 1;

// Shaders bundled as string constants
pub const COMMON_WGSL: &str = include_str!("../shaders/common.wgsl");
pub const PLANE_VERT_WGSL: &str = include_str!("../shaders/2d/plane.wgsl");
pub const LASER_WGSL: &str = include_str!("../shaders/2d/laser.wgsl");
pub const RINGS_WGSL: &str = include_str!("../shaders/2d/rings.wgsl");
pub const WAVES_WGSL: &str = include_str!("../shaders/2d/waves.wgsl");
pub const FRACTAL_WGSL: &str = include_str!("../shaders/2d/fractal.wgsl");
pub const SPIKY_WGSL: &str = include_str!("../shaders/3d/spiky.wgsl");
pub const WAVE_WGSL: &str = include_str!("../shaders/3d/wave.wgsl");
pub const DNA_WGSL: &str = include_str!("../shaders/3d/dna.wgsl");
pub const LIQUID_WGSL: &str = include_str!("../shaders/3d/liquid.wgsl");
pub const FLOWER_WGSL: &str = include_str!("../shaders/3d/flower.wgsl");

/// Default value of one schema parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamDefault {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Bool(bool),
    /// Texture slot, empty until an image is bound.
    Texture,
}

#[derive(Clone, Copy, Debug)]
pub struct ParamDecl {
    pub name: &'static str,
    pub default: ParamDefault,
}

const fn float(name: &'static str, v: f32) -> ParamDecl {
    ParamDecl {
        name,
        default: ParamDefault::Float(v),
    }
}
const fn vec2(name: &'static str, v: [f32; 2]) -> ParamDecl {
    ParamDecl {
        name,
        default: ParamDefault::Vec2(v),
    }
}
const fn vec3(name: &'static str, v: [f32; 3]) -> ParamDecl {
    ParamDecl {
        name,
        default: ParamDefault::Vec3(v),
    }
}
const fn flag(name: &'static str, v: bool) -> ParamDecl {
    ParamDecl {
        name,
        default: ParamDefault::Bool(v),
    }
}
const fn texture(name: &'static str) -> ParamDecl {
    ParamDecl {
        name,
        default: ParamDefault::Texture,
    }
}

/// One stage of a shader program: WGSL body plus entry point. The backend
/// prepends [`COMMON_WGSL`] before compiling.
#[derive(Clone, Copy, Debug)]
pub struct ShaderStage {
    pub source: &'static str,
    pub entry_point: &'static str,
}

#[derive(Debug)]
pub struct ShaderDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub vertex: ShaderStage,
    pub fragment: ShaderStage,
    /// Declared parameters in uniform-slot order.
    pub schema: &'static [ParamDecl],
}

impl ShaderDefinition {
    pub fn declares(&self, name: &str) -> bool {
        self.schema.iter().any(|p| p.name == name)
    }
}

impl PartialEq for ShaderDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// `{id, displayName}` pair for presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderSummary {
    pub id: &'static str,
    pub display_name: &'static str,
}

const PLANE_VERTEX: ShaderStage = ShaderStage {
    source: PLANE_VERT_WGSL,
    entry_point: "vs_main",
};

const fn fragment(source: &'static str) -> ShaderStage {
    ShaderStage {
        source,
        entry_point: "fs_main",
    }
}

const fn vertex(source: &'static str) -> ShaderStage {
    ShaderStage {
        source,
        entry_point: "vs_main",
    }
}

// ---------------- 2D catalog ----------------

static LASER: ShaderDefinition = ShaderDefinition {
    id: "laser",
    display_name: "Laser",
    vertex: PLANE_VERTEX,
    fragment: fragment(LASER_WGSL),
    schema: &[
        float("uTime", 0.0),
        float("uAudioData", 0.0),
        float("u_speed", 3.0),
        float("u_intensity", 1.0),
        vec3("u_color", [1.7, 0.2, 3.0]),
        texture("uTexture"),
        flag("uHasTexture", false),
    ],
};

static RINGS: ShaderDefinition = ShaderDefinition {
    id: "rings",
    display_name: "Rings",
    vertex: PLANE_VERTEX,
    fragment: fragment(RINGS_WGSL),
    schema: &[
        float("uTime", 0.0),
        float("uAudioData", 0.0),
        float("u_speed", 1.0),
        float("u_scale", 1.0),
        vec3("u_color1", [0.9, 0.0, 0.0]),
        vec3("u_color2", [0.0, 0.9, 0.0]),
        vec3("u_color3", [0.0, 0.0, 0.9]),
        texture("uTexture"),
        flag("uHasTexture", false),
    ],
};

static WAVES: ShaderDefinition = ShaderDefinition {
    id: "waves",
    display_name: "Waves",
    vertex: PLANE_VERTEX,
    fragment: fragment(WAVES_WGSL),
    schema: &[
        float("uTime", 0.0),
        float("uAudioData", 0.0),
        float("u_speed", 1.0),
        float("u_intensity", 1.0),
        float("u_scale", 1.0),
        texture("uTexture"),
        flag("uHasTexture", false),
    ],
};

static FRACTAL: ShaderDefinition = ShaderDefinition {
    id: "fractal",
    display_name: "Fractal",
    vertex: PLANE_VERTEX,
    fragment: fragment(FRACTAL_WGSL),
    schema: &[
        float("uTime", 0.0),
        float("uAudioData", 0.0),
        float("u_bass", 0.0),
        float("u_mid", 0.0),
        float("u_treble", 0.0),
        float("u_peak", 0.0),
        vec2("u_resolution", [1.0, 1.0]),
        float("u_power", 8.0),
        float("u_iterations", 7.0),
        float("u_bailout", 2.0),
        float("u_rotationSpeed", 0.2),
        float("u_cameraDistance", 3.0),
        vec3("u_color1", [0.9, 0.8, 0.6]),
        vec3("u_color2", [0.6, 0.3, 0.8]),
        texture("uTexture"),
        flag("uHasTexture", false),
    ],
};

// ---------------- 3D catalog ----------------

static SPIKY: ShaderDefinition = ShaderDefinition {
    id: "spiky",
    display_name: "Spiky",
    vertex: vertex(SPIKY_WGSL),
    fragment: fragment(SPIKY_WGSL),
    schema: &[
        float("u_time", 0.0),
        float("u_audioLevel", 0.0),
        float("u_bass", 0.0),
        float("u_mid", 0.0),
        float("u_treble", 0.0),
        float("u_peak", 0.0),
        float("u_baseAmount", 0.5),
        float("u_spikeAmount", 5.0),
        float("u_noiseScale", 10.0),
        float("u_noiseSpeed", 0.01),
        vec3("u_color1", [0.2, 0.5, 1.0]),
        vec3("u_color2", [1.0, 0.3, 0.5]),
    ],
};

static WAVE: ShaderDefinition = ShaderDefinition {
    id: "wave",
    display_name: "Wave",
    vertex: vertex(WAVE_WGSL),
    fragment: fragment(WAVE_WGSL),
    schema: &[
        float("u_time", 0.0),
        float("u_audioLevel", 0.0),
        float("u_bass", 0.0),
        float("u_mid", 0.0),
        float("u_treble", 0.0),
        float("u_waveSpeed", 2.0),
        float("u_waveAmplitude", 0.1),
        float("u_audioInfluence", 1.0),
        float("u_waveScale", 6.0),
        vec3("u_color1", [0.1, 0.3, 0.8]),
        vec3("u_color2", [0.3, 0.8, 1.0]),
    ],
};

static DNA: ShaderDefinition = ShaderDefinition {
    id: "dna",
    display_name: "DNA Helix",
    vertex: vertex(DNA_WGSL),
    fragment: fragment(DNA_WGSL),
    schema: &[
        float("u_time", 0.0),
        float("u_audioLevel", 0.0),
        float("u_bass", 0.0),
        float("u_mid", 0.0),
        float("u_treble", 0.0),
        float("u_peak", 0.0),
        float("u_helixRadius", 0.5),
        float("u_helixHeight", 2.0),
        float("u_twistSpeed", 3.0),
        float("u_spacing", 1.0),
        vec3("u_color1", [0.2, 0.5, 1.0]),
        vec3("u_color2", [1.0, 0.2, 0.5]),
    ],
};

static LIQUID: ShaderDefinition = ShaderDefinition {
    id: "liquid",
    display_name: "Liquid Metal",
    vertex: vertex(LIQUID_WGSL),
    fragment: fragment(LIQUID_WGSL),
    schema: &[
        float("u_time", 0.0),
        float("u_audioLevel", 0.0),
        float("u_bass", 0.0),
        float("u_mid", 0.0),
        float("u_treble", 0.0),
        float("u_peak", 0.0),
        float("u_waveScale", 3.0),
        float("u_waveSpeed", 2.0),
        float("u_viscosity", 1.0),
        float("u_dropIntensity", 0.5),
        vec3("u_color1", [0.7, 0.8, 0.9]),
        vec3("u_color2", [0.3, 0.4, 0.6]),
    ],
};

static FLOWER: ShaderDefinition = ShaderDefinition {
    id: "flower",
    display_name: "Blooming Flower",
    vertex: vertex(FLOWER_WGSL),
    fragment: fragment(FLOWER_WGSL),
    schema: &[
        float("u_time", 0.0),
        float("u_audioLevel", 0.0),
        float("u_bass", 0.0),
        float("u_mid", 0.0),
        float("u_treble", 0.0),
        float("u_peak", 0.0),
        float("u_petalCount", 8.0),
        float("u_bloomAmount", 0.8),
        float("u_petalCurve", 1.5),
        float("u_centerSize", 0.3),
        vec3("u_color1", [1.0, 0.3, 0.5]),
        vec3("u_color2", [1.0, 0.9, 0.2]),
        vec3("u_color3", [1.0, 0.6, 0.8]),
    ],
};

/// Flat-surface shader variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Shader2D {
    #[default]
    Laser,
    Rings,
    Waves,
    Fractal,
}

/// Object shader variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Shader3D {
    #[default]
    Spiky,
    Wave,
    Dna,
    Liquid,
    Flower,
}

impl Shader2D {
    pub const ALL: [Shader2D; 4] = [Self::Laser, Self::Rings, Self::Waves, Self::Fractal];

    /// Resolve an id, substituting the default for anything unknown.
    pub fn from_id(id: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.definition().id == id)
            .unwrap_or_default()
    }

    pub fn definition(self) -> &'static ShaderDefinition {
        match self {
            Self::Laser => &LASER,
            Self::Rings => &RINGS,
            Self::Waves => &WAVES,
            Self::Fractal => &FRACTAL,
        }
    }

    pub fn id(self) -> &'static str {
        self.definition().id
    }
}

impl Shader3D {
    pub const ALL: [Shader3D; 5] = [
        Self::Spiky,
        Self::Wave,
        Self::Dna,
        Self::Liquid,
        Self::Flower,
    ];

    /// Resolve an id, substituting the default for anything unknown.
    pub fn from_id(id: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.definition().id == id)
            .unwrap_or_default()
    }

    pub fn definition(self) -> &'static ShaderDefinition {
        match self {
            Self::Spiky => &SPIKY,
            Self::Wave => &WAVE,
            Self::Dna => &DNA,
            Self::Liquid => &LIQUID,
            Self::Flower => &FLOWER,
        }
    }

    pub fn id(self) -> &'static str {
        self.definition().id
    }
}

pub fn lookup_2d(id: &str) -> &'static ShaderDefinition {
    let shader = Shader2D::from_id(id);
    if shader.id() != id {
        log::debug!("[shaders] unknown 2D shader {:?}, using {}", id, DEFAULT_SHADER_2D);
    }
    shader.definition()
}

pub fn lookup_3d(id: &str) -> &'static ShaderDefinition {
    let shader = Shader3D::from_id(id);
    if shader.id() != id {
        log::debug!("[shaders] unknown 3D shader {:?}, using {}", id, DEFAULT_SHADER_3D);
    }
    shader.definition()
}

fn summarize(def: &'static ShaderDefinition) -> ShaderSummary {
    ShaderSummary {
        id: def.id,
        display_name: def.display_name,
    }
}

pub fn list_available_2d() -> Vec<ShaderSummary> {
    Shader2D::ALL
        .iter()
        .map(|s| summarize(s.definition()))
        .collect()
}

pub fn list_available_3d() -> Vec<ShaderSummary> {
    Shader3D::ALL
        .iter()
        .map(|s| summarize(s.definition()))
        .collect()
}

pub fn parameter_schema_2d(id: &str) -> &'static [ParamDecl] {
    lookup_2d(id).schema
}

pub fn parameter_schema_3d(id: &str) -> &'static [ParamDecl] {
    lookup_3d(id).schema
}

/// Every variant of both catalogs; used by the backend to pre-validate
/// slot counts and by tests.
pub fn all_definitions() -> impl Iterator<Item = &'static ShaderDefinition> {
    Shader2D::ALL
        .into_iter()
        .map(Shader2D::definition)
        .chain(Shader3D::ALL.into_iter().map(Shader3D::definition))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_schema_fits_the_uniform_block() {
        for def in all_definitions() {
            assert!(def.schema.len() <= MAX_PARAM_SLOTS, "{} too large", def.id);
        }
    }

    #[test]
    fn default_ids_match_enum_defaults() {
        assert_eq!(Shader2D::default().id(), DEFAULT_SHADER_2D);
        assert_eq!(Shader3D::default().id(), DEFAULT_SHADER_3D);
    }
}
