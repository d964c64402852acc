// Procedural mandible: morph-parameterized primitive descriptors + material dispatch.
//
// Every dimension follows `base × (1 + morph × coefficient)` so the whole model
// grows monotonically from the female-typical (0) to the male-typical (1) form.
// Parts are expressed in model space at the scale of the unit primitives in
// `mesh.rs`; the renderer instances one unit mesh per part.

use std::f32::consts::FRAC_PI_6;

use glam::{Mat4, Quat, Vec3};

use super::catalog::{rgb, FeatureId};
use super::loader::LoadedMesh;
use super::mesh::PrimitiveShape;
use crate::prediction::Gender;

// Dimorphism coefficients.
const BODY_WIDTH_COEFF: f32 = 0.26;
const RAMUS_HEIGHT_COEFF: f32 = 0.14;
const CONDYLE_RADIUS_COEFF: f32 = 0.5;
const CORONOID_HEIGHT_COEFF: f32 = 0.14;
const GONIAL_RADIUS_COEFF: f32 = 0.4;
const CHIN_RADIUS_COEFF: f32 = 0.6;

// Loaded assets have no part structure, so they get a coarser two-axis scale.
const LOADED_WIDTH_COEFF: f32 = 0.28;
const LOADED_HEIGHT_COEFF: f32 = 0.15;

const BODY_SIZE: Vec3 = Vec3::new(1.6, 0.32, 0.48);
const RAMUS_SIZE: Vec3 = Vec3::new(0.32, 1.0, 0.4);
const CONDYLE_RADIUS: f32 = 0.12;
const CORONOID_RADIUS: f32 = 0.08;
const CORONOID_HEIGHT: f32 = 0.3;
const GONIAL_RADIUS: f32 = 0.06;
const CHIN_RADIUS: f32 = 0.12;
const FORAMEN_SIZE: Vec3 = Vec3::new(0.08, 0.12, 0.08);

const HIGHLIGHT_EMISSIVE: f32 = 0.2;
const HOVER_LIGHTEN: f32 = 0.25;
const DEFAULT_OPACITY: f32 = 0.9;
const PLACEHOLDER_OPACITY: f32 = 0.5;

// ============================================================================
// PART KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Body,
    RamusLeft,
    RamusRight,
    CondyleLeft,
    CondyleRight,
    CoronoidLeft,
    CoronoidRight,
    GonialLeft,
    GonialRight,
    Chin,
    ForamenLeft,
    ForamenRight,
    /// A loaded sub-mesh that does not correspond to one procedural part.
    Whole,
}

impl PartKind {
    /// Procedural parts in build order.
    pub const PROCEDURAL: [PartKind; 12] = [
        PartKind::Body,
        PartKind::RamusLeft,
        PartKind::RamusRight,
        PartKind::CondyleLeft,
        PartKind::CondyleRight,
        PartKind::CoronoidLeft,
        PartKind::CoronoidRight,
        PartKind::GonialLeft,
        PartKind::GonialRight,
        PartKind::Chin,
        PartKind::ForamenLeft,
        PartKind::ForamenRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PartKind::Body => "body",
            PartKind::RamusLeft => "ramus_left",
            PartKind::RamusRight => "ramus_right",
            PartKind::CondyleLeft => "condyle_left",
            PartKind::CondyleRight => "condyle_right",
            PartKind::CoronoidLeft => "coronoid_left",
            PartKind::CoronoidRight => "coronoid_right",
            PartKind::GonialLeft => "gonial_left",
            PartKind::GonialRight => "gonial_right",
            PartKind::Chin => "chin",
            PartKind::ForamenLeft => "foramen_left",
            PartKind::ForamenRight => "foramen_right",
            PartKind::Whole => "whole",
        }
    }

    /// Match an OBJ object/group name such as `Ramus.L`, `left_condyle` or `chin`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        let left = name.contains("left") || name.ends_with(".l") || name.ends_with("_l");
        let right = name.contains("right") || name.ends_with(".r") || name.ends_with("_r");
        let sided = |l: PartKind, r: PartKind| match (left, right) {
            (true, false) => Some(l),
            (false, true) => Some(r),
            _ => None,
        };
        if name.contains("ramus") {
            sided(PartKind::RamusLeft, PartKind::RamusRight)
        } else if name.contains("condyle") {
            sided(PartKind::CondyleLeft, PartKind::CondyleRight)
        } else if name.contains("coronoid") {
            sided(PartKind::CoronoidLeft, PartKind::CoronoidRight)
        } else if name.contains("gonial") || name.contains("gonion") {
            sided(PartKind::GonialLeft, PartKind::GonialRight)
        } else if name.contains("foramen") {
            sided(PartKind::ForamenLeft, PartKind::ForamenRight)
        } else if name.contains("chin") || name.contains("mental") {
            Some(PartKind::Chin)
        } else if name.contains("body") {
            Some(PartKind::Body)
        } else {
            None
        }
    }

    fn feature_numbers(self) -> &'static [u8] {
        match self {
            PartKind::Body => &[1, 3],
            PartKind::RamusLeft | PartKind::RamusRight => &[5, 6, 7],
            PartKind::CondyleLeft | PartKind::CondyleRight => &[2, 12],
            PartKind::CoronoidLeft | PartKind::CoronoidRight => &[8, 10, 11, 13],
            PartKind::GonialLeft | PartKind::GonialRight => &[4, 9],
            PartKind::Chin => &[1],
            PartKind::ForamenLeft | PartKind::ForamenRight => &[14, 15],
            PartKind::Whole => &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
        }
    }

    /// Features this part is highlighted for.
    pub fn features(self) -> impl Iterator<Item = FeatureId> {
        self.feature_numbers().iter().filter_map(|&n| FeatureId::new(n))
    }

    pub fn owns(self, id: FeatureId) -> bool {
        self.feature_numbers().contains(&id.number())
    }

    /// Per-part multiplier on the bone gradient so joints and foramina read apart.
    fn shade(self) -> f32 {
        match self {
            PartKind::CondyleLeft | PartKind::CondyleRight => 0.95,
            PartKind::CoronoidLeft | PartKind::CoronoidRight => 0.95,
            PartKind::GonialLeft | PartKind::GonialRight => 0.92,
            PartKind::ForamenLeft | PartKind::ForamenRight => 0.5,
            _ => 1.0,
        }
    }
}

// ============================================================================
// MATERIALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStyle {
    pub color: [f32; 3],
    pub emissive: f32,
    pub opacity: f32,
}

impl ColorStyle {
    pub fn rgba(&self) -> [f32; 4] {
        let [r, g, b] = self.color;
        [r, g, b, self.opacity]
    }
}

/// Base colors of the two reference forms plus the selection highlight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub female: [f32; 3],
    pub male: [f32; 3],
    pub highlight: [f32; 3],
}

impl Palette {
    pub const DEFAULT: Palette = Palette {
        female: rgb(0xff8566),
        male: rgb(0xff6b47),
        highlight: rgb(0xff3838),
    };

    /// Tint the highlight after the predicted gender when one is known.
    pub fn for_prediction(gender: Option<Gender>) -> Palette {
        let highlight = match gender {
            Some(Gender::Male) => rgb(0x3b82f6),
            Some(Gender::Female) => rgb(0xec4899),
            None => Palette::DEFAULT.highlight,
        };
        Palette { highlight, ..Palette::DEFAULT }
    }

    pub fn gradient(&self, morph: f32) -> [f32; 3] {
        let t = clamp_morph(morph);
        std::array::from_fn(|i| self.female[i] + (self.male[i] - self.female[i]) * t)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::DEFAULT
    }
}

/// Single material dispatch for procedural parts, loaded sub-meshes and the
/// flat diagram. Selection beats hover.
pub fn material_for(
    kind: PartKind,
    morph: f32,
    selected: Option<FeatureId>,
    hovered: Option<FeatureId>,
    palette: &Palette,
) -> ColorStyle {
    if selected.is_some_and(|id| kind.owns(id)) {
        return ColorStyle {
            color: palette.highlight,
            emissive: HIGHLIGHT_EMISSIVE,
            opacity: 1.0,
        };
    }
    let shade = kind.shade();
    let mut color = palette.gradient(morph).map(|c| c * shade);
    if hovered.is_some_and(|id| kind.owns(id)) {
        color = color.map(|c| c + (1.0 - c) * HOVER_LIGHTEN);
    }
    ColorStyle { color, emissive: 0.0, opacity: DEFAULT_OPACITY }
}

// ============================================================================
// DIMENSIONS
// ============================================================================

/// NaN maps to 0.
pub fn clamp_morph(morph: f32) -> f32 {
    if morph.is_nan() { 0.0 } else { morph.clamp(0.0, 1.0) }
}

/// Morph-dependent sizes of the procedural parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width_scale: f32,
    pub height_scale: f32,
    pub body_width: f32,
    pub ramus_height: f32,
    pub condyle_radius: f32,
    pub coronoid_height: f32,
    pub gonial_radius: f32,
    pub chin_radius: f32,
    pub foramen_height: f32,
}

impl Dimensions {
    pub fn as_array(&self) -> [f32; 9] {
        [
            self.width_scale,
            self.height_scale,
            self.body_width,
            self.ramus_height,
            self.condyle_radius,
            self.coronoid_height,
            self.gonial_radius,
            self.chin_radius,
            self.foramen_height,
        ]
    }
}

pub fn dimensions(morph: f32) -> Dimensions {
    let m = clamp_morph(morph);
    let grow = |base: f32, coeff: f32| base * (1.0 + m * coeff);
    Dimensions {
        width_scale: grow(1.0, BODY_WIDTH_COEFF),
        height_scale: grow(1.0, RAMUS_HEIGHT_COEFF),
        body_width: grow(BODY_SIZE.x, BODY_WIDTH_COEFF),
        ramus_height: grow(RAMUS_SIZE.y, RAMUS_HEIGHT_COEFF),
        condyle_radius: grow(CONDYLE_RADIUS, CONDYLE_RADIUS_COEFF),
        coronoid_height: grow(CORONOID_HEIGHT, CORONOID_HEIGHT_COEFF),
        gonial_radius: grow(GONIAL_RADIUS, GONIAL_RADIUS_COEFF),
        chin_radius: grow(CHIN_RADIUS, CHIN_RADIUS_COEFF),
        foramen_height: FORAMEN_SIZE.y,
    }
}

/// Scale applied to catalog anchors: (width, height, 1).
pub fn scales(morph: f32) -> Vec3 {
    let d = dimensions(morph);
    Vec3::new(d.width_scale, d.height_scale, 1.0)
}

/// Overall X extent of the procedural model, condyle to condyle.
pub fn model_width(morph: f32) -> f32 {
    let d = dimensions(morph);
    2.0 * (1.12 * d.width_scale + d.condyle_radius)
}

/// Non-uniform scale applied to a loaded asset.
pub fn loaded_mesh_scale(morph: f32) -> Vec3 {
    let m = clamp_morph(morph);
    Vec3::new(1.0 + m * LOADED_WIDTH_COEFF, 1.0 + m * LOADED_HEIGHT_COEFF, 1.0)
}

// ============================================================================
// PRIMITIVES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    pub kind: PartKind,
    pub shape: PrimitiveShape,
    pub position: Vec3,
    pub rotation: Quat,
    /// Full extent along each local axis.
    pub size: Vec3,
    pub style: ColorStyle,
}

impl Primitive {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.size, self.rotation, self.position)
    }
}

/// Procedural mandible for `morph`. Pure, no I/O.
pub fn build(
    morph: f32,
    selected: Option<FeatureId>,
    hovered: Option<FeatureId>,
    palette: &Palette,
) -> Vec<Primitive> {
    let morph = clamp_morph(morph);
    let d = dimensions(morph);
    let (ws, hs) = (d.width_scale, d.height_scale);

    let part = |kind: PartKind, shape: PrimitiveShape, position: Vec3, rotation: Quat, size: Vec3| Primitive {
        kind,
        shape,
        position,
        rotation,
        size,
        style: material_for(kind, morph, selected, hovered, palette),
    };
    let sphere = |kind: PartKind, position: Vec3, radius: f32| {
        part(kind, PrimitiveShape::Sphere, position, Quat::IDENTITY, Vec3::splat(2.0 * radius))
    };

    let ramus_size = Vec3::new(RAMUS_SIZE.x, d.ramus_height, RAMUS_SIZE.z);
    let coronoid_size = Vec3::new(2.0 * CORONOID_RADIUS, d.coronoid_height, 2.0 * CORONOID_RADIUS);

    vec![
        part(
            PartKind::Body,
            PrimitiveShape::Box,
            Vec3::new(0.0, -0.4, 0.0),
            Quat::IDENTITY,
            Vec3::new(d.body_width, BODY_SIZE.y, BODY_SIZE.z),
        ),
        part(
            PartKind::RamusLeft,
            PrimitiveShape::Box,
            Vec3::new(-1.0 * ws, 0.0, 0.0),
            Quat::from_rotation_z(FRAC_PI_6),
            ramus_size,
        ),
        part(
            PartKind::RamusRight,
            PrimitiveShape::Box,
            Vec3::new(1.0 * ws, 0.0, 0.0),
            Quat::from_rotation_z(-FRAC_PI_6),
            ramus_size,
        ),
        sphere(PartKind::CondyleLeft, Vec3::new(-1.12 * ws, 0.6 * hs, 0.0), d.condyle_radius),
        sphere(PartKind::CondyleRight, Vec3::new(1.12 * ws, 0.6 * hs, 0.0), d.condyle_radius),
        part(
            PartKind::CoronoidLeft,
            PrimitiveShape::Cone,
            Vec3::new(-0.8 * ws, 0.2 * hs, 0.0),
            Quat::IDENTITY,
            coronoid_size,
        ),
        part(
            PartKind::CoronoidRight,
            PrimitiveShape::Cone,
            Vec3::new(0.8 * ws, 0.2 * hs, 0.0),
            Quat::IDENTITY,
            coronoid_size,
        ),
        sphere(PartKind::GonialLeft, Vec3::new(-1.0 * ws, -0.4, 0.0), d.gonial_radius),
        sphere(PartKind::GonialRight, Vec3::new(1.0 * ws, -0.4, 0.0), d.gonial_radius),
        sphere(PartKind::Chin, Vec3::new(0.0, -0.72, 0.08), d.chin_radius),
        part(
            PartKind::ForamenLeft,
            PrimitiveShape::Cylinder,
            Vec3::new(-0.6 * ws, -0.08, -0.12),
            Quat::IDENTITY,
            FORAMEN_SIZE,
        ),
        part(
            PartKind::ForamenRight,
            PrimitiveShape::Cylinder,
            Vec3::new(0.6 * ws, -0.08, -0.12),
            Quat::IDENTITY,
            FORAMEN_SIZE,
        ),
    ]
}

/// Translucent box shown while the asset loads, and when everything else failed.
pub fn placeholder(palette: &Palette) -> Primitive {
    Primitive {
        kind: PartKind::Whole,
        shape: PrimitiveShape::Box,
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        size: Vec3::new(2.0, 1.0, 1.0),
        style: ColorStyle {
            color: palette.female,
            emissive: 0.0,
            opacity: PLACEHOLDER_OPACITY,
        },
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// Morph factor plus the optional loaded asset. Procedural parts are rebuilt
/// on demand from the factor, so they are never stale.
#[derive(Debug, Default)]
pub struct MandibleModel {
    morph: f32,
    loaded: Option<LoadedMesh>,
}

impl MandibleModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn morph(&self) -> f32 {
        self.morph
    }

    pub fn set_morph(&mut self, morph: f32) {
        self.morph = clamp_morph(morph);
    }

    pub fn parts(&self, selected: Option<FeatureId>, hovered: Option<FeatureId>, palette: &Palette) -> Vec<Primitive> {
        build(self.morph, selected, hovered, palette)
    }

    pub fn loaded_mesh(&self) -> Option<&LoadedMesh> {
        self.loaded.as_ref()
    }

    pub fn set_loaded_mesh(&mut self, mesh: LoadedMesh) {
        self.loaded = Some(mesh);
    }

    /// Scale for the loaded asset at the current morph.
    pub fn loaded_scale(&self) -> Vec3 {
        loaded_mesh_scale(self.morph)
    }

    /// Landmark anchor at the current morph.
    pub fn anchor(&self, id: FeatureId) -> Vec3 {
        id.definition().anchor * scales(self.morph)
    }

    pub fn label_position(&self, id: FeatureId) -> Vec3 {
        self.anchor(id) + id.definition().label_offset
    }

    /// Measurement landmarks at the current morph, scaled like the anchor.
    pub fn measurement_line(&self, id: FeatureId) -> Vec<Vec3> {
        let scale = scales(self.morph);
        id.definition().measurement_line.iter().map(|p| *p * scale).collect()
    }
}
