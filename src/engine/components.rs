// ECS components for the rendered scene
// One entity per drawn part: procedural primitive, loaded sub-mesh or placeholder

use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3};

use super::builder::{ColorStyle, PartKind};
use super::mesh::PrimitiveShape;

/// Placement of an entity in model space
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_scale(scale: Vec3) -> Self {
        Self { scale, ..Default::default() }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Which anatomical part an entity draws
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    pub kind: PartKind,
}

/// Geometry an entity draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshRef {
    /// Shared unit primitive, scaled by the transform
    Primitive(PrimitiveShape),
    /// Sub-mesh index into the loaded asset
    SubMesh(usize),
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderable {
    pub mesh: MeshRef,
}

/// Color, emissive and opacity, rewritten every frame from material_for()
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub style: ColorStyle,
}

/// Position of the entity in the scene list; draw order follows it
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SceneSlot(pub usize);
