// ECS systems for keeping the world in step with the scene description
// The viewer describes the scene each frame as a flat list; these systems
// apply it to the world and read it back for drawing.

use bevy_ecs::prelude::*;
use glam::Mat4;

use super::builder::{ColorStyle, PartKind, Primitive};
use super::components::*;

/// One entry of the frame's scene description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneItem {
    pub kind: PartKind,
    pub mesh: MeshRef,
    pub transform: Transform,
    pub style: ColorStyle,
}

impl SceneItem {
    pub fn from_primitive(primitive: &Primitive) -> Self {
        Self {
            kind: primitive.kind,
            mesh: MeshRef::Primitive(primitive.shape),
            transform: Transform {
                position: primitive.position,
                rotation: primitive.rotation,
                scale: primitive.size,
            },
            style: primitive.style,
        }
    }

    fn key(&self) -> (PartKind, MeshRef) {
        (self.kind, self.mesh)
    }
}

/// Data the renderer needs per entity, in slot order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub kind: PartKind,
    pub mesh: MeshRef,
    pub model: Mat4,
    pub style: ColorStyle,
}

/// Bring the world in line with `items`.
/// Same parts and meshes as last frame: transforms and materials are updated
/// in place. Anything else (asset arrived, fallback kicked in): respawn.
/// Returns true when entities were respawned.
pub fn sync_scene(world: &mut World, items: &[SceneItem]) -> bool {
    let mut query = world.query::<(&SceneSlot, &Part, &Renderable)>();
    let mut current: Vec<(usize, (PartKind, MeshRef))> = query
        .iter(world)
        .map(|(slot, part, renderable)| (slot.0, (part.kind, renderable.mesh)))
        .collect();
    current.sort_by_key(|(slot, _)| *slot);

    let unchanged = current.len() == items.len()
        && current
            .iter()
            .zip(items)
            .enumerate()
            .all(|(idx, ((slot, key), item))| *slot == idx && *key == item.key());

    if unchanged {
        let mut query = world.query::<(&SceneSlot, &mut Transform, &mut Material)>();
        for (slot, mut transform, mut material) in query.iter_mut(world) {
            let item = &items[slot.0];
            if *transform != item.transform {
                *transform = item.transform;
            }
            if material.style != item.style {
                material.style = item.style;
            }
        }
        return false;
    }

    let stale: Vec<Entity> = world.query_filtered::<Entity, With<SceneSlot>>().iter(world).collect();
    for entity in stale {
        world.despawn(entity);
    }
    for (idx, item) in items.iter().enumerate() {
        world.spawn((
            SceneSlot(idx),
            Part { kind: item.kind },
            Renderable { mesh: item.mesh },
            item.transform,
            Material { style: item.style },
        ));
    }
    log::debug!("Scene rebuilt with {} entities", items.len());
    true
}

/// Read the world back as draw items in slot order.
pub fn collect_draw_items(world: &mut World) -> Vec<DrawItem> {
    let mut query = world.query::<(&SceneSlot, &Part, &Renderable, &Transform, &Material)>();
    let mut items: Vec<(usize, DrawItem)> = query
        .iter(world)
        .map(|(slot, part, renderable, transform, material)| {
            (
                slot.0,
                DrawItem {
                    kind: part.kind,
                    mesh: renderable.mesh,
                    model: transform.matrix(),
                    style: material.style,
                },
            )
        })
        .collect();
    items.sort_by_key(|(slot, _)| *slot);
    items.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::builder::{build, placeholder, Palette};
    use crate::engine::catalog::FeatureId;

    fn scene(morph: f32, selected: Option<FeatureId>) -> Vec<SceneItem> {
        build(morph, selected, None, &Palette::DEFAULT).iter().map(SceneItem::from_primitive).collect()
    }

    #[test]
    fn unchanged_parts_update_in_place() {
        let mut world = World::new();
        assert!(sync_scene(&mut world, &scene(0.0, None)));
        let before: Vec<Entity> = world.query::<Entity>().iter(&world).collect();

        let selected = FeatureId::new(9);
        assert!(!sync_scene(&mut world, &scene(0.7, selected)));
        let after: Vec<Entity> = world.query::<Entity>().iter(&world).collect();
        assert_eq!(before, after);

        let drawn = collect_draw_items(&mut world);
        let expected = scene(0.7, selected);
        assert_eq!(drawn.len(), expected.len());
        for (d, e) in drawn.iter().zip(expected.iter()) {
            assert_eq!(d.kind, e.kind);
            assert_eq!(d.style, e.style);
            assert_eq!(d.model, e.transform.matrix());
        }
    }

    #[test]
    fn changed_parts_respawn() {
        let mut world = World::new();
        sync_scene(&mut world, &scene(0.0, None));
        let boxed = [SceneItem::from_primitive(&placeholder(&Palette::DEFAULT))];
        assert!(sync_scene(&mut world, &boxed));
        assert_eq!(world.query::<&Part>().iter(&world).count(), 1);
        assert_eq!(collect_draw_items(&mut world)[0].kind, PartKind::Whole);

        assert!(sync_scene(&mut world, &[]));
        assert!(collect_draw_items(&mut world).is_empty());
    }
}
