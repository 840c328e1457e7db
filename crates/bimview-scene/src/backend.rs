//! Fragment backend over Bevy assets
//!
//! Plain fragments are hidden through their entity's `Visibility`. Items in
//! a batched fragment share one mesh, so hiding an item collapses its
//! vertices onto a single point and showing it copies the rest positions
//! back. `Assets::get_mut` marks the mesh changed, which re-uploads it.

use bevy::ecs::system::SystemParam;
use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;
use bimview_core::{FragmentBackend, FragmentId, ItemSpan, MaterialSpec, Rgb};

use crate::models::{fragment_material, vertex_color, FragmentHandles, FragmentMesh};

#[derive(SystemParam)]
pub struct BevyFragments<'w, 's> {
    handles: Res<'w, FragmentHandles>,
    meshes: ResMut<'w, Assets<Mesh>>,
    materials: ResMut<'w, Assets<StandardMaterial>>,
    visibility: Query<'w, 's, &'static mut Visibility, With<FragmentMesh>>,
}

impl BevyFragments<'_, '_> {
    fn mesh_attribute(&mut self, fragment: FragmentId, attribute: MeshAttribute) -> Option<&mut VertexAttributeValues> {
        let render = self.handles.get(fragment)?;
        let mesh = self.meshes.get_mut(&render.mesh)?;
        let id = match attribute {
            MeshAttribute::Position => Mesh::ATTRIBUTE_POSITION,
            MeshAttribute::Color => Mesh::ATTRIBUTE_COLOR,
        };
        mesh.attribute_mut(id)
    }
}

enum MeshAttribute {
    Position,
    Color,
}

impl FragmentBackend for BevyFragments<'_, '_> {
    fn set_material(&mut self, fragment: FragmentId, material: &MaterialSpec) {
        let Some(render) = self.handles.get(fragment) else {
            return;
        };
        if let Some(current) = self.materials.get_mut(&render.material) {
            *current = fragment_material(material);
        }
    }

    fn set_item_colors(&mut self, fragment: FragmentId, spans: &[ItemSpan], color: Rgb, opacity: f32) {
        let rgba = vertex_color(color, opacity);
        let Some(VertexAttributeValues::Float32x4(colors)) = self.mesh_attribute(fragment, MeshAttribute::Color) else {
            tracing::warn!("Fragment {:?} has no vertex colors", fragment);
            return;
        };

        for span in spans {
            if let Some(slots) = colors.get_mut(span.range()) {
                slots.fill(rgba);
            }
        }
    }

    fn set_fragment_visible(&mut self, fragment: FragmentId, visible: bool) {
        let Some(render) = self.handles.get(fragment) else {
            return;
        };
        if let Ok(mut visibility) = self.visibility.get_mut(render.entity) {
            *visibility = if visible {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            };
        }
    }

    fn set_items_visible(&mut self, fragment: FragmentId, spans: &[ItemSpan], visible: bool) {
        let Some(render) = self.handles.get(fragment) else {
            return;
        };
        // Cloned to release the borrow on `handles` before touching the mesh
        let rest: Vec<[f32; 3]> = spans
            .iter()
            .filter_map(|span| render.rest_positions.get(span.range()))
            .flatten()
            .copied()
            .collect();

        let Some(VertexAttributeValues::Float32x3(positions)) =
            self.mesh_attribute(fragment, MeshAttribute::Position)
        else {
            return;
        };

        let mut rest = rest.into_iter();
        for span in spans {
            let Some(slots) = positions.get_mut(span.range()) else {
                continue;
            };
            let original: Vec<[f32; 3]> = rest.by_ref().take(slots.len()).collect();
            if visible {
                slots.copy_from_slice(&original);
            } else if let Some(anchor) = original.first() {
                slots.fill(*anchor);
            }
        }
    }
}
