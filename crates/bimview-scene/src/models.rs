//! Model entities - one root per loaded model, one mesh entity per fragment

use std::collections::BTreeMap;

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bimview_core::{Fragment, FragmentId, FragmentKind, FragmentLayout, Framing, MaterialSpec, Rgb};

use crate::camera::CameraSettings;

/// Root entity of the loaded model; framing scales and moves this
#[derive(Component)]
pub struct ModelRoot;

/// Mesh entity of one fragment
#[derive(Component, Debug, Clone, Copy)]
pub struct FragmentMesh {
    pub id: FragmentId,
}

/// Render-side handles of one fragment
#[derive(Debug, Clone)]
pub struct FragmentRender {
    pub entity: Entity,
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
    pub kind: FragmentKind,
    /// Untouched vertex positions, used to restore hidden items
    pub rest_positions: Vec<[f32; 3]>,
}

/// Fragment id -> render handles for the current model
#[derive(Debug, Default, Resource)]
pub struct FragmentHandles {
    pub root: Option<Entity>,
    pub fragments: BTreeMap<FragmentId, FragmentRender>,
}

impl FragmentHandles {
    pub fn get(&self, id: FragmentId) -> Option<&FragmentRender> {
        self.fragments.get(&id)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Plugin for model entities
pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FragmentHandles>();
    }
}

/// Linear RGBA vertex color for an sRGB color and opacity
pub fn vertex_color(color: Rgb, opacity: f32) -> [f32; 4] {
    let linear = Color::srgb_u8(color.r, color.g, color.b).to_linear();
    [linear.red, linear.green, linear.blue, opacity]
}

/// Bevy material for a material spec. Both faces are drawn since IFC
/// solids are not reliably wound.
pub fn fragment_material(spec: &MaterialSpec) -> StandardMaterial {
    StandardMaterial {
        base_color: {
            let [r, g, b] = spec.color.to_unit();
            Color::srgba(r, g, b, spec.opacity)
        },
        alpha_mode: if spec.transparent {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        },
        perceptual_roughness: 0.8,
        double_sided: true,
        cull_mode: None,
        ..default()
    }
}

/// Triangle mesh for a fragment. Batched fragments carry a vertex color
/// attribute, initially `base` at full opacity.
pub fn build_fragment_mesh(fragment: &Fragment, base: Rgb) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, fragment.positions.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, fragment.normals.clone());

    if fragment.kind == FragmentKind::Batched {
        let colors = vec![vertex_color(base, 1.0); fragment.vertex_count()];
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
    }

    mesh.insert_indices(Indices::U32(fragment.indices.clone()));
    mesh
}

/// Spawn the model root and one mesh entity per fragment.
///
/// Everything starts out in `fallback`: plain fragments through their
/// material, batched fragments through their vertex colors.
pub fn spawn_model(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    layout: &FragmentLayout,
    fallback: Rgb,
) -> FragmentHandles {
    let root = commands
        .spawn((ModelRoot, Transform::default(), Visibility::default()))
        .id();

    let mut fragments = BTreeMap::new();
    for fragment in &layout.fragments {
        let initial = match fragment.kind {
            FragmentKind::Plain => MaterialSpec::new(fallback, 1.0),
            FragmentKind::Batched => MaterialSpec::shared(false),
        };

        let mesh = meshes.add(build_fragment_mesh(fragment, fallback));
        let material = materials.add(fragment_material(&initial));

        let entity = commands
            .spawn((
                Mesh3d(mesh.clone()),
                MeshMaterial3d(material.clone()),
                Transform::default(),
                Visibility::Inherited,
                FragmentMesh { id: fragment.id },
                ChildOf(root),
            ))
            .id();

        fragments.insert(
            fragment.id,
            FragmentRender {
                entity,
                mesh,
                material,
                kind: fragment.kind,
                rest_positions: fragment.positions.clone(),
            },
        );
    }

    tracing::info!("Spawned model with {} fragment meshes", fragments.len());
    FragmentHandles {
        root: Some(root),
        fragments,
    }
}

/// Place the model root and the camera according to `framing`
pub fn apply_framing(framing: &Framing, root: &mut Transform, camera: &mut CameraSettings) {
    root.translation = framing.translation;
    root.scale = Vec3::splat(framing.scale);
    camera.look_from(framing.camera_position, framing.camera_target);

    tracing::debug!(
        "Framed model: scale {:.4}, translation {:?}, camera {:?}",
        framing.scale,
        framing.translation,
        framing.camera_position
    );
}
