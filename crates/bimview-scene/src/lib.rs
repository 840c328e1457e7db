//! Bimview Scene - Bevy scene for the IFC viewer
//!
//! Camera with orbit controls, lights with grid and axes helpers, model spawning
//! and the Bevy implementation of the fragment backend.

pub mod backend;
pub mod camera;
pub mod models;
pub mod scene;
pub mod types;

use bevy::prelude::*;

/// Plugin that sets up the 3D scene components
pub struct BimScenePlugin;

impl Plugin for BimScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(models::ModelsPlugin);
    }
}

pub use backend::BevyFragments;
pub use camera::{CameraSettings, MainCamera};
pub use models::{apply_framing, spawn_model, FragmentHandles, FragmentMesh, ModelRoot};
pub use scene::HelperSettings;
pub use types::UiLayout;
