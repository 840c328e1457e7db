//! Bevy application setup

use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use std::time::Duration;

use bimview_core::{ViewerConfig, ViewerQuery};
use bimview_scene::{BimScenePlugin, UiLayout};

use crate::loader::{read_page_query, LoaderPlugin};
use crate::status::StatusPlugin;
use crate::ui::UiPlugin;

/// Configuration and page query, fixed for the lifetime of the page
#[derive(Debug, Clone, Default, Resource)]
pub struct ViewerSettings {
    pub config: ViewerConfig,
    pub query: ViewerQuery,
}

pub fn run(config: ViewerConfig) {
    let query = read_page_query();
    tracing::debug!("Page query: {:?}", query);

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
        // Continuous rendering; mobile switches to power saving below
        .insert_resource(WinitSettings::default())
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "IFC Viewer".to_string(),
                canvas: Some("#viewer-canvas".to_string()),
                fit_canvas_to_parent: true,
                prevent_default_event_handling: false,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // Picking must be registered before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .insert_resource(ViewerSettings { config, query })
        .init_resource::<UiLayout>()
        .add_plugins(BimScenePlugin)
        .add_plugins(StatusPlugin)
        .add_plugins(LoaderPlugin)
        .add_plugins(UiPlugin)
        .add_systems(Update, adjust_power_settings_for_mobile)
        .run();
}

/// On mobile, use power saving mode. On desktop, use continuous rendering.
fn adjust_power_settings_for_mobile(layout: Res<UiLayout>, mut winit_settings: ResMut<WinitSettings>) {
    if !layout.is_changed() {
        return;
    }

    if layout.is_mobile {
        use bevy::winit::UpdateMode;
        winit_settings.focused_mode = UpdateMode::reactive_low_power(Duration::from_millis(100));
        winit_settings.unfocused_mode = UpdateMode::reactive_low_power(Duration::from_millis(500));
    } else {
        *winit_settings = WinitSettings::default();
    }
}
