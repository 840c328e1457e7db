//! Scene setup - camera, lights, the ground grid and the world axes

use bevy::prelude::*;

use crate::camera::{CameraSettings, MainCamera};

/// Marker component for the main directional light
#[derive(Component)]
pub struct MainDirectionalLight;

/// Marker component for grid lines
#[derive(Component)]
pub struct GridLine;

/// Marker component for the world axis bars
#[derive(Component)]
pub struct AxisLine;

/// Ground grid and axes helper settings
#[derive(Debug, Clone, Resource)]
pub struct HelperSettings {
    pub show_grid: bool,
    pub show_axes: bool,
    /// Lines on each side of the origin
    pub half_lines: i32,
    pub spacing: f32,
    pub line_thickness: f32,
    pub alpha: f32,
    pub axis_length: f32,
}

impl Default for HelperSettings {
    fn default() -> Self {
        Self {
            show_grid: true,
            show_axes: true,
            half_lines: 10,
            spacing: 1.0,
            line_thickness: 0.01,
            alpha: 0.5,
            axis_length: 2.0,
        }
    }
}

fn helper_visibility(shown: bool) -> Visibility {
    if shown {
        Visibility::Visible
    } else {
        Visibility::Hidden
    }
}

/// Plugin for scene setup
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HelperSettings>()
            .add_systems(Startup, setup_scene)
            .add_systems(Update, update_helper_visibility);
    }
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    camera_settings: Res<CameraSettings>,
    helpers: Res<HelperSettings>,
) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.05,
            far: 2000.0,
            ..default()
        }),
        Transform::from_translation(camera_settings.eye()).looking_at(camera_settings.target, Vec3::Y),
        MainCamera,
    ));

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.95, 0.95, 1.0),
        brightness: 400.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(10.0, 20.0, 15.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainDirectionalLight,
    ));

    // Fill from the opposite side so back faces are not black
    commands.spawn((
        DirectionalLight {
            illuminance: 1500.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(-10.0, 8.0, -15.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    spawn_grid(&mut commands, &mut meshes, &mut materials, &helpers);
    spawn_axes(&mut commands, &mut meshes, &mut materials, &helpers);
}

/// Grid helper on the X-Z ground plane
fn spawn_grid(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    grid: &HelperSettings,
) {
    let extent = grid.half_lines as f32 * grid.spacing;
    let thickness = grid.line_thickness;
    let visibility = helper_visibility(grid.show_grid);

    let line_material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.5, 0.5, 0.5, grid.alpha),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });

    let line_x = meshes.add(Cuboid::new(extent * 2.0, thickness, thickness));
    let line_z = meshes.add(Cuboid::new(thickness, thickness, extent * 2.0));

    for i in -grid.half_lines..=grid.half_lines {
        let offset = i as f32 * grid.spacing;
        commands.spawn((
            Mesh3d(line_x.clone()),
            MeshMaterial3d(line_material.clone()),
            Transform::from_xyz(0.0, 0.0, offset),
            GridLine,
            visibility,
        ));
        commands.spawn((
            Mesh3d(line_z.clone()),
            MeshMaterial3d(line_material.clone()),
            Transform::from_xyz(offset, 0.0, 0.0),
            GridLine,
            visibility,
        ));
    }
}

/// X (red), Y (green, up) and Z (blue) bars from the origin
fn spawn_axes(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    helpers: &HelperSettings,
) {
    let length = helpers.axis_length;
    // Thicker than the grid so the bars stay on top of it
    let thickness = helpers.line_thickness * 3.0;
    let visibility = helper_visibility(helpers.show_axes);

    let axes = [
        (Vec3::new(length, thickness, thickness), Color::srgb(1.0, 0.2, 0.2)),
        (Vec3::new(thickness, length, thickness), Color::srgb(0.2, 1.0, 0.2)),
        (Vec3::new(thickness, thickness, length), Color::srgb(0.2, 0.4, 1.0)),
    ];

    for (size, color) in axes {
        let material = materials.add(StandardMaterial {
            base_color: color,
            unlit: true,
            ..default()
        });
        // Cuboids are centered, so shift each bar half its length along its axis
        let center = (size - Vec3::splat(thickness)) / 2.0;
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::from_size(size))),
            MeshMaterial3d(material),
            Transform::from_translation(center),
            AxisLine,
            visibility,
        ));
    }
}

fn update_helper_visibility(
    helpers: Res<HelperSettings>,
    mut grid_lines: Query<&mut Visibility, (With<GridLine>, Without<AxisLine>)>,
    mut axis_lines: Query<&mut Visibility, (With<AxisLine>, Without<GridLine>)>,
) {
    if !helpers.is_changed() {
        return;
    }

    let grid = helper_visibility(helpers.show_grid);
    for mut v in grid_lines.iter_mut() {
        *v = grid;
    }
    let axes = helper_visibility(helpers.show_axes);
    for mut v in axis_lines.iter_mut() {
        *v = axes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::SystemState;

    fn helper_app() -> App {
        let mut app = App::new();
        app.init_resource::<HelperSettings>()
            .add_systems(Update, update_helper_visibility);
        app.world_mut().spawn((GridLine, Visibility::Visible));
        app.world_mut().spawn((AxisLine, Visibility::Visible));
        app.update();
        app
    }

    fn visibilities<M: Component>(app: &mut App) -> Vec<Visibility> {
        app.world_mut()
            .query_filtered::<&Visibility, With<M>>()
            .iter(app.world())
            .copied()
            .collect()
    }

    #[test]
    fn test_axes_toggle_leaves_grid_alone() {
        let mut app = helper_app();

        app.world_mut().resource_mut::<HelperSettings>().show_axes = false;
        app.update();

        assert_eq!(visibilities::<AxisLine>(&mut app), vec![Visibility::Hidden]);
        assert_eq!(visibilities::<GridLine>(&mut app), vec![Visibility::Visible]);
    }

    #[test]
    fn test_grid_can_be_hidden_and_shown_again() {
        let mut app = helper_app();

        app.world_mut().resource_mut::<HelperSettings>().show_grid = false;
        app.update();
        assert_eq!(visibilities::<GridLine>(&mut app), vec![Visibility::Hidden]);

        app.world_mut().resource_mut::<HelperSettings>().show_grid = true;
        app.update();
        assert_eq!(visibilities::<GridLine>(&mut app), vec![Visibility::Visible]);
        assert_eq!(visibilities::<AxisLine>(&mut app), vec![Visibility::Visible]);
    }

    #[test]
    fn test_axis_bars_start_at_origin() {
        let mut world = World::new();
        world.insert_resource(Assets::<Mesh>::default());
        world.insert_resource(Assets::<StandardMaterial>::default());

        let mut state: SystemState<(Commands, ResMut<Assets<Mesh>>, ResMut<Assets<StandardMaterial>>)> =
            SystemState::new(&mut world);
        let (mut commands, mut meshes, mut materials) = state.get_mut(&mut world);
        spawn_axes(&mut commands, &mut meshes, &mut materials, &HelperSettings::default());
        state.apply(&mut world);

        let translations: Vec<Vec3> = world
            .query_filtered::<&Transform, With<AxisLine>>()
            .iter(&world)
            .map(|t| t.translation)
            .collect();
        assert_eq!(translations.len(), 3);
        // The Y bar stands upright on the ground plane
        assert!(translations.iter().any(|t| t.y > 0.9 && t.x.abs() < 1e-6 && t.z.abs() < 1e-6));
        assert!(translations.iter().all(|t| t.min_element() >= 0.0));
    }
}
