//! IFC model loading from the `ifcUrl` page parameter
//!
//! The fetch runs as one `spawn_local` future ending in a single `Result`,
//! handed back to Bevy through [`PendingLoad`].

use bevy::prelude::*;
use std::sync::{Arc, Mutex};

use bimview_core::config::BatchingConfig;
use bimview_core::{
    parse_ifc, CategoryTable, Classification, FragmentLayout, Framing, LoadError, ViewerQuery, ViewerSession,
};
use bimview_scene::{apply_framing, spawn_model, BevyFragments, CameraSettings};

use crate::app::ViewerSettings;
use crate::status::ViewerStatus;

/// Plugin for model loading
pub struct LoaderPlugin;

impl Plugin for LoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingLoad>()
            .add_systems(Startup, start_load)
            .add_systems(
                Update,
                (
                    process_pending_load,
                    apply_initial_styles.run_if(resource_added::<ModelSession>),
                )
                    .chain(),
            );
    }
}

/// A fetched and classified model, ready to spawn
#[derive(Debug)]
pub struct LoadedModel {
    pub url: String,
    pub layout: FragmentLayout,
    pub classification: Classification,
}

/// Result slot filled by the load future
#[derive(Resource, Default)]
pub struct PendingLoad {
    pub result: Arc<Mutex<Option<Result<LoadedModel, LoadError>>>>,
}

/// The loaded model's session, present once loading succeeded
#[derive(Resource)]
pub struct ModelSession {
    pub url: String,
    pub session: ViewerSession,
}

/// Read the query parameters of the current page
#[cfg(target_arch = "wasm32")]
pub fn read_page_query() -> ViewerQuery {
    let Some(window) = web_sys::window() else {
        return ViewerQuery::default();
    };
    let search = match window.location().search() {
        Ok(search) => search,
        Err(e) => {
            tracing::warn!("Could not read page location: {:?}", e);
            return ViewerQuery::default();
        }
    };

    match web_sys::UrlSearchParams::new_with_str(&search) {
        Ok(params) => ViewerQuery::from_lookup(|key| params.get(key)),
        Err(e) => {
            tracing::warn!("Could not parse page query: {:?}", e);
            ViewerQuery::default()
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn read_page_query() -> ViewerQuery {
    ViewerQuery::default()
}

/// Parse, batch and classify a downloaded model
pub fn build_model(url: String, bytes: &[u8], batching: &BatchingConfig) -> Result<LoadedModel, LoadError> {
    let geometry = parse_ifc(bytes)?;
    let layout = FragmentLayout::build(geometry, batching);
    let classification = Classification::by_entity(&layout);

    tracing::info!(
        "Loaded {}: {} items in {} fragments, {} categories",
        url,
        layout.item_count(),
        layout.len(),
        classification.len()
    );

    Ok(LoadedModel {
        url,
        layout,
        classification,
    })
}

#[cfg(target_arch = "wasm32")]
async fn load_model(url: String, batching: BatchingConfig) -> Result<LoadedModel, LoadError> {
    let bytes = fetch_bytes(&url).await?;
    build_model(url, &bytes, &batching)
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(url: &str) -> Result<Vec<u8>, LoadError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or_else(|| LoadError::Network("No window".to_string()))?;

    let resp = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| LoadError::Network(format!("{:?}", e)))?;
    let resp: web_sys::Response = resp
        .dyn_into()
        .map_err(|_| LoadError::Network("Response cast failed".to_string()))?;

    if !resp.ok() {
        return Err(LoadError::Http {
            status: resp.status(),
            status_text: resp.status_text(),
        });
    }

    let buffer = resp.array_buffer().map_err(|e| LoadError::Body(format!("{:?}", e)))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|e| LoadError::Body(format!("{:?}", e)))?;

    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Kick off the load named by the page query
fn start_load(settings: Res<ViewerSettings>, pending: Res<PendingLoad>, mut status: ResMut<ViewerStatus>) {
    let Some(url) = settings.query.model_url.clone() else {
        *status = ViewerStatus::NoInput;
        return;
    };

    tracing::info!("Loading IFC model from {}", url);
    *status = ViewerStatus::Loading { url: url.clone() };

    spawn_load(url, settings.config.batching.clone(), pending.result.clone());
}

#[cfg(target_arch = "wasm32")]
fn spawn_load(url: String, batching: BatchingConfig, slot: Arc<Mutex<Option<Result<LoadedModel, LoadError>>>>) {
    wasm_bindgen_futures::spawn_local(async move {
        let result = load_model(url, batching).await;
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(result);
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_load(url: String, _batching: BatchingConfig, slot: Arc<Mutex<Option<Result<LoadedModel, LoadError>>>>) {
    if let Ok(mut slot) = slot.lock() {
        *slot = Some(Err(LoadError::Network(format!(
            "Fetching {} is only supported in the browser",
            url
        ))));
    }
}

/// Turn a finished load into scene entities and a session
fn process_pending_load(
    mut commands: Commands,
    pending: Res<PendingLoad>,
    settings: Res<ViewerSettings>,
    mut status: ResMut<ViewerStatus>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut camera: ResMut<CameraSettings>,
) {
    let Some(result) = pending.result.try_lock().ok().and_then(|mut slot| slot.take()) else {
        return;
    };

    let model = match result {
        Ok(model) => model,
        Err(e) => {
            *status = ViewerStatus::Failed(e.to_string());
            return;
        }
    };

    let Some(bounds) = model.layout.bounds() else {
        *status = ViewerStatus::Warning(format!("{} contains no displayable geometry", model.url));
        return;
    };

    let config = &settings.config;
    let table = CategoryTable::build(model.classification.names(), &settings.query, config);
    let handles = spawn_model(
        &mut commands,
        &mut meshes,
        &mut materials,
        &model.layout,
        config.palette.fallback_color,
    );

    let framing = Framing::compute(bounds, &config.framing);
    if let Some(root) = handles.root {
        let mut transform = Transform::default();
        apply_framing(&framing, &mut transform, &mut camera);
        commands.entity(root).insert(transform);
    }

    *status = if framing.degenerate {
        ViewerStatus::Warning(format!("{} has zero size; shown without rescaling", model.url))
    } else {
        ViewerStatus::Ready {
            categories: model.classification.len(),
            fragments: model.layout.len(),
        }
    };

    let session = ViewerSession::new(
        model.layout,
        model.classification,
        &table,
        config.palette.restore_opacity,
    );
    commands.insert_resource(handles);
    commands.insert_resource(ModelSession {
        url: model.url,
        session,
    });
}

/// Style every category once the fragment entities exist
fn apply_initial_styles(mut model: ResMut<ModelSession>, mut fragments: BevyFragments) {
    model.session.initial_pass(&mut fragments);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimview_core::{ElementGeometry, ModelGeometry};
    use bimview_scene::FragmentHandles;

    fn quad(id: u32, category: &str, x: f32) -> ElementGeometry {
        ElementGeometry {
            express_id: id,
            category: category.to_string(),
            positions: vec![[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x + 1.0, 1.0, 0.0], [x, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    fn scene_app(settings: ViewerSettings) -> App {
        let mut app = App::new();
        app.insert_resource(settings)
            .init_resource::<PendingLoad>()
            .init_resource::<ViewerStatus>()
            .init_resource::<CameraSettings>()
            .init_resource::<FragmentHandles>()
            .insert_resource(Assets::<Mesh>::default())
            .insert_resource(Assets::<StandardMaterial>::default());
        app
    }

    #[test]
    fn test_build_model_rejects_non_ifc_bytes() {
        let err = build_model(
            "https://example.com/page.html".to_string(),
            b"<!DOCTYPE html><html></html>",
            &BatchingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::NotIfc(_)));
    }

    #[test]
    fn test_missing_url_reports_no_input() {
        let mut app = App::new();
        app.insert_resource(ViewerSettings::default())
            .init_resource::<PendingLoad>()
            .init_resource::<ViewerStatus>()
            .add_systems(Startup, start_load);
        app.update();

        assert_eq!(*app.world().resource::<ViewerStatus>(), ViewerStatus::NoInput);
        let pending = app.world().resource::<PendingLoad>();
        assert!(pending.result.lock().unwrap().is_none());
    }

    #[test]
    fn test_failed_load_leaves_scene_empty() {
        let query = ViewerQuery::from_pairs([("ifcUrl", "https://unreachable.invalid/model.ifc")]);
        let mut app = scene_app(ViewerSettings {
            query,
            ..default()
        });
        app.add_systems(Startup, start_load)
            .add_systems(Update, process_pending_load);
        app.update();

        let world = app.world();
        assert!(matches!(world.resource::<ViewerStatus>(), ViewerStatus::Failed(_)));
        assert!(world.get_resource::<ModelSession>().is_none());
        assert!(world.resource::<FragmentHandles>().is_empty());
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 0);
    }

    #[test]
    fn test_model_without_geometry_warns() {
        let layout = FragmentLayout::build(ModelGeometry::default(), &BatchingConfig::default());
        let classification = Classification::by_entity(&layout);

        let mut app = scene_app(ViewerSettings::default());
        app.add_systems(Update, process_pending_load);
        *app.world().resource::<PendingLoad>().result.lock().unwrap() = Some(Ok(LoadedModel {
            url: "empty.ifc".to_string(),
            layout,
            classification,
        }));
        app.update();

        let world = app.world();
        match world.resource::<ViewerStatus>() {
            ViewerStatus::Warning(message) => assert!(message.contains("empty.ifc"), "{}", message),
            other => panic!("expected a warning, got {:?}", other),
        }
        assert!(world.get_resource::<ModelSession>().is_none());
        assert!(world.resource::<FragmentHandles>().is_empty());
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 0);
    }

    #[test]
    fn test_loaded_model_is_spawned_framed_and_styled() {
        let model = ModelGeometry {
            elements: vec![quad(1, "IFCWALL", 0.0), quad(2, "IFCBEAM", 19.0)],
        };
        let layout = FragmentLayout::build(model, &BatchingConfig::default());
        let classification = Classification::by_entity(&layout);

        let mut app = scene_app(ViewerSettings::default());
        app.add_systems(
            Update,
            (
                process_pending_load,
                apply_initial_styles.run_if(resource_added::<ModelSession>),
            )
                .chain(),
        );
        *app.world().resource::<PendingLoad>().result.lock().unwrap() = Some(Ok(LoadedModel {
            url: "model.ifc".to_string(),
            layout,
            classification,
        }));
        app.update();

        let world = app.world();
        assert_eq!(
            *world.resource::<ViewerStatus>(),
            ViewerStatus::Ready {
                categories: 2,
                fragments: 1
            }
        );

        let session = &world.resource::<ModelSession>().session;
        assert_eq!(session.category_count(), 2);
        assert_eq!(session.view("IFCWALL").map(|v| v.opacity), Some(0.4));

        // 20 units wide, framed down to the default target size of 10
        let handles = world.resource::<FragmentHandles>();
        let root = handles.root.unwrap();
        assert_eq!(world.get::<Transform>(root).unwrap().scale, Vec3::splat(0.5));
        assert_eq!(handles.len(), 1);
    }
}
