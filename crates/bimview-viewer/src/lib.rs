//! Bimview Viewer - IFC model viewer for the browser
//!
//! Reads the model URL and category options from the page query, loads the
//! model and offers per-category visibility, color and opacity controls.

mod app;
mod loader;
mod status;
mod ui;

use bimview_core::ViewerConfig;
use wasm_bindgen::prelude::*;

/// Viewer defaults, compiled into the module
const VIEWER_TOML: &str = include_str!("../viewer.toml");

/// Parse the embedded configuration, falling back to built-in defaults
fn load_config() -> (ViewerConfig, Option<String>) {
    match ViewerConfig::from_toml(VIEWER_TOML) {
        Ok(config) => (config, None),
        Err(e) => (ViewerConfig::default(), Some(e.to_string())),
    }
}

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    let (config, config_error) = load_config();
    let level = config.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(level)
            .build(),
    );

    if let Some(e) = config_error {
        tracing::warn!("Using default viewer config: {}", e);
    }

    app::run(config);
}
