//! Load status and the messages written into the page

use bevy::prelude::*;

/// Id of the element that hosts the canvas and the page messages
pub const CONTAINER_ID: &str = "container";

/// Where the viewer is in its one-shot load sequence
#[derive(Debug, Clone, Default, PartialEq, Resource)]
pub enum ViewerStatus {
    /// Startup has not read the page query yet
    #[default]
    Idle,
    /// The page was opened without a model URL
    NoInput,
    Loading {
        url: String,
    },
    Ready {
        categories: usize,
        fragments: usize,
    },
    /// Loaded, but with nothing sensible to frame
    Warning(String),
    Failed(String),
}

/// A message element appended to the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMessage {
    pub tag: &'static str,
    pub class: &'static str,
    pub text: String,
}

impl ViewerStatus {
    /// One-line summary for the panel footer
    pub fn status_line(&self) -> String {
        match self {
            ViewerStatus::Idle => "Starting".to_string(),
            ViewerStatus::NoInput => "No model".to_string(),
            ViewerStatus::Loading { url } => format!("Loading {}", url),
            ViewerStatus::Ready {
                categories,
                fragments,
            } => format!("{} categories, {} fragments", categories, fragments),
            ViewerStatus::Warning(message) => format!("Warning: {}", message),
            ViewerStatus::Failed(message) => format!("Error: {}", message),
        }
    }

    pub fn page_message(&self) -> Option<PageMessage> {
        match self {
            ViewerStatus::NoInput => Some(PageMessage {
                tag: "h3",
                class: "viewer-info",
                text: "No IFC file URL provided.".to_string(),
            }),
            ViewerStatus::Warning(message) => Some(PageMessage {
                tag: "p",
                class: "viewer-warning",
                text: message.clone(),
            }),
            ViewerStatus::Failed(message) => Some(PageMessage {
                tag: "p",
                class: "viewer-error",
                text: format!("Error loading IFC model: {}", message),
            }),
            _ => None,
        }
    }
}

/// Plugin that mirrors status changes into the page
pub struct StatusPlugin;

impl Plugin for StatusPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewerStatus>()
            .add_systems(Update, report_status);
    }
}

fn report_status(status: Res<ViewerStatus>) {
    if !status.is_changed() {
        return;
    }

    match status.as_ref() {
        ViewerStatus::Failed(message) => tracing::error!("{}", message),
        ViewerStatus::Warning(message) => tracing::warn!("{}", message),
        other => tracing::info!("Viewer status: {}", other.status_line()),
    }

    if let Some(message) = status.page_message() {
        show_page_message(&message);
    }
}

#[cfg(target_arch = "wasm32")]
fn show_page_message(message: &PageMessage) {
    if let Err(e) = append_to_container(message) {
        tracing::warn!("Could not show page message: {:?}", e);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn show_page_message(message: &PageMessage) {
    tracing::debug!(
        "Page message for #{} <{} class=\"{}\">: {}",
        CONTAINER_ID,
        message.tag,
        message.class,
        message.text
    );
}

#[cfg(target_arch = "wasm32")]
fn append_to_container(message: &PageMessage) -> Result<(), wasm_bindgen::JsValue> {
    use wasm_bindgen::JsValue;

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let container = document
        .get_element_by_id(CONTAINER_ID)
        .ok_or_else(|| JsValue::from_str("No container element"))?;

    let element = document.create_element(message.tag)?;
    element.set_class_name(message.class);
    element.set_text_content(Some(&message.text));
    container.append_child(&element)?;
    Ok(())
}
