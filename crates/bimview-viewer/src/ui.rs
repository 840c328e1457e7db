//! Category panel using bevy_egui

use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use bimview_core::{CategoryInput, CategoryView, Rgb};
use bimview_scene::{BevyFragments, HelperSettings, UiLayout};

use crate::loader::ModelSession;
use crate::status::ViewerStatus;

/// Grouped system parameters for the panel system
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub ui_layout: ResMut<'w, UiLayout>,
    pub status: Res<'w, ViewerStatus>,
    pub model: Option<ResMut<'w, ModelSession>>,
    pub fragments: BevyFragments<'w, 's>,
    pub helpers: ResMut<'w, HelperSettings>,
    pub diagnostics: Res<'w, DiagnosticsStore>,
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, update_ui_layout)
            // bevy_egui 0.38+ draws in EguiPrimaryContextPass
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Widget values of one row after this frame's interaction
#[derive(Debug, Clone, Copy, PartialEq)]
struct RowEdit {
    checked: bool,
    color: [u8; 3],
    opacity: f32,
}

impl RowEdit {
    fn from_view(view: &CategoryView) -> Self {
        Self {
            checked: view.checked,
            color: view.color.to_array(),
            opacity: view.opacity,
        }
    }

    /// Inputs for every widget the user moved away from `view`
    fn inputs(&self, view: &CategoryView) -> Vec<CategoryInput> {
        let mut inputs = Vec::new();
        if self.checked != view.checked {
            inputs.push(CategoryInput::SetVisible(self.checked));
        }
        if self.color != view.color.to_array() {
            inputs.push(CategoryInput::SetColor(Rgb::from_array(self.color)));
        }
        if self.opacity != view.opacity {
            inputs.push(CategoryInput::SetOpacity(self.opacity));
        }
        inputs
    }
}

/// Update UI layout based on window size
fn update_ui_layout(windows: Query<&Window>, mut ui_layout: ResMut<UiLayout>) {
    if let Ok(window) = windows.single() {
        let width = window.width();
        let height = window.height();

        if (ui_layout.screen_width - width).abs() > 1.0 || (ui_layout.screen_height - height).abs() > 1.0 {
            ui_layout.update_for_screen(width, height);
        }
    }
}

fn ui_system(mut params: UiParams) {
    let is_mobile = params.ui_layout.is_mobile;
    let panel_width = params.ui_layout.panel_width();

    let Ok(ctx) = params.contexts.ctx_mut() else { return };

    // Mobile: panel toggle at the bottom, away from curved screen edges
    if is_mobile {
        egui::TopBottomPanel::bottom("mobile_toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let menu_text = if params.ui_layout.show_panel { "☰ Categories" } else { "☰" };
                if ui.button(egui::RichText::new(menu_text).size(16.0)).clicked() {
                    params.ui_layout.show_panel = !params.ui_layout.show_panel;
                }
            });
        });
    }

    if is_mobile && !params.ui_layout.show_panel {
        return;
    }

    egui::SidePanel::left("category_panel")
        .default_width(panel_width)
        .resizable(!is_mobile)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Category Visibility");
                if is_mobile {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("✕").clicked() {
                            params.ui_layout.show_panel = false;
                        }
                    });
                }
            });
            ui.separator();

            egui::ScrollArea::vertical().auto_shrink([false, true]).show(ui, |ui| {
                match params.model.as_mut() {
                    Some(model) => {
                        ui.label(egui::RichText::new(&model.url).small().weak());
                        egui::CollapsingHeader::new("Categories")
                            .default_open(false)
                            .show(ui, |ui| {
                                category_rows(ui, model, &mut params.fragments);
                            });
                    }
                    None => {
                        ui.weak("No model loaded");
                    }
                }
            });

            ui.separator();
            helper_toggles(ui, &mut params.helpers);
            ui.label(params.status.status_line());
            if let Some(fps) = params
                .diagnostics
                .get(&FrameTimeDiagnosticsPlugin::FPS)
                .and_then(|fps| fps.smoothed())
            {
                ui.small(format!("{:.0} FPS", fps));
            }
        });
}

/// Grid and axes checkboxes; the resource is only touched on a change
fn helper_toggles(ui: &mut egui::Ui, helpers: &mut ResMut<HelperSettings>) {
    let mut show_grid = helpers.show_grid;
    let mut show_axes = helpers.show_axes;
    ui.horizontal(|ui| {
        ui.checkbox(&mut show_grid, "Grid");
        ui.checkbox(&mut show_axes, "Axes");
    });
    if show_grid != helpers.show_grid {
        helpers.show_grid = show_grid;
    }
    if show_axes != helpers.show_axes {
        helpers.show_axes = show_axes;
    }
}

/// One checkbox, color button and opacity slider per category
fn category_rows(ui: &mut egui::Ui, model: &mut ModelSession, fragments: &mut BevyFragments) {
    let rows: Vec<(String, CategoryView)> = model
        .session
        .views()
        .map(|(name, view)| (name.to_string(), view))
        .collect();

    let mut edits: Vec<(String, Vec<CategoryInput>)> = Vec::new();

    egui::Grid::new("category_grid")
        .num_columns(3)
        .striped(true)
        .show(ui, |ui| {
            ui.strong("Category");
            ui.strong("Color");
            ui.strong("Opacity");
            ui.end_row();

            for (name, view) in &rows {
                let mut edit = RowEdit::from_view(view);
                ui.checkbox(&mut edit.checked, name.as_str());
                ui.color_edit_button_srgb(&mut edit.color);
                ui.add(egui::Slider::new(&mut edit.opacity, 0.0..=1.0).step_by(0.01));
                ui.end_row();

                let inputs = edit.inputs(view);
                if !inputs.is_empty() {
                    edits.push((name.clone(), inputs));
                }
            }
        });

    for (name, inputs) in edits {
        for input in inputs {
            model.session.input(fragments, &name, input);
        }
    }
}
