//! Shared UI state

use bevy::prelude::*;

/// UI layout settings for responsive design
#[derive(Debug, Clone, Resource)]
pub struct UiLayout {
    /// Whether the category panel is visible
    pub show_panel: bool,
    pub screen_width: f32,
    pub screen_height: f32,
    /// Whether we're on a small screen (mobile/tablet)
    pub is_mobile: bool,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            show_panel: true,
            screen_width: 1920.0,
            screen_height: 1080.0,
            is_mobile: false,
        }
    }
}

impl UiLayout {
    /// Update layout based on screen dimensions
    pub fn update_for_screen(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;

        let was_mobile = self.is_mobile;
        self.is_mobile = width < 800.0 || (width < height && width < 600.0);

        // Small screens start with the panel folded away
        if self.is_mobile && !was_mobile {
            self.show_panel = false;
        }
    }

    /// Width of the category panel
    pub fn panel_width(&self) -> f32 {
        if self.is_mobile {
            (self.screen_width * 0.85).min(320.0)
        } else {
            300.0
        }
    }
}
