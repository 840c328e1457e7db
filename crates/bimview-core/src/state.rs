//! Per-category UI state
//!
//! Checkbox, color picker and opacity slider of a category are views of one
//! [`CategoryCell`]. Widgets never hold state of their own: they render
//! [`CategoryCell::view`] and feed user input back through
//! [`CategoryCell::update`], which reports what has to change in the scene.

use crate::category::CategoryStyle;
use crate::color::Rgb;
use crate::controller::MaterialSpec;

/// A user edit of one category
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CategoryInput {
    SetVisible(bool),
    SetOpacity(f32),
    SetColor(Rgb),
}

/// What the widgets display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryView {
    pub checked: bool,
    pub color: Rgb,
    /// Zero whenever unchecked
    pub opacity: f32,
}

/// Scene changes caused by an input
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryEffect {
    pub visibility: Option<bool>,
    pub material: Option<MaterialSpec>,
}

impl CategoryEffect {
    pub fn is_empty(&self) -> bool {
        self.visibility.is_none() && self.material.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryCell {
    color: Rgb,
    /// Last opacity above zero; shown again when the category is switched back on
    opacity: f32,
    visible: bool,
}

impl CategoryCell {
    /// Cell for a resolved style. A style at opacity 0 starts hidden and
    /// restores to `restore_opacity`.
    pub fn new(style: &CategoryStyle, restore_opacity: f32) -> Self {
        let opacity = if style.opacity > 0.0 {
            style.opacity
        } else {
            restore_opacity
        };
        Self {
            color: style.color,
            opacity,
            visible: style.visible && style.opacity > 0.0,
        }
    }

    pub fn view(&self) -> CategoryView {
        CategoryView {
            checked: self.visible,
            color: self.color,
            opacity: if self.visible { self.opacity } else { 0.0 },
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Material for the current color and remembered opacity
    pub fn material(&self) -> MaterialSpec {
        MaterialSpec::new(self.color, self.opacity)
    }

    pub fn update(&mut self, input: CategoryInput) -> CategoryEffect {
        match input {
            CategoryInput::SetVisible(visible) => self.set_visible(visible),
            CategoryInput::SetOpacity(opacity) => self.set_opacity(opacity),
            CategoryInput::SetColor(color) => self.set_color(color),
        }
    }

    fn set_visible(&mut self, visible: bool) -> CategoryEffect {
        if visible == self.visible {
            return CategoryEffect::default();
        }
        self.visible = visible;

        if visible {
            CategoryEffect {
                visibility: Some(true),
                material: Some(self.material()),
            }
        } else {
            CategoryEffect {
                visibility: Some(false),
                material: None,
            }
        }
    }

    fn set_opacity(&mut self, opacity: f32) -> CategoryEffect {
        if !opacity.is_finite() {
            return CategoryEffect::default();
        }
        let opacity = opacity.clamp(0.0, 1.0);

        if opacity == 0.0 {
            return self.set_visible(false);
        }

        let unchanged = self.visible && opacity == self.opacity;
        self.opacity = opacity;
        if unchanged {
            return CategoryEffect::default();
        }

        let was_visible = self.visible;
        self.visible = true;
        CategoryEffect {
            visibility: (!was_visible).then_some(true),
            material: Some(self.material()),
        }
    }

    fn set_color(&mut self, color: Rgb) -> CategoryEffect {
        if color == self.color {
            return CategoryEffect::default();
        }
        self.color = color;
        CategoryEffect {
            visibility: None,
            material: Some(self.material()),
        }
    }
}
