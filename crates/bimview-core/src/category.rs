//! Category table - resolved color, opacity and start visibility per category
//!
//! Three sources feed the table, highest precedence first:
//! 1. overrides from the page query (`categoryColors`, `categoryOpacity`)
//! 2. fixed entries from the viewer config
//! 3. a generated palette with evenly spaced hues

use std::collections::BTreeMap;

use crate::color::Rgb;
use crate::config::ViewerConfig;
use crate::query::ViewerQuery;

/// Resolved styling of one category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryStyle {
    pub color: Rgb,
    /// Always within `0..=1`
    pub opacity: f32,
    pub visible: bool,
}

/// One entry per category of the loaded model, in name order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable {
    entries: BTreeMap<String, CategoryStyle>,
}

impl CategoryTable {
    /// Resolve the style of every category in `names`.
    ///
    /// Duplicate names collapse into one entry.
    pub fn build<'a, I>(names: I, query: &ViewerQuery, config: &ViewerConfig) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names: Vec<&str> = names.into_iter().collect();
        names.sort_unstable();
        names.dedup();

        let generated: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| config.category(name).is_none())
            .collect();
        let palette = &config.palette;
        let hue_step = 1.0 / generated.len().max(1) as f32;

        let mut entries = BTreeMap::new();
        for name in names {
            let fixed = config.category(name);

            let (base_color, base_opacity) = match fixed {
                Some(entry) => (entry.color, entry.opacity),
                None => {
                    let index = generated.iter().position(|g| *g == name).unwrap_or(0);
                    let hue = index as f32 * hue_step;
                    (
                        Rgb::from_hsl(hue, palette.saturation, palette.lightness),
                        palette.opacity,
                    )
                }
            };

            let color = query.color_overrides.get(name).copied().unwrap_or(base_color);
            let opacity = query
                .opacity_overrides
                .get(name)
                .copied()
                .unwrap_or(base_opacity)
                .clamp(0.0, 1.0);

            let fixed_hidden = fixed.is_some_and(|entry| entry.opacity == 0.0);
            let visible = if fixed_hidden {
                false
            } else if let Some(allowed) = &query.visible_categories {
                allowed.iter().any(|a| a == name)
            } else {
                true
            };

            entries.insert(
                name.to_string(),
                CategoryStyle {
                    color,
                    opacity,
                    visible: visible && opacity > 0.0,
                },
            );
        }

        tracing::debug!("Resolved styles for {} categories", entries.len());
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&CategoryStyle> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryStyle)> {
        self.entries.iter().map(|(name, style)| (name.as_str(), style))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
