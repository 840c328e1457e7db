//! Page query parameters
//!
//! The viewer reads its whole configuration from the address bar:
//!
//! - `ifcUrl` (or the older `ifc_url`): model file to load
//! - `visibleCategories`: `IFCWALL,IFCSLAB`
//! - `categoryColors`: `IFCWALL:ff0000,IFCSLAB:00ff00`
//! - `categoryOpacity`: `IFCWALL:0.5,IFCSLAB:0.8`
//!
//! Malformed list entries are dropped without surfacing an error.

use std::collections::BTreeMap;

use crate::color::Rgb;

pub const MODEL_URL_KEYS: [&str; 2] = ["ifcUrl", "ifc_url"];
pub const VISIBLE_CATEGORIES_KEY: &str = "visibleCategories";
pub const CATEGORY_COLORS_KEY: &str = "categoryColors";
pub const CATEGORY_OPACITY_KEY: &str = "categoryOpacity";

/// Display options read once at page load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerQuery {
    /// Model source; `None` when missing or blank
    pub model_url: Option<String>,
    /// Allow-list of categories that start visible; `None` when the parameter is absent or blank
    pub visible_categories: Option<Vec<String>>,
    pub color_overrides: BTreeMap<String, Rgb>,
    pub opacity_overrides: BTreeMap<String, f32>,
}

impl ViewerQuery {
    /// Build from a parameter lookup (e.g. `URLSearchParams::get`).
    pub fn from_lookup<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let model_url = MODEL_URL_KEYS
            .into_iter()
            .filter_map(|key| get(key))
            .map(|url| url.trim().to_string())
            .find(|url| !url.is_empty());

        Self {
            model_url,
            visible_categories: get(VISIBLE_CATEGORIES_KEY)
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| parse_category_list(&raw)),
            color_overrides: get(CATEGORY_COLORS_KEY)
                .map(|raw| parse_color_overrides(&raw))
                .unwrap_or_default(),
            opacity_overrides: get(CATEGORY_OPACITY_KEY)
                .map(|raw| parse_opacity_overrides(&raw))
                .unwrap_or_default(),
        }
    }

    /// Build from already-decoded key/value pairs. The first occurrence of a key wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params: BTreeMap<String, String> = BTreeMap::new();
        for (key, value) in pairs {
            params
                .entry(key.as_ref().to_string())
                .or_insert_with(|| value.as_ref().to_string());
        }
        Self::from_lookup(|key| params.get(key).cloned())
    }

    /// Whether the page was opened without a model to show.
    pub fn is_empty(&self) -> bool {
        self.model_url.is_none()
    }
}

/// `A, B,,C` -> `["A", "B", "C"]`
pub fn parse_category_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `Name:value` pairs; entries without a name or value are dropped.
fn split_pairs(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split(',').filter_map(|pair| {
        let mut parts = pair.split(':');
        let name = parts.next()?.trim();
        let value = parts.next()?.trim();
        if name.is_empty() || value.is_empty() {
            None
        } else {
            Some((name, value))
        }
    })
}

/// Parse `Name:RRGGBB` pairs. Only bare 6-digit hex values are accepted.
pub fn parse_color_overrides(raw: &str) -> BTreeMap<String, Rgb> {
    let mut overrides = BTreeMap::new();
    for (name, hex) in split_pairs(raw) {
        if hex.starts_with('#') {
            tracing::debug!("Ignoring color override for {}: {:?}", name, hex);
            continue;
        }
        match Rgb::from_hex(hex) {
            Ok(color) => {
                overrides.insert(name.to_string(), color);
            }
            Err(e) => tracing::debug!("Ignoring color override for {}: {}", name, e),
        }
    }
    overrides
}

/// Parse `Name:float` pairs. Values must be finite numbers.
pub fn parse_opacity_overrides(raw: &str) -> BTreeMap<String, f32> {
    let mut overrides = BTreeMap::new();
    for (name, value) in split_pairs(raw) {
        match value.parse::<f32>() {
            Ok(opacity) if opacity.is_finite() => {
                overrides.insert(name.to_string(), opacity);
            }
            _ => tracing::debug!("Ignoring opacity override for {}: {:?}", name, value),
        }
    }
    overrides
}
