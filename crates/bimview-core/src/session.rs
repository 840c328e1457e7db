//! Viewer session - the state of one loaded model
//!
//! Owns the fragment layout, the classification and one [`CategoryCell`] per
//! category. The UI reads [`ViewerSession::views`] and sends edits through
//! [`ViewerSession::input`]; the session keeps the scene in step.

use std::collections::BTreeMap;

use crate::category::{CategoryStyle, CategoryTable};
use crate::color::Rgb;
use crate::controller::{FragmentBackend, Hider, MaterialController};
use crate::fragment::{Classification, FragmentLayout};
use crate::state::{CategoryCell, CategoryEffect, CategoryInput, CategoryView};

pub struct ViewerSession {
    layout: FragmentLayout,
    classification: Classification,
    cells: BTreeMap<String, CategoryCell>,
    controller: MaterialController,
    hider: Hider,
}

impl ViewerSession {
    /// Create a session with one cell per classified category.
    ///
    /// Categories missing from `table` fall back to opaque white.
    pub fn new(
        layout: FragmentLayout,
        classification: Classification,
        table: &CategoryTable,
        restore_opacity: f32,
    ) -> Self {
        let fallback = CategoryStyle {
            color: Rgb::WHITE,
            opacity: 1.0,
            visible: true,
        };

        let cells = classification
            .names()
            .map(|name| {
                let style = table.get(name).copied().unwrap_or_else(|| {
                    tracing::warn!("No style for category {}, using fallback", name);
                    fallback
                });
                (name.to_string(), CategoryCell::new(&style, restore_opacity))
            })
            .collect();

        Self {
            layout,
            classification,
            cells,
            controller: MaterialController::new(),
            hider: Hider,
        }
    }

    /// Apply every category's material, then its visibility
    pub fn initial_pass<B>(&mut self, backend: &mut B)
    where
        B: FragmentBackend + ?Sized,
    {
        for (name, cell) in &self.cells {
            let Some(found) = self.classification.find(name) else {
                continue;
            };
            self.controller
                .apply(backend, &self.layout, found, &cell.material());
            self.hider
                .set(backend, &self.layout, cell.is_visible(), found);
        }
        tracing::info!("Styled {} categories", self.cells.len());
    }

    /// Route a UI edit to a category. Returns the updated view, or `None`
    /// for an unknown category.
    pub fn input<B>(&mut self, backend: &mut B, name: &str, input: CategoryInput) -> Option<CategoryView>
    where
        B: FragmentBackend + ?Sized,
    {
        let cell = self.cells.get_mut(name)?;
        let effect = cell.update(input);
        let view = cell.view();

        if !effect.is_empty() {
            tracing::debug!("{}: {:?} -> {:?}", name, input, effect);
            self.apply_effect(backend, name, effect);
        }
        Some(view)
    }

    fn apply_effect<B>(&mut self, backend: &mut B, name: &str, effect: CategoryEffect)
    where
        B: FragmentBackend + ?Sized,
    {
        let Some(found) = self.classification.find(name) else {
            return;
        };
        if let Some(material) = effect.material {
            self.controller.apply(backend, &self.layout, found, &material);
        }
        if let Some(visible) = effect.visibility {
            self.hider.set(backend, &self.layout, visible, found);
        }
    }

    /// UI rows in name order
    pub fn views(&self) -> impl Iterator<Item = (&str, CategoryView)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell.view()))
    }

    pub fn view(&self, name: &str) -> Option<CategoryView> {
        self.cells.get(name).map(CategoryCell::view)
    }

    pub fn layout(&self) -> &FragmentLayout {
        &self.layout
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn category_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::controller::tests::{mixed_model, Call, RecordingBackend};
    use crate::controller::MaterialSpec;
    use crate::fragment::FragmentId;
    use crate::query::ViewerQuery;

    fn session(query: &ViewerQuery) -> ViewerSession {
        let (layout, classes) = mixed_model();
        let config = ViewerConfig::default();
        let table = CategoryTable::build(classes.names(), query, &config);
        ViewerSession::new(layout, classes, &table, config.palette.restore_opacity)
    }

    #[test]
    fn test_one_row_per_category() {
        let session = session(&ViewerQuery::default());
        let names: Vec<&str> = session.views().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["IFCDOOR", "IFCSLAB", "IFCWALL"]);
        assert_eq!(session.category_count(), 3);
    }

    #[test]
    fn test_initial_pass_styles_and_hides() {
        let query = ViewerQuery::from_pairs([("visibleCategories", "IFCWALL")]);
        let mut session = session(&query);
        let mut backend = RecordingBackend::default();
        session.initial_pass(&mut backend);

        let calls = backend.take();
        let slab = MaterialSpec::new(Rgb::new(0xff, 0xa5, 0x00), 0.2);
        assert!(calls.contains(&Call::Material(FragmentId(0), slab)));
        assert!(calls.contains(&Call::FragmentVisible(FragmentId(0), false)));

        let wall_span = session.layout().fragments[1].items[&1];
        assert!(calls.contains(&Call::ItemsVisible(FragmentId(1), vec![wall_span], true)));
    }

    #[test]
    fn test_zero_opacity_hides_category() {
        let mut session = session(&ViewerQuery::default());
        let mut backend = RecordingBackend::default();
        session.initial_pass(&mut backend);
        backend.take();

        let view = session
            .input(&mut backend, "IFCSLAB", CategoryInput::SetOpacity(0.0))
            .unwrap();
        assert!(!view.checked);
        assert_eq!(view.opacity, 0.0);
        assert_eq!(backend.take(), vec![Call::FragmentVisible(FragmentId(0), false)]);
    }

    #[test]
    fn test_reenable_restores_material_then_shows() {
        let mut session = session(&ViewerQuery::default());
        let mut backend = RecordingBackend::default();
        session.initial_pass(&mut backend);

        session.input(&mut backend, "IFCSLAB", CategoryInput::SetOpacity(0.6));
        session.input(&mut backend, "IFCSLAB", CategoryInput::SetOpacity(0.0));
        backend.take();

        let view = session
            .input(&mut backend, "IFCSLAB", CategoryInput::SetVisible(true))
            .unwrap();
        assert_eq!(view.opacity, 0.6);
        // Material already matches the remembered opacity; only visibility changes
        assert_eq!(backend.take(), vec![Call::FragmentVisible(FragmentId(0), true)]);
    }

    #[test]
    fn test_color_edit_recolors_batched_items() {
        let mut session = session(&ViewerQuery::default());
        let mut backend = RecordingBackend::default();
        session.initial_pass(&mut backend);
        backend.take();

        let red = Rgb::new(255, 0, 0);
        session.input(&mut backend, "IFCDOOR", CategoryInput::SetColor(red));

        let door_span = session.layout().fragments[1].items[&3];
        assert_eq!(
            backend.take(),
            vec![Call::ItemColors(FragmentId(1), vec![door_span], red, 0.8)]
        );
        assert_eq!(session.view("IFCDOOR").unwrap().color, red);
    }

    #[test]
    fn test_unknown_category_is_ignored() {
        let mut session = session(&ViewerQuery::default());
        let mut backend = RecordingBackend::default();
        assert!(session
            .input(&mut backend, "IFCROOF", CategoryInput::SetVisible(false))
            .is_none());
        assert!(backend.calls.is_empty());
    }
}
