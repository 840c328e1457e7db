//! Material and visibility control over rendered fragments
//!
//! The controller knows which elements of which fragment belong to a
//! category; the [`FragmentBackend`] knows how to change what is on screen.
//! The Bevy scene implements the backend for real meshes, tests implement
//! it with a call recorder.

use std::collections::BTreeMap;

use crate::color::Rgb;
use crate::fragment::{ExpressId, FragmentId, FragmentIdMap, FragmentKind, FragmentLayout, ItemSpan};

/// Material assigned to a category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialSpec {
    pub color: Rgb,
    pub opacity: f32,
    pub transparent: bool,
}

impl MaterialSpec {
    /// Material for a color and opacity. Opacity is clamped to `0..=1`;
    /// anything below 1 is transparent.
    pub fn new(color: Rgb, opacity: f32) -> Self {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self {
            color,
            opacity,
            transparent: opacity < 1.0,
        }
    }

    /// Shared material of a batched fragment; color and opacity come from vertex colors
    pub fn shared(transparent: bool) -> Self {
        Self {
            color: Rgb::WHITE,
            opacity: 1.0,
            transparent,
        }
    }
}

/// Mutations a renderer has to support for the controller and hider
pub trait FragmentBackend {
    /// Replace the material of a fragment
    fn set_material(&mut self, fragment: FragmentId, material: &MaterialSpec);

    /// Overwrite the vertex colors of the given items (alpha = `opacity`)
    fn set_item_colors(&mut self, fragment: FragmentId, spans: &[ItemSpan], color: Rgb, opacity: f32);

    /// Show or hide a whole fragment
    fn set_fragment_visible(&mut self, fragment: FragmentId, visible: bool);

    /// Show or hide single items of a batched fragment
    fn set_items_visible(&mut self, fragment: FragmentId, spans: &[ItemSpan], visible: bool);
}

/// Applies category materials to fragments
#[derive(Debug, Default)]
pub struct MaterialController {
    /// Last spec applied to each plain fragment
    plain: BTreeMap<FragmentId, MaterialSpec>,
    /// Last spec applied to each item of a batched fragment
    batched: BTreeMap<FragmentId, BTreeMap<ExpressId, MaterialSpec>>,
    /// Transparency of each batched fragment's shared material
    shared: BTreeMap<FragmentId, bool>,
}

impl MaterialController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `spec` to every element in `found`.
    ///
    /// Plain fragments get the material wholesale. Inside batched fragments
    /// only the listed items are recolored; the shared material turns
    /// transparent when any item in the batch is.
    pub fn apply<B>(&mut self, backend: &mut B, layout: &FragmentLayout, found: &FragmentIdMap, spec: &MaterialSpec)
    where
        B: FragmentBackend + ?Sized,
    {
        for (fragment_id, items) in found {
            let Some(fragment) = layout.get(*fragment_id) else {
                tracing::warn!("Unknown fragment {:?} in category selection", fragment_id);
                continue;
            };

            match fragment.kind {
                FragmentKind::Plain => {
                    if self.plain.get(fragment_id) == Some(spec) {
                        continue;
                    }
                    backend.set_material(*fragment_id, spec);
                    self.plain.insert(*fragment_id, *spec);
                }
                FragmentKind::Batched => {
                    let applied = self.batched.entry(*fragment_id).or_default();
                    let changed: Vec<ExpressId> = items
                        .iter()
                        .copied()
                        .filter(|id| fragment.items.contains_key(id))
                        .filter(|id| applied.get(id) != Some(spec))
                        .collect();
                    if changed.is_empty() {
                        continue;
                    }

                    let spans = fragment.spans(&changed);
                    backend.set_item_colors(*fragment_id, &spans, spec.color, spec.opacity);
                    for id in changed {
                        applied.insert(id, *spec);
                    }

                    let transparent = applied.values().any(|s| s.transparent);
                    if self.shared.get(fragment_id) != Some(&transparent) {
                        backend.set_material(*fragment_id, &MaterialSpec::shared(transparent));
                        self.shared.insert(*fragment_id, transparent);
                    }
                }
            }
        }
    }
}

/// Toggles visibility of category selections
#[derive(Debug, Default, Clone, Copy)]
pub struct Hider;

impl Hider {
    pub fn set<B>(&self, backend: &mut B, layout: &FragmentLayout, visible: bool, found: &FragmentIdMap)
    where
        B: FragmentBackend + ?Sized,
    {
        for (fragment_id, items) in found {
            let Some(fragment) = layout.get(*fragment_id) else {
                continue;
            };
            match fragment.kind {
                FragmentKind::Plain => backend.set_fragment_visible(*fragment_id, visible),
                FragmentKind::Batched => {
                    let spans = fragment.spans(items);
                    if !spans.is_empty() {
                        backend.set_items_visible(*fragment_id, &spans, visible);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fragment::tests::{element_with_vertices, small_batching, triangle};
    use crate::fragment::{Classification, ModelGeometry};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Material(FragmentId, MaterialSpec),
        ItemColors(FragmentId, Vec<ItemSpan>, Rgb, f32),
        FragmentVisible(FragmentId, bool),
        ItemsVisible(FragmentId, Vec<ItemSpan>, bool),
    }

    /// Backend that records every call
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBackend {
        pub calls: Vec<Call>,
    }

    impl RecordingBackend {
        pub fn take(&mut self) -> Vec<Call> {
            std::mem::take(&mut self.calls)
        }
    }

    impl FragmentBackend for RecordingBackend {
        fn set_material(&mut self, fragment: FragmentId, material: &MaterialSpec) {
            self.calls.push(Call::Material(fragment, *material));
        }

        fn set_item_colors(&mut self, fragment: FragmentId, spans: &[ItemSpan], color: Rgb, opacity: f32) {
            self.calls.push(Call::ItemColors(fragment, spans.to_vec(), color, opacity));
        }

        fn set_fragment_visible(&mut self, fragment: FragmentId, visible: bool) {
            self.calls.push(Call::FragmentVisible(fragment, visible));
        }

        fn set_items_visible(&mut self, fragment: FragmentId, spans: &[ItemSpan], visible: bool) {
            self.calls.push(Call::ItemsVisible(fragment, spans.to_vec(), visible));
        }
    }

    /// Fragment 0: plain slab #2. Fragment 1: batch with wall #1 and door #3.
    pub(crate) fn mixed_model() -> (FragmentLayout, Classification) {
        let model = ModelGeometry {
            elements: vec![
                triangle(1, "IFCWALL", 0.0),
                element_with_vertices(2, "IFCSLAB", 5),
                triangle(3, "IFCDOOR", 4.0),
            ],
        };
        let layout = FragmentLayout::build(model, &small_batching());
        let classes = Classification::by_entity(&layout);
        (layout, classes)
    }

    #[test]
    fn test_transparency_follows_opacity() {
        assert!(MaterialSpec::new(Rgb::WHITE, 0.5).transparent);
        assert!(!MaterialSpec::new(Rgb::WHITE, 1.0).transparent);
        assert_eq!(MaterialSpec::new(Rgb::WHITE, 3.0).opacity, 1.0);
        assert_eq!(MaterialSpec::new(Rgb::WHITE, f32::NAN).opacity, 1.0);
    }

    #[test]
    fn test_plain_fragment_gets_material() {
        let (layout, classes) = mixed_model();
        let mut backend = RecordingBackend::default();
        let mut controller = MaterialController::new();

        let spec = MaterialSpec::new(Rgb::new(255, 165, 0), 0.2);
        controller.apply(&mut backend, &layout, classes.find("IFCSLAB").unwrap(), &spec);

        assert_eq!(backend.take(), vec![Call::Material(FragmentId(0), spec)]);
    }

    #[test]
    fn test_batched_fragment_recolors_only_category_items() {
        let (layout, classes) = mixed_model();
        let mut backend = RecordingBackend::default();
        let mut controller = MaterialController::new();

        let spec = MaterialSpec::new(Rgb::new(255, 105, 180), 0.4);
        controller.apply(&mut backend, &layout, classes.find("IFCWALL").unwrap(), &spec);

        let wall_span = layout.fragments[1].items[&1];
        assert_eq!(
            backend.take(),
            vec![
                Call::ItemColors(FragmentId(1), vec![wall_span], spec.color, 0.4),
                Call::Material(FragmentId(1), MaterialSpec::shared(true)),
            ]
        );
    }

    #[test]
    fn test_shared_material_stays_transparent_while_any_item_is() {
        let (layout, classes) = mixed_model();
        let mut backend = RecordingBackend::default();
        let mut controller = MaterialController::new();
        let walls = classes.find("IFCWALL").unwrap();
        let doors = classes.find("IFCDOOR").unwrap();

        controller.apply(&mut backend, &layout, walls, &MaterialSpec::new(Rgb::WHITE, 0.5));
        controller.apply(&mut backend, &layout, doors, &MaterialSpec::new(Rgb::WHITE, 1.0));
        // Door is opaque but the wall is not; the shared material is unchanged
        assert!(!backend
            .take()
            .iter()
            .any(|c| *c == Call::Material(FragmentId(1), MaterialSpec::shared(false))));

        controller.apply(&mut backend, &layout, walls, &MaterialSpec::new(Rgb::WHITE, 1.0));
        assert_eq!(
            backend.take().last(),
            Some(&Call::Material(FragmentId(1), MaterialSpec::shared(false)))
        );
    }

    #[test]
    fn test_reapplying_same_spec_is_a_no_op() {
        let (layout, classes) = mixed_model();
        let mut backend = RecordingBackend::default();
        let mut controller = MaterialController::new();
        let spec = MaterialSpec::new(Rgb::new(1, 2, 3), 0.7);

        for name in ["IFCWALL", "IFCSLAB"] {
            controller.apply(&mut backend, &layout, classes.find(name).unwrap(), &spec);
        }
        assert!(!backend.take().is_empty());

        for name in ["IFCWALL", "IFCSLAB"] {
            controller.apply(&mut backend, &layout, classes.find(name).unwrap(), &spec);
        }
        assert!(backend.take().is_empty());
    }

    #[test]
    fn test_hider_toggles_plain_and_batched() {
        let (layout, classes) = mixed_model();
        let mut backend = RecordingBackend::default();

        Hider.set(&mut backend, &layout, false, classes.find("IFCSLAB").unwrap());
        Hider.set(&mut backend, &layout, false, classes.find("IFCDOOR").unwrap());

        let door_span = layout.fragments[1].items[&3];
        assert_eq!(
            backend.take(),
            vec![
                Call::FragmentVisible(FragmentId(0), false),
                Call::ItemsVisible(FragmentId(1), vec![door_span], false),
            ]
        );
    }

    #[test]
    fn test_unknown_fragments_are_skipped() {
        let (layout, _) = mixed_model();
        let mut backend = RecordingBackend::default();
        let mut found = FragmentIdMap::new();
        found.entry(FragmentId(42)).or_default().insert(7);

        MaterialController::new().apply(&mut backend, &layout, &found, &MaterialSpec::new(Rgb::WHITE, 1.0));
        Hider.set(&mut backend, &layout, true, &found);
        assert!(backend.calls.is_empty());
    }
}
