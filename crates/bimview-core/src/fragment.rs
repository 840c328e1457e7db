//! Fragments - renderable geometry batches built from a parsed model
//!
//! A model is a flat list of element meshes. Large elements keep a mesh of
//! their own ([`FragmentKind::Plain`]); small ones are merged into shared
//! batches ([`FragmentKind::Batched`]) where every element owns a contiguous
//! span of vertices. The span index is what lets a single category be
//! recolored or hidden inside a batch.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::BatchingConfig;
use crate::framing::Aabb;

/// STEP entity id of a model element
pub type ExpressId = u32;

/// Triangle mesh of one model element, already in viewer (Y-up) space
#[derive(Debug, Clone, PartialEq)]
pub struct ElementGeometry {
    pub express_id: ExpressId,
    /// Upper-case IFC entity name, e.g. `IFCWALL`
    pub category: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl ElementGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }
}

/// All element meshes of a parsed model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelGeometry {
    pub elements: Vec<ElementGeometry>,
}

impl ModelGeometry {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// One element, one mesh, one material
    Plain,
    /// Many elements sharing a mesh and a material, colored per vertex
    Batched,
}

/// Vertex range of one element inside a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSpan {
    pub first_vertex: u32,
    pub vertex_count: u32,
}

impl ItemSpan {
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.first_vertex as usize;
        start..start + self.vertex_count as usize
    }
}

/// A renderable geometry batch
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub id: FragmentId,
    pub kind: FragmentKind,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    /// Element -> vertex span
    pub items: BTreeMap<ExpressId, ItemSpan>,
    /// Element -> category
    pub categories: BTreeMap<ExpressId, String>,
}

impl Fragment {
    fn new(id: FragmentId, kind: FragmentKind) -> Self {
        Self {
            id,
            kind,
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            items: BTreeMap::new(),
            categories: BTreeMap::new(),
        }
    }

    fn push(&mut self, element: ElementGeometry) {
        let base = self.positions.len() as u32;
        let vertex_count = element.positions.len() as u32;

        self.items.insert(
            element.express_id,
            ItemSpan {
                first_vertex: base,
                vertex_count,
            },
        );
        self.categories.insert(element.express_id, element.category);

        let mut normals = element.normals;
        // ifc-lite may leave normals empty for some representations
        normals.resize(element.positions.len(), [0.0, 1.0, 0.0]);

        self.positions.extend(element.positions);
        self.normals.extend(normals);
        self.indices.extend(element.indices.into_iter().map(|i| i + base));
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Spans of the given elements; unknown ids are skipped.
    pub fn spans<'a, I>(&'a self, items: I) -> Vec<ItemSpan>
    where
        I: IntoIterator<Item = &'a ExpressId>,
    {
        items
            .into_iter()
            .filter_map(|id| self.items.get(id).copied())
            .collect()
    }
}

/// Every fragment of a loaded model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentLayout {
    pub fragments: Vec<Fragment>,
}

impl FragmentLayout {
    /// Group element meshes into fragments.
    ///
    /// Elements keep their input order inside batches, so the same model
    /// always produces the same layout.
    pub fn build(model: ModelGeometry, config: &BatchingConfig) -> Self {
        let mut fragments: Vec<Fragment> = Vec::new();
        let mut batch: Option<Fragment> = None;

        for element in model.elements {
            if element.is_empty() {
                continue;
            }

            if element.vertex_count() > config.max_item_vertices {
                let id = FragmentId(fragments.len());
                let mut fragment = Fragment::new(id, FragmentKind::Plain);
                fragment.push(element);
                fragments.push(fragment);
                continue;
            }

            let full = batch
                .as_ref()
                .is_some_and(|b| b.vertex_count() + element.vertex_count() > config.max_batch_vertices);
            if full {
                if let Some(done) = batch.take() {
                    fragments.push(done);
                }
            }

            // Ids are assigned once all fragments are in their final order
            batch
                .get_or_insert_with(|| Fragment::new(FragmentId(0), FragmentKind::Batched))
                .push(element);
        }

        if let Some(done) = batch.take() {
            fragments.push(done);
        }

        for (index, fragment) in fragments.iter_mut().enumerate() {
            fragment.id = FragmentId(index);
        }

        tracing::debug!(
            "Built {} fragments ({} batched)",
            fragments.len(),
            fragments.iter().filter(|f| f.kind == FragmentKind::Batched).count()
        );

        Self { fragments }
    }

    pub fn get(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Number of elements across all fragments
    pub fn item_count(&self) -> usize {
        self.fragments.iter().map(|f| f.items.len()).sum()
    }

    /// Axis-aligned bounds of every vertex, `None` for an empty layout
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(
            self.fragments
                .iter()
                .flat_map(|f| f.positions.iter().copied()),
        )
    }
}

/// Fragment -> elements selection, the unit the controller and hider work on
pub type FragmentIdMap = BTreeMap<FragmentId, BTreeSet<ExpressId>>;

/// Elements grouped by category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    entities: BTreeMap<String, FragmentIdMap>,
}

impl Classification {
    /// Classify every element of the layout by its IFC entity type
    pub fn by_entity(layout: &FragmentLayout) -> Self {
        let mut entities: BTreeMap<String, FragmentIdMap> = BTreeMap::new();
        for fragment in &layout.fragments {
            for (express_id, category) in &fragment.categories {
                entities
                    .entry(category.clone())
                    .or_default()
                    .entry(fragment.id)
                    .or_default()
                    .insert(*express_id);
            }
        }
        Self { entities }
    }

    /// Fragments and elements of one category
    pub fn find(&self, category: &str) -> Option<&FragmentIdMap> {
        self.entities.get(category)
    }

    /// Category names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A unit triangle for element `id`, shifted along X
    pub(crate) fn triangle(id: ExpressId, category: &str, x: f32) -> ElementGeometry {
        ElementGeometry {
            express_id: id,
            category: category.to_string(),
            positions: vec![[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            indices: vec![0, 1, 2],
        }
    }

    /// An element with `n` vertices (fan-triangulated)
    pub(crate) fn element_with_vertices(id: ExpressId, category: &str, n: usize) -> ElementGeometry {
        let positions: Vec<[f32; 3]> = (0..n).map(|i| [i as f32, (i % 2) as f32, 0.0]).collect();
        let indices = (1..n.saturating_sub(1) as u32)
            .flat_map(|i| [0, i, i + 1])
            .collect();
        ElementGeometry {
            express_id: id,
            category: category.to_string(),
            normals: vec![[0.0, 0.0, 1.0]; n],
            positions,
            indices,
        }
    }

    pub(crate) fn small_batching() -> BatchingConfig {
        BatchingConfig {
            max_item_vertices: 4,
            max_batch_vertices: 6,
        }
    }

    #[test]
    fn test_small_elements_are_batched() {
        let model = ModelGeometry {
            elements: vec![triangle(10, "IFCWALL", 0.0), triangle(11, "IFCSLAB", 2.0)],
        };
        let layout = FragmentLayout::build(model, &small_batching());

        assert_eq!(layout.len(), 1);
        let fragment = &layout.fragments[0];
        assert_eq!(fragment.kind, FragmentKind::Batched);
        assert_eq!(fragment.vertex_count(), 6);
        assert_eq!(
            fragment.items[&11],
            ItemSpan {
                first_vertex: 3,
                vertex_count: 3
            }
        );
        // Indices of the second element are rebased
        assert_eq!(&fragment.indices[3..], &[3, 4, 5]);
    }

    #[test]
    fn test_large_elements_get_plain_fragments() {
        let model = ModelGeometry {
            elements: vec![
                triangle(1, "IFCWALL", 0.0),
                element_with_vertices(2, "IFCSLAB", 5),
                triangle(3, "IFCWALL", 4.0),
            ],
        };
        let layout = FragmentLayout::build(model, &small_batching());

        assert_eq!(layout.len(), 2);
        assert_eq!(layout.fragments[0].kind, FragmentKind::Plain);
        assert!(layout.fragments[0].items.contains_key(&2));
        assert_eq!(layout.fragments[1].kind, FragmentKind::Batched);
        assert_eq!(layout.fragments[1].items.len(), 2);
        // Ids follow final positions
        for (i, fragment) in layout.fragments.iter().enumerate() {
            assert_eq!(fragment.id, FragmentId(i));
        }
    }

    #[test]
    fn test_batches_split_at_vertex_limit() {
        let model = ModelGeometry {
            elements: vec![
                triangle(1, "IFCWALL", 0.0),
                triangle(2, "IFCWALL", 1.0),
                triangle(3, "IFCWALL", 2.0),
            ],
        };
        let layout = FragmentLayout::build(model, &small_batching());

        assert_eq!(layout.len(), 2);
        assert_eq!(layout.fragments[0].items.len(), 2);
        assert_eq!(layout.fragments[1].items.len(), 1);
        assert_eq!(layout.item_count(), 3);
    }

    #[test]
    fn test_empty_elements_are_dropped() {
        let mut empty = triangle(5, "IFCWALL", 0.0);
        empty.indices.clear();
        let layout = FragmentLayout::build(ModelGeometry { elements: vec![empty] }, &small_batching());
        assert!(layout.is_empty());
        assert!(layout.bounds().is_none());
    }

    #[test]
    fn test_classification_by_entity() {
        let model = ModelGeometry {
            elements: vec![
                triangle(1, "IFCWALL", 0.0),
                element_with_vertices(2, "IFCWALL", 5),
                triangle(3, "IFCSLAB", 4.0),
            ],
        };
        let layout = FragmentLayout::build(model, &small_batching());
        let classes = Classification::by_entity(&layout);

        assert_eq!(classes.names().collect::<Vec<_>>(), vec!["IFCSLAB", "IFCWALL"]);

        let walls = classes.find("IFCWALL").unwrap();
        assert_eq!(walls.len(), 2);
        assert!(walls[&FragmentId(0)].contains(&2));
        assert!(walls[&FragmentId(1)].contains(&1));
        assert!(!walls[&FragmentId(1)].contains(&3));

        assert!(classes.find("IFCDOOR").is_none());
    }

    #[test]
    fn test_bounds_cover_all_fragments() {
        let model = ModelGeometry {
            elements: vec![triangle(1, "IFCWALL", -2.0), element_with_vertices(2, "IFCSLAB", 6)],
        };
        let layout = FragmentLayout::build(model, &small_batching());
        let bounds = layout.bounds().unwrap();
        assert_eq!(bounds.min.to_array(), [-2.0, 0.0, 0.0]);
        assert_eq!(bounds.max.to_array(), [5.0, 1.0, 0.0]);
    }
}
