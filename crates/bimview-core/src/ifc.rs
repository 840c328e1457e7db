//! IFC model extraction
//!
//! Parsing and tessellation are done by `ifc-lite`; this module walks the
//! products of a STEP file, collects one triangle mesh per element and moves
//! it from IFC's Z-up frame into the viewer's Y-up frame. Openings are cut
//! out of their host elements and not drawn on their own.

use ifc_lite_core::{build_entity_index, has_geometry_by_name, EntityDecoder, EntityScanner};
use ifc_lite_geometry::{calculate_normals, GeometryRouter, Mesh};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::fragment::{ElementGeometry, ModelGeometry};

/// STEP physical file magic
const STEP_HEADER: &str = "ISO-10303-21";

/// Coordinates beyond this get a relative-to-center shift before conversion to f32
const RTC_THRESHOLD: f64 = 10_000.0;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {status_text}")]
    Http { status: u16, status_text: String },
    #[error("Failed to read response body: {0}")]
    Body(String),
    #[error("Not an IFC file: {0}")]
    NotIfc(String),
    #[error("Failed to parse IFC model: {0}")]
    Parse(String),
}

/// Counters reported after extraction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    pub products: usize,
    pub without_representation: usize,
    pub failed: usize,
    pub empty: usize,
    pub meshes: usize,
    /// Hosts whose geometry had openings subtracted
    pub voided: usize,
}

/// Parse an IFC file into per-element meshes
pub fn parse_ifc(bytes: &[u8]) -> Result<ModelGeometry, LoadError> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| LoadError::NotIfc(format!("payload is not text: {}", e)))?;
    check_header(content)?;

    let (model, stats) = extract(content);
    tracing::info!(
        "Extracted {} meshes from {} products ({} without representation, {} failed, {} empty, {} with openings)",
        stats.meshes,
        stats.products,
        stats.without_representation,
        stats.failed,
        stats.empty,
        stats.voided
    );

    if stats.products > 0 && stats.meshes == 0 && stats.failed > 0 {
        return Err(LoadError::Parse(format!(
            "none of {} products produced geometry",
            stats.products
        )));
    }
    Ok(model)
}

fn check_header(content: &str) -> Result<(), LoadError> {
    let head = content.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with(STEP_HEADER) {
        Ok(())
    } else {
        let preview: String = head.chars().take(24).collect();
        Err(LoadError::NotIfc(format!("missing {} header, found {:?}", STEP_HEADER, preview)))
    }
}

/// Host element id -> opening element ids, from `IfcRelVoidsElement`
fn build_void_index(content: &str, decoder: &mut EntityDecoder) -> FxHashMap<u32, Vec<u32>> {
    let mut void_index: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
    let mut scanner = EntityScanner::new(content);

    while let Some((id, type_name, start, end)) = scanner.next_entity() {
        if type_name != "IFCRELVOIDSELEMENT" {
            continue;
        }
        // RelatingBuildingElement, RelatedOpeningElement
        match decoder.decode_at_with_id(id, start, end) {
            Ok(entity) => {
                if let (Some(host), Some(opening)) = (entity.get_ref(4), entity.get_ref(5)) {
                    void_index.entry(host).or_default().push(opening);
                }
            }
            Err(e) => tracing::debug!("#{} ({}) could not be decoded: {}", id, type_name, e),
        }
    }
    void_index
}

fn extract(content: &str) -> (ModelGeometry, ExtractStats) {
    let index = build_entity_index(content);
    let mut decoder = EntityDecoder::with_index(content, index);

    let void_index = build_void_index(content, &mut decoder);
    let openings: FxHashSet<u32> = void_index.values().flatten().copied().collect();
    if !void_index.is_empty() {
        tracing::debug!("{} hosts with {} openings", void_index.len(), openings.len());
    }

    let mut router = GeometryRouter::with_units(content, &mut decoder);

    let rtc = router.detect_rtc_offset_from_first_element(content, &mut decoder);
    if rtc.0.abs() > RTC_THRESHOLD || rtc.1.abs() > RTC_THRESHOLD || rtc.2.abs() > RTC_THRESHOLD {
        tracing::debug!("Shifting model by {:?}", rtc);
        router.set_rtc_offset(rtc);
    }

    let mut stats = ExtractStats::default();
    let mut elements = Vec::new();
    let mut scanner = EntityScanner::new(content);

    while let Some((id, type_name, start, end)) = scanner.next_entity() {
        if !has_geometry_by_name(type_name) || openings.contains(&id) {
            continue;
        }
        stats.products += 1;

        let entity = match decoder.decode_at_with_id(id, start, end) {
            Ok(entity) => entity,
            Err(e) => {
                tracing::debug!("#{} ({}) could not be decoded: {}", id, type_name, e);
                stats.failed += 1;
                continue;
            }
        };

        // IfcProduct.Representation
        let has_representation = entity.get(6).is_some_and(|a| !a.is_null());
        if !has_representation {
            stats.without_representation += 1;
            continue;
        }

        let result = if void_index.contains_key(&id) {
            stats.voided += 1;
            router.process_element_with_voids(&entity, &mut decoder, &void_index)
        } else {
            router.process_element(&entity, &mut decoder)
        };

        match result {
            Ok(mut mesh) => {
                if mesh.is_empty() {
                    stats.empty += 1;
                    continue;
                }
                if mesh.normals.len() != mesh.positions.len() {
                    calculate_normals(&mut mesh);
                }
                match element_from_mesh(id, type_name, &mesh) {
                    Some(element) => {
                        stats.meshes += 1;
                        elements.push(element);
                    }
                    None => stats.empty += 1,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to process #{} ({}): {}", id, type_name, e);
                stats.failed += 1;
            }
        }
    }

    (ModelGeometry { elements }, stats)
}

/// IFC (x, y, z) with Z up -> viewer (x, z, -y) with Y up
pub fn z_up_to_y_up(p: [f32; 3]) -> [f32; 3] {
    [p[0], p[2], -p[1]]
}

fn element_from_mesh(id: u32, type_name: &str, mesh: &Mesh) -> Option<ElementGeometry> {
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|c| z_up_to_y_up([c[0], c[1], c[2]]))
        .collect();
    if positions.iter().flatten().any(|v| !v.is_finite()) {
        tracing::warn!("#{} ({}) has non-finite coordinates, skipped", id, type_name);
        return None;
    }

    let normals = mesh
        .normals
        .chunks_exact(3)
        .map(|c| z_up_to_y_up([c[0], c[1], c[2]]))
        .collect();

    let vertex_count = positions.len() as u32;
    let indices: Vec<u32> = mesh
        .indices
        .chunks_exact(3)
        .filter(|tri| tri.iter().all(|i| *i < vertex_count))
        .flatten()
        .copied()
        .collect();

    let element = ElementGeometry {
        express_id: id,
        category: type_name.to_ascii_uppercase(),
        positions,
        normals,
        indices,
    };
    (!element.is_empty()).then_some(element)
}
