//! Bimview Core - Model, category and framing logic for the IFC viewer
//!
//! This crate holds everything that does not need a renderer:
//! - Page query parsing and viewer configuration
//! - Category styling (fixed table, query overrides, generated palette)
//! - IFC extraction into fragments and classification by entity type
//! - Per-category UI state and the material/visibility controller
//! - Post-load framing geometry

pub mod category;
pub mod color;
pub mod config;
pub mod controller;
pub mod fragment;
pub mod framing;
pub mod ifc;
pub mod query;
pub mod session;
pub mod state;

pub use category::{CategoryStyle, CategoryTable};
pub use color::{ColorError, Rgb};
pub use config::{ConfigError, ViewerConfig};
pub use controller::{FragmentBackend, Hider, MaterialController, MaterialSpec};
pub use fragment::{
    Classification, ElementGeometry, ExpressId, Fragment, FragmentId, FragmentIdMap, FragmentKind,
    FragmentLayout, ItemSpan, ModelGeometry,
};
pub use framing::{Aabb, Framing, OrbitPose};
pub use ifc::{parse_ifc, LoadError};
pub use query::ViewerQuery;
pub use session::ViewerSession;
pub use state::{CategoryCell, CategoryEffect, CategoryInput, CategoryView};
