//! Products domain module: the glass-structure catalog and area pricing.
//!
//! A glass structure is a priced catalog entry identified by a structure key
//! `{type}-{code}` (for example `MB-EI90`). Its price is per square metre; a
//! pane of `width × height` millimetres costs `price × width × height / 10⁶`.

pub mod catalog;
pub mod pricing;
pub mod structure;

pub use catalog::{CatalogError, GlassStructureCatalog, InMemoryGlassCatalog};
pub use pricing::{PriceCalculator, area_price};
pub use structure::{GlassStructure, structure_key};
