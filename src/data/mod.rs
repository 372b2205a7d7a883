/// Data layer: core types, loading, transformations and writing.
///
/// Architecture:
/// ```text
///   raw listings .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  price range, then ...
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ datetime │  last_review → canonical datetime
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  ... NYC bounding box
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer  │  Dataset → clean .csv
///   └──────────┘
/// ```
///
/// Every step borrows its input and returns a fresh `Dataset`.

pub mod datetime;
pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;

pub use datetime::normalize_datetime;
pub use filter::{filter_bounding_box, filter_range, FilterRange, GeoBoundingBox};
pub use loader::load_csv;
pub use model::{Dataset, Row, Value};
pub use writer::write_csv;
