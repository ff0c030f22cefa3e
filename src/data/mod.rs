/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .parquet
///        │
///        ▼
///   ┌──────────┐      ┌──────────────┐
///   │  loader   │ ◄─── │ DatasetCache │  one load per path, Arc<GridTable>
///   └──────────┘      └──────────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ GridTable  │  Vec<GridRow>, header order
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  segments + score window → filtered GridTable
///   └──────────┘
///        │
///        ├──► profile    per-segment feature means
///        └──► histogram  score bins per segment
/// ```

pub mod cache;
pub mod error;
pub mod filter;
pub mod histogram;
pub mod loader;
pub mod model;
pub mod profile;
