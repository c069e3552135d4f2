/// Data layer: loading, normalization, caching, filtering and statistics.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable (header + typed cells)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  categories, work groups, dedup, timestamps,
///   └───────────┘  duration_minutes → NormalizedTable
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  Arc<NormalizedTable> per source file version
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐     ┌──────────┐
///   │  filter   │ ──▶ │  stats    │  summaries, series, histograms
///   └──────────┘     └──────────┘
/// ```

pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod stats;
