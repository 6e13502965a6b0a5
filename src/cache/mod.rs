pub mod projection_cache;

pub use projection_cache::{CacheStats, ProjectionCache};
