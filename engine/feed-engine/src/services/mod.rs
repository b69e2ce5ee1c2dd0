pub mod engine;
pub mod surface;

pub use engine::{EngineOptions, FeedEngine};
pub use surface::{PostSurface, SurfaceView};
