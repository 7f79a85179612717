//! Headless CPU rasteriser implementing the graphics context capability

mod context;
mod raster;

pub use context::{DrawStats, SoftwareContext};
