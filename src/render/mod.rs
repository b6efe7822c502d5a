pub mod grid;
pub mod layer;
pub mod orchestrator;
pub mod palette;
pub mod raster;
pub mod text;
pub mod viewport;
