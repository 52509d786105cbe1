//! Raster frames: loading, colour scaling and map rendering.

pub mod colormap;
pub mod frame;
pub mod render;
pub mod store;

pub use frame::RasterFrame;
pub use render::{render_maps, MapRenderer, PlottersMapRenderer};
pub use store::{GeoTiffStore, RasterSource};
