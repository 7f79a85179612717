//! Built-in renderers
//!
//! - [`SimpleRenderer`]: lit, depth-tested, back-face culled geometry
//! - [`OutlineRenderer`]: unlit edges in a highlight colour, drawn on top
//! - [`OverlayRenderer`]: unlit, blended geometry drawn over the scene
//! - [`ColourIdRenderer`]: every node in a colour encoding its id, for picking

mod colour_id;
mod outline;
mod overlay;
mod simple;

pub use colour_id::{decode_id, encode_id, ColourIdRenderer, MAX_ENCODED_ID};
pub use outline::OutlineRenderer;
pub use overlay::OverlayRenderer;
pub use simple::SimpleRenderer;
