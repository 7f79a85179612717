//! Graphics context implementations
//!
//! Hosts normally wrap their toolkit's GL/Vulkan surface in a
//! [`GraphicsContext`](crate::render::api::GraphicsContext). The software
//! backend here needs no window and is what tests and the demo draw with.

pub mod software;
