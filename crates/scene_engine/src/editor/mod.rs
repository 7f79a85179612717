//! # Editor
//!
//! Headless editing layer on top of the rendering and picking engines.
//!
//! - [`EditorSession`]: the scenes open in an editor and the active one
//! - [`SceneView`]: one viewport's camera, passes, pickers, selection and widget
//! - [`Widget`]: translation and rotation handles drawn over the selection
//! - [`SceneHandoff`]: delivery of scenes built on worker threads

pub mod dispatch;
pub mod session;
pub mod view;
pub mod widget;

#[cfg(test)]
mod tests;

pub use dispatch::{HostDispatch, SceneHandoff};
pub use session::{EditorSession, SceneChangeKind, SceneChangedEvent, SceneChangedListener};
pub use view::{PickOutcome, SceneView};
pub use widget::{Axis, Widget};
