//! Pick listeners
//!
//! Listeners are notified synchronously, in registration order. Any closure
//! `FnMut(&PickEvent) -> Result<(), ListenerError>` is a listener.

use crate::error::ListenerError;
use crate::picking::PickEvent;

/// Handle returned when registering a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Receives resolved picks
pub trait PickListener {
    /// Handle a pick event
    ///
    /// # Errors
    /// Listener specific. Failures do not stop delivery to later listeners.
    fn on_scene_picked(&mut self, event: &PickEvent) -> Result<(), ListenerError>;
}

impl<F> PickListener for F
where
    F: FnMut(&PickEvent) -> Result<(), ListenerError>,
{
    fn on_scene_picked(&mut self, event: &PickEvent) -> Result<(), ListenerError> {
        self(event)
    }
}
