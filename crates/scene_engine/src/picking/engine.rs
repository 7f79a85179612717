//! # Picking Engine
//!
//! Queues picks and resolves them against a scene on `advance`.
//!
//! ## States
//! - **Idle**: nothing queued; `advance` returns immediately without touching
//!   the picker.
//! - **Queued**: one or more picks wait. `advance` resolves all of them in
//!   FIFO order inside a single `init`/`dispose` bracket of the picker, fires
//!   an event per pick that hit something, and returns to Idle.
//!
//! ## Listener failures
//! Every listener sees every event. A failing listener is logged and the
//! remaining listeners still run; the first failure is returned once fan-out
//! (and, during `advance`, the whole queue) has completed.

use std::collections::VecDeque;

use crate::error::{EngineError, EngineResult};
use crate::picking::listener::{ListenerId, PickListener};
use crate::picking::picker::Picker;
use crate::picking::{viewport_to_frame, Pick, PickEvent, PickingState};
use crate::render::api::{GraphicsContext, ViewportSize};
use crate::render::primitives::Camera;
use crate::scene::Scene;

/// Pick queue, picker and listeners
#[derive(Default)]
pub struct PickingEngine {
    picks: VecDeque<Pick>,
    picker: Option<Box<dyn Picker>>,
    listeners: Vec<(ListenerId, Box<dyn PickListener>)>,
    next_listener: u64,
}

impl std::fmt::Debug for PickingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickingEngine")
            .field("picks", &self.picks)
            .field("picker", &self.picker.as_ref().map(|p| p.name()))
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl PickingEngine {
    /// Create an engine without a picker
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine resolving picks with `picker`
    pub fn with_picker(picker: Box<dyn Picker>) -> Self {
        Self {
            picker: Some(picker),
            ..Self::default()
        }
    }

    /// Queue a pick already in camera-frame units
    pub fn pick(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.pick_with(Pick::new(x, y, width, height));
    }

    /// Queue a pick already in camera-frame units
    pub fn pick_with(&mut self, pick: Pick) {
        log::trace!("Queued pick {:?}", pick);
        self.picks.push_back(pick);
    }

    /// Convert a device-pixel pick for `viewport` and queue it
    ///
    /// # Errors
    /// `InvalidOperation` for a zero-width viewport; nothing is queued.
    pub fn pick_viewport(
        &mut self,
        viewport: ViewportSize,
        camera: &Camera,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> EngineResult<()> {
        self.pick_viewport_with(viewport, camera, Pick::new(x, y, width, height))
    }

    /// Convert a device-pixel pick for `viewport` and queue it
    ///
    /// # Errors
    /// `InvalidOperation` for a zero-width viewport; nothing is queued.
    pub fn pick_viewport_with(&mut self, viewport: ViewportSize, camera: &Camera, mut pick: Pick) -> EngineResult<()> {
        viewport_to_frame(viewport, camera, &mut pick)?;
        self.pick_with(pick);
        Ok(())
    }

    /// Queued picks, oldest first
    pub fn picks(&self) -> impl ExactSizeIterator<Item = &Pick> {
        self.picks.iter()
    }

    /// Number of queued picks
    pub fn queued(&self) -> usize {
        self.picks.len()
    }

    /// Drop every queued pick
    pub fn clear_picks(&mut self) {
        self.picks.clear();
    }

    /// Current queue state
    pub fn state(&self) -> PickingState {
        if self.picks.is_empty() {
            PickingState::Idle
        } else {
            PickingState::Queued
        }
    }

    /// Replace the picker, returning the previous one
    pub fn set_picker(&mut self, picker: Box<dyn Picker>) -> Option<Box<dyn Picker>> {
        log::debug!("Picking engine now uses the '{}' picker", picker.name());
        self.picker.replace(picker)
    }

    /// Current picker
    pub fn picker(&self) -> Option<&dyn Picker> {
        self.picker.as_deref()
    }

    /// Mutable current picker
    pub fn picker_mut(&mut self) -> Option<&mut (dyn Picker + 'static)> {
        self.picker.as_deref_mut()
    }

    /// Register a listener, notified after those registered before it
    pub fn add_pick_listener(&mut self, listener: Box<dyn PickListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a listener, returning it
    pub fn remove_pick_listener(&mut self, id: ListenerId) -> Option<Box<dyn PickListener>> {
        let index = self.listeners.iter().position(|(l, _)| *l == id)?;
        Some(self.listeners.remove(index).1)
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver an event to every listener in registration order
    ///
    /// # Errors
    /// `Listener` carrying the first failure, after all listeners have run.
    pub fn fire_pick_event(&mut self, event: &PickEvent) -> EngineResult<()> {
        let mut first_failure = None;
        for (index, (_, listener)) in self.listeners.iter_mut().enumerate() {
            if let Err(source) = listener.on_scene_picked(event) {
                log::warn!("Pick listener {} failed: {}", index, source);
                first_failure.get_or_insert(EngineError::Listener { index, source });
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    /// Resolve every queued pick against `scene`
    ///
    /// Returns the number of picks resolved.
    ///
    /// # Errors
    /// - `InvalidOperation` when picks are queued but no picker is set; the
    ///   queue is left as it was.
    /// - The picker's failure; later picks are dropped, hits resolved before
    ///   it are still fired to listeners.
    /// - The first listener failure, once the queue is drained.
    pub fn advance(&mut self, ctx: &mut dyn GraphicsContext, scene: &Scene, camera: &Camera) -> EngineResult<usize> {
        if self.picks.is_empty() {
            return Ok(0);
        }
        let Some(picker) = self.picker.as_deref_mut() else {
            return Err(EngineError::invalid(format!(
                "{} picks queued but no picker is set",
                self.picks.len()
            )));
        };

        let mut events = Vec::new();
        let mut resolved = 0;
        let result = picker.init(ctx).and_then(|()| {
            while let Some(pick) = self.picks.pop_front() {
                let event = picker.pick_scene(ctx, scene, camera, &pick)?;
                resolved += 1;
                log::debug!(
                    "Pick {:?} resolved to {} hits",
                    pick,
                    event.as_ref().map_or(0, |e| e.picks.iter().map(|p| p.hits.len()).sum())
                );
                events.extend(event);
            }
            Ok(())
        });
        picker.dispose(ctx);

        if let Err(error) = &result {
            if !self.picks.is_empty() {
                log::warn!("Dropping {} picks after picker failure: {}", self.picks.len(), error);
                self.picks.clear();
            }
        }

        // Picks resolved before a picker failure are still delivered
        let mut first_failure = None;
        for event in &events {
            if let Err(error) = self.fire_pick_event(event) {
                first_failure.get_or_insert(error);
            }
        }
        result?;
        first_failure.map_or(Ok(resolved), Err)
    }
}
