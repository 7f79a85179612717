//! Optional graphics context binding
//!
//! Editors receive their drawing surface from the host toolkit some time
//! after construction. Until then, work that needs a context is skipped and
//! the absence is reported once rather than every frame.

use crate::error::{EngineError, EngineResult};
use crate::render::api::GraphicsContext;

/// Slot holding the graphics context an editor draws with
#[derive(Default)]
pub struct GraphicsBinding {
    context: Option<Box<dyn GraphicsContext>>,
    reported: bool,
}

impl std::fmt::Debug for GraphicsBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsBinding")
            .field("bound", &self.context.is_some())
            .field("reported", &self.reported)
            .finish()
    }
}

impl GraphicsBinding {
    /// Create an empty binding
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a context, replacing any previous one
    pub fn bind(&mut self, context: Box<dyn GraphicsContext>) -> Option<Box<dyn GraphicsContext>> {
        self.reported = false;
        self.context.replace(context)
    }

    /// Remove the bound context
    pub fn unbind(&mut self) -> Option<Box<dyn GraphicsContext>> {
        self.reported = false;
        self.context.take()
    }

    /// Whether a context is bound
    pub const fn is_bound(&self) -> bool {
        self.context.is_some()
    }

    /// The bound context, if any
    pub fn get(&self) -> Option<&dyn GraphicsContext> {
        self.context.as_deref()
    }

    /// Borrow the bound context for `operation`
    ///
    /// # Errors
    /// `ResourceUnavailable` when nothing is bound. The first failure after
    /// construction or unbinding is logged as a warning; repeats are not.
    pub fn acquire(&mut self, operation: &str) -> EngineResult<&mut dyn GraphicsContext> {
        if let Some(context) = self.context.as_mut() {
            let context: &mut dyn GraphicsContext = context.as_mut();
            return Ok(context);
        }
        if !self.reported {
            log::warn!("No graphics context bound; skipping {}", operation);
            self.reported = true;
        }
        Err(EngineError::ResourceUnavailable(format!(
            "no graphics context bound for {operation}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::software::SoftwareContext;
    use crate::render::api::ViewportSize;

    #[test]
    fn test_acquire_without_context() {
        let mut binding = GraphicsBinding::new();

        let first = binding.acquire("redraw");
        assert!(first.err().unwrap().is_resource_unavailable());
        assert!(binding.acquire("redraw").is_err());
    }

    #[test]
    fn test_acquire_after_bind() {
        let mut binding = GraphicsBinding::new();
        binding.bind(Box::new(SoftwareContext::new(ViewportSize::new(4, 4))));

        let context = binding.acquire("redraw").unwrap();
        assert_eq!(context.viewport(), ViewportSize::new(4, 4));
        assert!(binding.is_bound());
    }
}
