//! Registries of interchangeable strategies
//!
//! Renderers and pickers are selected by a stable string key (for example
//! from configuration or scene metadata). Unknown keys fall back to the
//! registry's default with a warning instead of failing.

use std::collections::BTreeMap;
use std::fmt;

use crate::render::renderer::Renderer;
use crate::render::renderers::{ColourIdRenderer, OutlineRenderer, OverlayRenderer, SimpleRenderer};

/// Constructor stored in a registry
pub type Factory<T> = fn() -> Box<T>;

/// Key-to-factory registry with a default entry
pub struct Registry<T: ?Sized> {
    factories: BTreeMap<String, Factory<T>>,
    default_key: String,
    default: Factory<T>,
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("keys", &self.factories.keys().collect::<Vec<_>>())
            .field("default_key", &self.default_key)
            .finish()
    }
}

impl<T: ?Sized> Registry<T> {
    /// Create a registry holding only its default entry
    pub fn new(default_key: impl Into<String>, default: Factory<T>) -> Self {
        let default_key = default_key.into();
        let mut factories = BTreeMap::new();
        factories.insert(default_key.clone(), default);
        Self {
            factories,
            default_key,
            default,
        }
    }

    /// Register a factory, returning the one it replaces
    pub fn register(&mut self, key: impl Into<String>, factory: Factory<T>) -> Option<Factory<T>> {
        self.factories.insert(key.into(), factory)
    }

    /// Whether `key` is registered
    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Key used when nothing or an unknown key is requested
    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    /// Instantiate the entry for `key`, or the default
    ///
    /// # Arguments
    /// * `key` - Preferred key; `None` selects the default silently
    pub fn create(&self, key: Option<&str>) -> Box<T> {
        match key {
            None => (self.default)(),
            Some(key) => self.factories.get(key).map_or_else(
                || {
                    log::warn!(
                        "Unknown registry key '{}', falling back to '{}'",
                        key, self.default_key
                    );
                    (self.default)()
                },
                |factory| factory(),
            ),
        }
    }
}

/// Registry of scene renderers
pub type RendererRegistry = Registry<dyn Renderer>;

impl Registry<dyn Renderer> {
    /// Registry of the built-in renderers, defaulting to `simple`
    pub fn builtin_renderers() -> Self {
        let mut registry = Self::new("simple", || Box::new(SimpleRenderer::new()));
        registry.register("outline", || Box::new(OutlineRenderer::default()));
        registry.register("overlay", || Box::new(OverlayRenderer::new()));
        registry.register("colour-id", || Box::new(ColourIdRenderer::new()));
        registry
    }
}
