//! # Editor Session
//!
//! Owns the scenes open in an editor and tracks which one is active. There
//! is no global scene registry: hosts create a session and pass it to
//! whatever needs it.
//!
//! Scene-changed listeners follow the pick listener policy: all of them run,
//! failures are logged, and the first failure is returned afterwards.

use std::collections::BTreeMap;

use crate::config::EditorConfig;
use crate::editor::view::SceneView;
use crate::error::{EngineError, EngineResult, ListenerError};
use crate::picking::ListenerId;
use crate::picking::PickerRegistry;
use crate::render::registry::RendererRegistry;
use crate::scene::Scene;

/// What happened to a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneChangeKind {
    /// The scene became the active scene
    Activated,
    /// The scene's content was edited
    Modified,
}

/// Notification about an open scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneChangedEvent {
    /// Name the scene was opened under
    pub name: String,
    /// What happened
    pub kind: SceneChangeKind,
}

/// Receives scene change notifications
pub trait SceneChangedListener {
    /// Handle a scene change
    ///
    /// # Errors
    /// Listener specific. Failures do not stop delivery to later listeners.
    fn on_scene_changed(&mut self, event: &SceneChangedEvent) -> Result<(), ListenerError>;
}

impl<F> SceneChangedListener for F
where
    F: FnMut(&SceneChangedEvent) -> Result<(), ListenerError>,
{
    fn on_scene_changed(&mut self, event: &SceneChangedEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Scenes open in an editor
pub struct EditorSession {
    config: EditorConfig,
    renderers: RendererRegistry,
    pickers: PickerRegistry,
    views: BTreeMap<String, SceneView>,
    active: Option<String>,
    listeners: Vec<(ListenerId, Box<dyn SceneChangedListener>)>,
    next_listener: u64,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("scenes", &self.views.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Create a session with the built-in renderers and pickers
    ///
    /// # Errors
    /// `Config` when `config` fails validation.
    pub fn new(config: EditorConfig) -> EngineResult<Self> {
        Self::with_registries(
            config,
            RendererRegistry::builtin_renderers(),
            PickerRegistry::builtin_pickers(),
        )
    }

    /// Create a session with custom registries
    ///
    /// # Errors
    /// `Config` when `config` fails validation.
    pub fn with_registries(
        config: EditorConfig,
        renderers: RendererRegistry,
        pickers: PickerRegistry,
    ) -> EngineResult<Self> {
        config
            .validate()
            .map_err(crate::config::ConfigError::Invalid)?;
        Ok(Self {
            config,
            renderers,
            pickers,
            views: BTreeMap::new(),
            active: None,
            listeners: Vec::new(),
            next_listener: 0,
        })
    }

    /// Session settings
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Open a scene under `name`
    ///
    /// The first scene opened becomes active.
    ///
    /// # Errors
    /// - `InvalidOperation` when `name` is already open.
    /// - The first listener failure after activation; the scene stays open.
    pub fn open_scene(&mut self, name: impl Into<String>, scene: Scene) -> EngineResult<&mut SceneView> {
        let name = name.into();
        if self.views.contains_key(&name) {
            return Err(EngineError::invalid(format!("a scene named '{name}' is already open")));
        }
        let view = SceneView::with_registries(scene, self.config.clone(), &self.renderers, &self.pickers)?;
        self.views.insert(name.clone(), view);
        log::info!("Opened scene '{}'", name);

        if self.active.is_none() {
            self.set_active_scene(&name)?;
        }
        self.views
            .get_mut(&name)
            .ok_or_else(|| EngineError::invalid(format!("scene '{name}' vanished while opening")))
    }

    /// Close a scene, returning its view
    ///
    /// Closing the active scene leaves no scene active.
    pub fn close_scene(&mut self, name: &str) -> Option<SceneView> {
        let view = self.views.remove(name)?;
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        log::info!("Closed scene '{}'", name);
        Some(view)
    }

    /// Names of the open scenes, sorted
    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    /// View of an open scene
    pub fn view(&self, name: &str) -> Option<&SceneView> {
        self.views.get(name)
    }

    /// Mutable view of an open scene
    pub fn view_mut(&mut self, name: &str) -> Option<&mut SceneView> {
        self.views.get_mut(name)
    }

    /// Name of the active scene
    pub fn active_scene(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Make an open scene active
    ///
    /// Activating the active scene again notifies nobody.
    ///
    /// # Errors
    /// - `InvalidOperation` when `name` is not open.
    /// - The first listener failure.
    pub fn set_active_scene(&mut self, name: &str) -> EngineResult<()> {
        if !self.views.contains_key(name) {
            return Err(EngineError::invalid(format!("no scene named '{name}' is open")));
        }
        if self.active.as_deref() == Some(name) {
            return Ok(());
        }
        self.active = Some(name.to_string());
        log::debug!("Active scene is now '{}'", name);
        self.fire(&SceneChangedEvent {
            name: name.to_string(),
            kind: SceneChangeKind::Activated,
        })
    }

    /// View of the active scene
    pub fn active_view(&self) -> Option<&SceneView> {
        self.active.as_deref().and_then(|name| self.views.get(name))
    }

    /// Mutable view of the active scene
    pub fn active_view_mut(&mut self) -> Option<&mut SceneView> {
        let name = self.active.as_deref()?;
        self.views.get_mut(name)
    }

    /// Tell listeners a scene's content changed
    ///
    /// # Errors
    /// - `InvalidOperation` when `name` is not open.
    /// - The first listener failure.
    pub fn notify_scene_modified(&mut self, name: &str) -> EngineResult<()> {
        if !self.views.contains_key(name) {
            return Err(EngineError::invalid(format!("no scene named '{name}' is open")));
        }
        self.fire(&SceneChangedEvent {
            name: name.to_string(),
            kind: SceneChangeKind::Modified,
        })
    }

    /// Register a listener, notified after those registered before it
    pub fn add_scene_changed_listener(&mut self, listener: Box<dyn SceneChangedListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a listener, returning it
    pub fn remove_scene_changed_listener(&mut self, id: ListenerId) -> Option<Box<dyn SceneChangedListener>> {
        let index = self.listeners.iter().position(|(l, _)| *l == id)?;
        Some(self.listeners.remove(index).1)
    }

    fn fire(&mut self, event: &SceneChangedEvent) -> EngineResult<()> {
        let mut first_failure = None;
        for (index, (_, listener)) in self.listeners.iter_mut().enumerate() {
            if let Err(source) = listener.on_scene_changed(event) {
                log::warn!("Scene listener {} failed on {:?}: {}", index, event, source);
                first_failure.get_or_insert(EngineError::Listener { index, source });
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}
