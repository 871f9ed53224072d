//! Handler registry - name-indexed constructors with suffix aliasing

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub use contracts::handler_type;
use tracing::{debug, error, info};

use crate::base::{Handler, HandlerParams};
use crate::error::{HandlerError, Result};
use crate::handlers::{LogHandler, NetworkHandler};

/// Builds a handler instance from its construction parameters
pub type HandlerConstructor = Arc<dyn Fn(HandlerParams) -> Box<dyn Handler> + Send + Sync>;

/// Registry of handler constructors, owned by whoever bootstraps the agent
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    constructors: Arc<RwLock<HashMap<String, HandlerConstructor>>>,
}

impl HandlerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler type
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register("Log", |params| Box::new(LogHandler::new(params)));
        registry.register("Network", |params| Box::new(NetworkHandler::new(params)));
        registry
    }

    /// Install a constructor, replacing any previous one of the same name
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn(HandlerParams) -> Box<dyn Handler> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(handler_type = %name, "Registering handler type");
        self.constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::new(constructor));
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn contains(&self, handler_type: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(handler_type)
    }

    /// Create a handler by name.
    ///
    /// Everything after the first space is an instance suffix, so
    /// `"Log secondary"` is a second `Log` handler named `"Log secondary"`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Handler>> {
        let handler_type = handler_type(name);

        // Clone out so the constructor runs without holding the lock
        let constructor = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handler_type)
            .cloned();

        let Some(constructor) = constructor else {
            error!(handler = %name, handler_type, "Unknown handler type");
            return Err(HandlerError::unknown_handler(name, handler_type));
        };

        let handler = constructor(HandlerParams::new(name));
        info!(handler = %name, handler_type, "Handler created");
        Ok(handler)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.names())
            .finish()
    }
}
