use std::collections::HashMap;
use std::sync::Arc;

use crate::builtins::{cookie_jar, MemoryCookieStore};
use crate::plugin::Plugin;

type PluginCtor = Box<dyn Fn() -> Plugin + Send + Sync>;

/// Name → constructor mapping for plugins mountable by name.
///
/// The registry is populated at startup — the built-in set plus whatever
/// the caller registers — so name resolution is an explicit lookup, never
/// a dynamic load.
pub struct PluginRegistry {
    entries: HashMap<String, PluginCtor>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A registry holding the built-in plugins.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("cookie-jar", || {
            cookie_jar(Arc::new(MemoryCookieStore::new()))
        });
        registry
    }

    /// Register (or replace) a constructor under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        ctor: impl Fn() -> Plugin + Send + Sync + 'static,
    ) {
        self.entries.insert(name.into(), Box::new(ctor));
    }

    /// Construct a fresh plugin instance for `name`.
    pub fn resolve(&self, name: &str) -> Option<Plugin> {
        self.entries.get(name).map(|ctor| ctor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, unordered.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("names", &self.names())
            .finish()
    }
}
