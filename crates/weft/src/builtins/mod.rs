//! Built-in plugins, available by name through the [`PluginRegistry`].
//!
//! [`PluginRegistry`]: crate::registry::PluginRegistry

mod cookie_jar;

pub use cookie_jar::{cookie_jar, CookieStore, MemoryCookieStore};
