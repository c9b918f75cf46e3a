//! Configuration access port trait.

/// Keyed lookups into `[section] key = value` configuration.
pub trait ConfigPort {
    /// Raw value, `None` when the section or key is absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
