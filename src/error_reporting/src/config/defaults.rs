use std::env;

use crate::config::Configuration;

impl Default for Configuration {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// First non-blank value among the given environment variables.
pub(super) fn first_env_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
