//! Static access credentials.
//!
//! Secrets are read once from the environment variables named by each
//! source definition and handed to the fetcher as an immutable value.

use std::collections::BTreeMap;

use crate::source_def::SourceDefinition;

/// Secrets keyed by environment variable name.
#[derive(Clone, Default)]
pub struct Credentials {
    secrets: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("configured", &self.secrets.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Credentials {
    /// Reads the credential of every source that declares one. Unset and
    /// blank variables are skipped.
    #[must_use]
    pub fn from_env(sources: &[SourceDefinition]) -> Self {
        let mut credentials = Self::default();
        for credential in sources.iter().filter_map(|s| s.credential.as_ref()) {
            match std::env::var(&credential.env) {
                Ok(secret) if !secret.trim().is_empty() => {
                    credentials = credentials.with(&credential.env, secret.trim());
                }
                _ => log::debug!("{} is not set", credential.env),
            }
        }
        credentials
    }

    /// Returns a copy with `env` set to `secret`.
    #[must_use]
    pub fn with(mut self, env: &str, secret: &str) -> Self {
        self.secrets.insert(env.to_string(), secret.to_string());
        self
    }

    /// The secret stored for `env`.
    #[must_use]
    pub fn get(&self, env: &str) -> Option<&str> {
        self.secrets.get(env).map(String::as_str)
    }
}
