//! Configuration layer: parsing of the remote endpoint, the optional TOML
//! tunables file, and the `MountConfig` that is threaded explicitly into
//! every dispatcher operation (Design Notes, "Global mutable state").

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::CoreError;

/// The parsed `user@host:/remote/root` endpoint from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub user: String,
    pub host: String,
    pub remote_root: String,
}

impl Endpoint {
    /// Parses `user@host:/remote/root`. Any other shape is an argument
    /// error (§7.1), fatal at startup.
    pub fn parse(spec: &str) -> Result<Self, CoreError> {
        let (user, rest) = spec
            .split_once('@')
            .ok_or_else(|| CoreError::Argument(format!("missing '@' in endpoint: {spec}")))?;
        let (host, remote_root) = rest
            .split_once(':')
            .ok_or_else(|| CoreError::Argument(format!("missing ':' in endpoint: {spec}")))?;
        if user.is_empty() || host.is_empty() || !remote_root.starts_with('/') {
            return Err(CoreError::Argument(format!("invalid endpoint: {spec}")));
        }
        Ok(Endpoint {
            user: user.to_string(),
            host: host.to_string(),
            remote_root: remote_root.to_string(),
        })
    }
}

/// Tunables the spec marks as "suggested" rather than fixed, loaded from an
/// optional TOML file (mirrors the teacher's `load_config`/`Config`).
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Tunables {
    /// `CACHE_MAX`: the maximum number of simultaneously materialised files.
    pub cache_max: usize,
    /// Hard ceiling for a single remote command's captured output, beyond
    /// which an overlong read is a parse error rather than a silent
    /// truncation (Design Notes, "Buffered reads of unknown-size remote
    /// commands").
    pub remote_command_buf_max: usize,
    /// TTL handed to the FUSE kernel for attribute replies.
    pub kernel_attr_timeout_seconds: u64,
    /// TTL handed to the FUSE kernel for directory-entry replies.
    pub kernel_entry_timeout_seconds: u64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            cache_max: 1024,
            remote_command_buf_max: 1 << 20,
            kernel_attr_timeout_seconds: 1,
            kernel_entry_timeout_seconds: 1,
        }
    }
}

impl Tunables {
    pub fn attr_ttl(&self) -> Duration {
        Duration::from_secs(self.kernel_attr_timeout_seconds)
    }

    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.kernel_entry_timeout_seconds)
    }

    /// Loads tunables from a TOML file; falls back to defaults (with a
    /// logged warning) if the file is missing or unparsable, exactly as the
    /// teacher's `load_config` does for its own config file.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config file, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config file, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_endpoint() {
        let e = Endpoint::parse("alice@example.com:/srv/data").unwrap();
        assert_eq!(e.user, "alice");
        assert_eq!(e.host, "example.com");
        assert_eq!(e.remote_root, "/srv/data");
    }

    #[test]
    fn rejects_missing_at_sign() {
        assert!(Endpoint::parse("example.com:/srv/data").is_err());
    }

    #[test]
    fn rejects_missing_colon() {
        assert!(Endpoint::parse("alice@example.com/srv/data").is_err());
    }

    #[test]
    fn rejects_relative_remote_root() {
        assert!(Endpoint::parse("alice@example.com:srv/data").is_err());
    }

    #[test]
    fn defaults_are_populated() {
        let t = Tunables::default();
        assert_eq!(t.cache_max, 1024);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let t = Tunables::load(Some(Path::new("/nonexistent/remote-fs-config.toml")));
        assert_eq!(t.cache_max, 1024);
    }
}