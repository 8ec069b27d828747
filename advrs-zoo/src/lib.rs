//! # advrs-zoo
//!
//! Local, content-addressed cache of model repositories. Each repository is cloned with
//! `git` into `<root>/<sha256(uri)>` and reused on later fetches.

pub mod error;

pub use error::FetchError;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};
use sha2::{Digest, Sha256};

/// Overrides the zoo root directory.
pub const ZOO_HOME_VAR: &str = "ADVRS_ZOO_HOME";
/// Zoo directory name under `$HOME`.
pub const DEFAULT_FOLDER: &str = ".advrs_zoo";

/// Lowercase hex SHA-256 of `uri`, the repository's directory name.
pub fn hash_uri(uri: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uri.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn resolve_root(zoo_home: Option<OsString>, home: Option<OsString>) -> Result<PathBuf, FetchError> {
    match (zoo_home, home) {
        (Some(root), _) if !root.is_empty() => Ok(PathBuf::from(root)),
        (_, Some(home)) if !home.is_empty() => Ok(PathBuf::from(home).join(DEFAULT_FOLDER)),
        _ => Err(FetchError::NoHomeDirectory),
    }
}

/// A directory holding cloned repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zoo {
    root: PathBuf,
}

impl Zoo {
    /// `$ADVRS_ZOO_HOME`, else `$HOME/.advrs_zoo`.
    pub fn default_location() -> Result<Self, FetchError> {
        let root = resolve_root(std::env::var_os(ZOO_HOME_VAR), std::env::var_os("HOME"))?;
        Ok(Zoo { root })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Zoo { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `uri` is (or would be) cloned.
    pub fn local_path(&self, uri: &str) -> PathBuf {
        self.root.join(hash_uri(uri))
    }

    /// Returns the local clone of `uri`, cloning it first if it is not present.
    ///
    /// An existing directory is returned as-is, without checking its contents.
    ///
    /// # Errors
    /// `CloneFailed` if `git` cannot be started or exits unsuccessfully; any partial
    /// clone is removed first.
    pub fn fetch(&self, uri: &str) -> Result<PathBuf, FetchError> {
        let local_path = self.local_path(uri);
        if local_path.exists() {
            info!("Repository {} already exists at {}", uri, local_path.display());
            return Ok(local_path);
        }
        fs::create_dir_all(&self.root)?;
        info!("Cloning repository {} to {}", uri, local_path.display());

        let result = Command::new("git")
            .arg("clone")
            .arg(uri)
            .arg(&local_path)
            .output()
            .map_err(|e| e.to_string())
            .and_then(|output| {
                if output.status.success() {
                    Ok(())
                } else {
                    Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
                }
            });

        match result {
            Ok(()) => {
                info!("Cloned repository {}", uri);
                Ok(local_path)
            }
            Err(reason) => {
                warn!("Failed to clone repository {}: {}", uri, reason);
                if local_path.exists() {
                    fs::remove_dir_all(&local_path)?;
                }
                Err(FetchError::CloneFailed {
                    uri: uri.to_string(),
                    reason,
                })
            }
        }
    }
}

/// Fetches `uri` into the default zoo location.
pub fn fetch(uri: &str) -> Result<PathBuf, FetchError> {
    Zoo::default_location()?.fetch(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_uri() {
        assert_eq!(
            hash_uri(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let h = hash_uri("https://github.com/example/model.git");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(h, hash_uri("https://github.com/example/other.git"));
    }

    #[test]
    fn test_resolve_root() {
        let explicit = resolve_root(Some("/data/zoo".into()), Some("/home/u".into())).unwrap();
        assert_eq!(explicit, PathBuf::from("/data/zoo"));
        let home = resolve_root(None, Some("/home/u".into())).unwrap();
        assert_eq!(home, PathBuf::from("/home/u").join(DEFAULT_FOLDER));
        let empty_override = resolve_root(Some("".into()), Some("/home/u".into())).unwrap();
        assert_eq!(empty_override, home);
        assert!(matches!(resolve_root(None, None), Err(FetchError::NoHomeDirectory)));
    }
}
