//! Process-wide engine runtime handle.

use log::info;
use once_cell::sync::OnceCell;
use semver::Version;

use crate::error::AdvrsError;

pub const ENGINE_NAME: &str = "advrs-core";

/// Identity of the running engine, used for graph-format compatibility checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    pub name: &'static str,
    pub version: Version,
}

static ENGINE: OnceCell<EngineInfo> = OnceCell::new();

/// Acquires the engine runtime, initializing it on first use.
///
/// Later calls return the same instance without logging.
pub fn acquire() -> Result<&'static EngineInfo, AdvrsError> {
    ENGINE.get_or_try_init(|| {
        let version = Version::parse(env!("CARGO_PKG_VERSION"))
            .map_err(|e| AdvrsError::InternalError(format!("invalid engine version: {}", e)))?;
        info!("{} engine {} initialized", ENGINE_NAME, version);
        Ok(EngineInfo {
            name: ENGINE_NAME,
            version,
        })
    })
}
