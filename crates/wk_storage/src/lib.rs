use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use wk_core::{Error, KeyValueStore, Result};

pub mod backends;

pub use backends::*;

/// Directory used by the file backend when none is given.
pub const DEFAULT_STATE_DIR: &str = ".wikilens";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    File,
    Memory,
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Storage(format!("Unknown store backend: {}", other))),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Opens the requested backend. `state_dir` only applies to the file backend.
pub async fn create_store(kind: StoreKind, state_dir: Option<&Path>) -> Result<Arc<dyn KeyValueStore>> {
    match kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::File => {
            let dir = state_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));
            let store = FileStore::open(&dir).await?;
            tracing::debug!("📁 Using state file {}", store.path().display());
            Ok(Arc::new(store))
        }
    }
}

pub mod prelude {
    pub use super::{create_store, StoreKind};
    pub use super::backends::*;
}
