use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// A string slot in some key-value medium.
///
/// `load` yields `None` when nothing usable is stored; an empty value
/// counts as nothing.
pub trait Storage {
    fn key(&self) -> &str;

    fn load(&self) -> anyhow::Result<Option<String>>;

    fn save(&self, serialized: &str) -> anyhow::Result<()>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    key: String,
    path: PathBuf,
}

impl FileStorage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path, key: &str) -> anyhow::Result<Self> {
        if key.trim().is_empty() || key.contains(['/', '\\']) {
            return Err(anyhow!("invalid storage key: {key:?}"));
        }

        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = data_dir.join(format!("{key}.json"));

        info!(key, path = %path.display(), "opened file storage");
        Ok(Self {
            key: key.to_string(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    fn key(&self) -> &str {
        &self.key
    }

    #[tracing::instrument(skip(self), fields(key = %self.key))]
    fn load(&self) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            debug!(file = %self.path.display(), "nothing stored yet");
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }

        debug!(bytes = raw.len(), "loaded stored value");
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, serialized), fields(key = %self.key, bytes = serialized.len()))]
    fn save(&self, serialized: &str) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(serialized.as_bytes())?;
        temp.flush()?;

        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        debug!(file = %self.path.display(), "saved stored value");
        Ok(())
    }
}

/// In-process medium. Clones of one `MemoryStorage` family share the map,
/// so a test can keep a handle and inspect what was written.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    key: String,
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            slots: Rc::default(),
        }
    }

    /// Another key backed by the same map.
    pub fn sibling(&self, key: &str) -> Self {
        Self {
            key: key.to_string(),
            slots: Rc::clone(&self.slots),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slots.borrow().get(&self.key).cloned()
    }
}

impl Storage for MemoryStorage {
    fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.raw().filter(|value| !value.trim().is_empty()))
    }

    fn save(&self, serialized: &str) -> anyhow::Result<()> {
        self.slots
            .borrow_mut()
            .insert(self.key.clone(), serialized.to_string());
        Ok(())
    }
}
