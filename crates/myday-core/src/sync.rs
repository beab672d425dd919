use std::rc::Rc;

use tracing::{debug, info, instrument, warn};

use crate::error::HydrateError;
use crate::store::{Subscription, TaskStore};
use crate::storage::Storage;
use crate::task::Task;

pub fn serialize_tasks(tasks: &[Task]) -> serde_json::Result<String> {
    serde_json::to_string(tasks)
}

pub fn deserialize_tasks(raw: &str) -> serde_json::Result<Vec<Task>> {
    serde_json::from_str(raw)
}

/// Seeds a store from storage, then rewrites the whole collection to
/// storage after every store mutation.
#[derive(Debug)]
pub struct PersistenceSynchronizer {
    key: String,
    subscription: Subscription,
}

impl PersistenceSynchronizer {
    #[instrument(skip(store, storage), fields(key = %storage.key()))]
    pub fn attach(
        store: &mut TaskStore,
        storage: Rc<dyn Storage>,
    ) -> Result<Self, HydrateError> {
        hydrate(store, storage.as_ref())?;

        let key = storage.key().to_string();
        let subscription = store.subscribe(move |tasks| persist(storage.as_ref(), tasks));
        debug!(key = %key, "persistence synchronizer attached");

        Ok(Self { key, subscription })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn detach(self, store: &mut TaskStore) {
        store.unsubscribe(self.subscription);
    }
}

fn hydrate(store: &mut TaskStore, storage: &dyn Storage) -> Result<(), HydrateError> {
    let key = storage.key().to_string();
    let raw = storage.load().map_err(|source| HydrateError::Load {
        key: key.clone(),
        source: source.into(),
    })?;

    let Some(raw) = raw else {
        info!(key = %key, "no stored tasks; starting empty");
        return Ok(());
    };

    let tasks =
        deserialize_tasks(&raw).map_err(|source| HydrateError::Malformed { key, source })?;
    info!(count = tasks.len(), "hydrated tasks from storage");
    store.replace_all(tasks);
    Ok(())
}

// Best-effort: memory stays authoritative when a write fails.
fn persist(storage: &dyn Storage, tasks: &[Task]) {
    let serialized = match serialize_tasks(tasks) {
        Ok(serialized) => serialized,
        Err(err) => {
            warn!(key = %storage.key(), error = %err, "failed to serialize tasks");
            return;
        }
    };

    if let Err(err) = storage.save(&serialized) {
        warn!(key = %storage.key(), error = %format!("{err:#}"), "failed to save tasks");
    } else {
        debug!(key = %storage.key(), count = tasks.len(), "tasks saved");
    }
}
