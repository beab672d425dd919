use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::alert::{Alert, AlertSink, Severity};
use crate::error::{EmptyTitleError, HydrateError, ValidationError};
use crate::filter::{FilterMode, FilterSelector};
use crate::storage::Storage;
use crate::store::TaskStore;
use crate::sync::PersistenceSynchronizer;
use crate::task::{Task, TaskId};
use crate::validate::{DEFAULT_MIN_TITLE_LENGTH, validate_title_with_min};

const WARNING_TITLE: &str = "Warning";
const MISSING_TITLE_TEXT: &str = "Please provide a title for the task.";
const EMPTY_EDIT_TEXT: &str = "The task title cannot be empty.";

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub min_title_length: usize,
    pub default_filter: FilterMode,
    pub alert_timeout: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            min_title_length: DEFAULT_MIN_TITLE_LENGTH,
            default_filter: FilterMode::All,
            alert_timeout: Duration::from_millis(3000),
        }
    }
}

/// One running task list: the store plus everything listening to it.
///
/// Each method is one user action; failures are reported through the
/// alert sink as well as returned.
pub struct App {
    store: TaskStore,
    selector: FilterSelector,
    sync: PersistenceSynchronizer,
    filter_storage: Option<Rc<dyn Storage>>,
    alerts: Box<dyn AlertSink>,
    options: AppOptions,
}

impl App {
    #[instrument(skip_all)]
    pub fn start(
        tasks: Rc<dyn Storage>,
        filter_storage: Option<Rc<dyn Storage>>,
        alerts: Box<dyn AlertSink>,
        options: AppOptions,
    ) -> Result<Self, HydrateError> {
        Self::start_with_store(TaskStore::new(), tasks, filter_storage, alerts, options)
    }

    pub fn start_with_store(
        mut store: TaskStore,
        tasks: Rc<dyn Storage>,
        filter_storage: Option<Rc<dyn Storage>>,
        alerts: Box<dyn AlertSink>,
        options: AppOptions,
    ) -> Result<Self, HydrateError> {
        let sync = PersistenceSynchronizer::attach(&mut store, tasks)?;
        let mode = filter_storage
            .as_deref()
            .map(|storage| load_filter(storage, options.default_filter))
            .unwrap_or(options.default_filter);
        let selector = FilterSelector::attach(&mut store, mode);

        info!(tasks = store.len(), filter = %mode, "app started");
        Ok(Self {
            store,
            selector,
            sync,
            filter_storage,
            alerts,
            options,
        })
    }

    #[instrument(skip(self, raw))]
    pub fn submit_new_task(&mut self, raw: &str) -> Result<TaskId, ValidationError> {
        match validate_title_with_min(raw, self.options.min_title_length) {
            Ok(title) => Ok(self.store.add_task(title)),
            Err(err) => {
                debug!(kind = ?err.kind, "new task rejected");
                self.warn_user(MISSING_TITLE_TEXT);
                Err(err)
            }
        }
    }

    pub fn delete(&mut self, id: TaskId) {
        self.store.delete_task(id);
    }

    pub fn toggle(&mut self, id: TaskId) {
        self.store.toggle_checked(id);
    }

    pub fn enter_edit(&mut self, id: TaskId) {
        self.store.enter_edit_mode(id);
    }

    #[instrument(skip(self, text))]
    pub fn commit_edit(&mut self, id: TaskId, text: &str) -> Result<(), EmptyTitleError> {
        self.store.commit_title_edit(id, text).inspect_err(|_| {
            self.warn_user(EMPTY_EDIT_TEXT);
        })
    }

    pub fn delete_completed(&mut self) {
        self.store.delete_completed();
    }

    #[instrument(skip(self))]
    pub fn change_filter(&mut self, mode: FilterMode) {
        self.selector.set_filter(mode);
        if let Some(storage) = &self.filter_storage
            && let Err(err) = storage.save(mode.as_str())
        {
            warn!(key = %storage.key(), error = %format!("{err:#}"), "failed to save filter");
        }
    }

    pub fn current_filter(&self) -> FilterMode {
        self.selector.current_filter()
    }

    pub fn view(&self) -> Vec<Task> {
        self.selector.view()
    }

    pub fn completed_count(&self) -> usize {
        self.selector.completed_count()
    }

    pub fn filtered_count(&self) -> usize {
        self.selector.filtered_count()
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.snapshot()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.store.get(id)
    }

    /// Stops listening and hands back the final collection.
    pub fn shutdown(self) -> Vec<Task> {
        let Self {
            mut store,
            selector,
            sync,
            ..
        } = self;
        selector.detach(&mut store);
        sync.detach(&mut store);
        debug!(tasks = store.len(), "app shut down");
        store.snapshot().to_vec()
    }

    fn warn_user(&self, text: &str) {
        self.alerts.show_alert(&Alert {
            title: WARNING_TITLE.to_string(),
            text: text.to_string(),
            severity: Severity::Warning,
            timeout: self.options.alert_timeout,
        });
    }
}

fn load_filter(storage: &dyn Storage, fallback: FilterMode) -> FilterMode {
    match storage.load() {
        Ok(Some(raw)) => raw.parse().unwrap_or_else(|err: anyhow::Error| {
            warn!(key = %storage.key(), error = %err, "ignoring stored filter");
            fallback
        }),
        Ok(None) => fallback,
        Err(err) => {
            warn!(key = %storage.key(), error = %format!("{err:#}"), "failed to read stored filter");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{App, AppOptions};
    use crate::alert::{Alert, AlertSink, Severity};
    use crate::error::{EmptyTitleError, ValidationErrorKind};
    use crate::filter::FilterMode;
    use crate::storage::{MemoryStorage, Storage};

    #[derive(Clone, Default)]
    struct RecordedAlerts(Rc<RefCell<Vec<Alert>>>);

    impl AlertSink for RecordedAlerts {
        fn show_alert(&self, alert: &Alert) {
            self.0.borrow_mut().push(alert.clone());
        }
    }

    fn start(storage: &MemoryStorage, alerts: &RecordedAlerts) -> App {
        App::start(
            Rc::new(storage.clone()),
            Some(Rc::new(storage.sibling("mydayapp-js-filter"))),
            Box::new(alerts.clone()),
            AppOptions::default(),
        )
        .expect("start app")
    }

    #[test]
    fn short_title_warns_and_creates_nothing() {
        let storage = MemoryStorage::new("mydayapp-js");
        let alerts = RecordedAlerts::default();
        let mut app = start(&storage, &alerts);

        let err = app.submit_new_task("ab").expect_err("too short");
        assert_eq!(err.kind, ValidationErrorKind::TooShort);
        assert!(app.tasks().is_empty());

        let shown = alerts.0.borrow();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].severity, Severity::Warning);
        assert_eq!(shown[0].text, "Please provide a title for the task.");
    }

    #[test]
    fn empty_edit_warns_and_keeps_title() {
        let storage = MemoryStorage::new("mydayapp-js");
        let alerts = RecordedAlerts::default();
        let mut app = start(&storage, &alerts);

        let id = app.submit_new_task("Buy milk").expect("add");
        app.enter_edit(id);
        assert_eq!(app.commit_edit(id, "   "), Err(EmptyTitleError));

        let task = app.get(id).expect("task");
        assert_eq!(task.title, "Buy milk");
        assert!(task.editing);
        assert_eq!(alerts.0.borrow()[0].text, "The task title cannot be empty.");
    }

    #[test]
    fn filter_choice_survives_restart() {
        let storage = MemoryStorage::new("mydayapp-js");
        let alerts = RecordedAlerts::default();

        let mut app = start(&storage, &alerts);
        let milk = app.submit_new_task("Buy milk").expect("add");
        app.submit_new_task("Walk dog").expect("add");
        app.toggle(milk);
        app.change_filter(FilterMode::Completed);
        let tasks = app.shutdown();
        assert_eq!(tasks.len(), 2);

        let app = start(&storage, &alerts);
        assert_eq!(app.current_filter(), FilterMode::Completed);
        let shown: Vec<_> = app.view().into_iter().map(|t| t.title).collect();
        assert_eq!(shown, vec!["Buy milk"]);
        assert_eq!(app.completed_count(), 1);
        assert_eq!(app.filtered_count(), 1);
    }

    #[test]
    fn unknown_stored_filter_falls_back_to_default() {
        let storage = MemoryStorage::new("mydayapp-js");
        storage
            .sibling("mydayapp-js-filter")
            .save("someday")
            .expect("seed");
        let alerts = RecordedAlerts::default();

        let app = start(&storage, &alerts);
        assert_eq!(app.current_filter(), FilterMode::All);
    }

    #[test]
    fn view_tracks_deletions() {
        let storage = MemoryStorage::new("mydayapp-js");
        let alerts = RecordedAlerts::default();
        let mut app = start(&storage, &alerts);

        let milk = app.submit_new_task("Buy milk").expect("add");
        let dog = app.submit_new_task("Walk dog").expect("add");
        let book = app.submit_new_task("Read book").expect("add");
        app.toggle(milk);
        app.toggle(book);
        app.delete_completed();

        let shown: Vec<_> = app.view().into_iter().map(|t| t.id).collect();
        assert_eq!(shown, vec![dog]);

        app.delete(dog);
        assert!(app.view().is_empty());
    }
}
