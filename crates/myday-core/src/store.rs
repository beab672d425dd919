use tracing::{debug, instrument, trace};

use crate::error::EmptyTitleError;
use crate::task::{IdGenerator, Task, TaskId};

pub type Listener = Box<dyn FnMut(&[Task])>;

/// Handle returned by [`TaskStore::subscribe`]; pass it back to
/// [`TaskStore::unsubscribe`] to stop receiving snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Sole owner of the ordered task collection.
///
/// Every mutating call finishes its change first and then hands the new
/// snapshot to each listener, in registration order, before returning.
pub struct TaskStore {
    tasks: Vec<Task>,
    ids: IdGenerator,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks)
            .field("ids", &self.ids)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_ids(IdGenerator::default())
    }

    pub fn with_ids(ids: IdGenerator) -> Self {
        Self {
            tasks: Vec::new(),
            ids,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Appends a pending task. `title` must already be trimmed and validated.
    #[instrument(skip(self, title))]
    pub fn add_task(&mut self, title: String) -> TaskId {
        debug_assert!(!title.trim().is_empty());
        let id = self.ids.next_id(&self.tasks);
        self.tasks.push(Task::new_pending(id, title));
        debug!(id, count = self.tasks.len(), "task added");
        self.notify();
        id
    }

    #[instrument(skip(self))]
    pub fn delete_task(&mut self, id: TaskId) {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        debug!(id, removed = before - self.tasks.len(), "delete task");
        self.notify();
    }

    #[instrument(skip(self))]
    pub fn toggle_checked(&mut self, id: TaskId) {
        if let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) {
            task.completed = !task.completed;
            // Completed tasks are never in edit mode.
            task.editing &= !task.completed;
            debug!(id, completed = task.completed, "toggled task");
        }
        self.notify();
    }

    /// Puts `id` into edit mode unless it is completed. Any other task
    /// leaves edit mode either way.
    #[instrument(skip(self))]
    pub fn enter_edit_mode(&mut self, id: TaskId) {
        for task in &mut self.tasks {
            task.editing = task.id == id && !task.completed;
        }
        trace!(id, "edit mode updated");
        self.notify();
    }

    #[instrument(skip(self, new_title))]
    pub fn commit_title_edit(
        &mut self,
        id: TaskId,
        new_title: &str,
    ) -> Result<(), EmptyTitleError> {
        let trimmed = new_title.trim();
        if trimmed.is_empty() {
            debug!(id, "rejected empty title edit");
            return Err(EmptyTitleError);
        }

        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) if task.completed => {
                debug!(id, "ignored title edit on completed task");
            }
            Some(task) => {
                task.title = trimmed.to_string();
                task.editing = false;
                debug!(id, "title updated");
            }
            None => {}
        }
        self.notify();
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_completed(&mut self) {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.completed);
        debug!(
            before,
            after = self.tasks.len(),
            "deleted completed tasks"
        );
        self.notify();
    }

    /// Swaps in a previously persisted collection as-is.
    #[instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.ids.observe(&tasks);
        self.tasks = tasks;
        self.notify();
    }

    pub fn snapshot(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn editing(&self) -> Option<&Task> {
        self.tasks.iter().find(|task| task.editing)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&[Task]) + 'static,
    {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((subscription, Box::new(listener)));
        trace!(?subscription, "listener registered");
        subscription
    }

    /// Returns `false` when the subscription was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != subscription);
        before != self.listeners.len()
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener(&self.tasks);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::TaskStore;
    use crate::error::EmptyTitleError;
    use crate::task::{IdGenerator, Task};

    fn store_with(titles: &[&str]) -> TaskStore {
        let mut store = TaskStore::with_ids(IdGenerator::with_clock(|| 100));
        for title in titles {
            store.add_task((*title).to_string());
        }
        store
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.title.as_str()).collect()
    }

    #[test]
    fn add_appends_pending_task() {
        let mut store = TaskStore::new();
        store.add_task("Buy milk".to_string());

        assert_eq!(store.len(), 1);
        let task = &store.snapshot()[0];
        assert_eq!(task.title, "Buy milk");
        assert!(!task.completed);
        assert!(!task.editing);
    }

    #[test]
    fn back_to_back_adds_get_distinct_ids() {
        let mut store = TaskStore::new();
        let a = store.add_task("First".to_string());
        let b = store.add_task("Second".to_string());
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn delete_of_unknown_id_changes_nothing() {
        let mut store = store_with(&["Buy milk", "Walk dog"]);
        let before = store.snapshot().to_vec();
        store.delete_task(42);
        assert_eq!(store.snapshot(), before.as_slice());
    }

    #[test]
    fn delete_removes_only_matching_task() {
        let mut store = store_with(&["Buy milk", "Walk dog", "Read"]);
        let id = store.snapshot()[1].id;
        store.delete_task(id);
        assert_eq!(titles(store.snapshot()), vec!["Buy milk", "Read"]);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut store = store_with(&["Buy milk"]);
        let id = store.snapshot()[0].id;

        store.toggle_checked(id);
        assert!(store.snapshot()[0].completed);
        store.toggle_checked(id);
        assert!(!store.snapshot()[0].completed);
    }

    #[test]
    fn only_one_task_edits_at_a_time() {
        let mut store = store_with(&["Buy milk", "Walk dog"]);
        let first = store.snapshot()[0].id;
        let second = store.snapshot()[1].id;

        store.enter_edit_mode(first);
        assert_eq!(store.editing().map(|task| task.id), Some(first));

        store.enter_edit_mode(second);
        assert_eq!(store.editing().map(|task| task.id), Some(second));
        assert_eq!(store.snapshot().iter().filter(|t| t.editing).count(), 1);
    }

    #[test]
    fn completed_task_refuses_edit_but_clears_others() {
        let mut store = store_with(&["Buy milk", "Walk dog"]);
        let first = store.snapshot()[0].id;
        let second = store.snapshot()[1].id;

        store.enter_edit_mode(first);
        store.toggle_checked(second);
        store.enter_edit_mode(second);

        assert!(store.editing().is_none());
    }

    #[test]
    fn commit_edit_trims_and_leaves_edit_mode() {
        let mut store = store_with(&["Buy milk"]);
        let id = store.snapshot()[0].id;
        store.enter_edit_mode(id);

        store
            .commit_title_edit(id, "  Buy oat milk ")
            .expect("commit edit");

        let task = &store.snapshot()[0];
        assert_eq!(task.title, "Buy oat milk");
        assert!(!task.editing);
    }

    #[test]
    fn blank_commit_is_rejected_and_keeps_editing() {
        let mut store = store_with(&["Buy milk"]);
        let id = store.snapshot()[0].id;
        store.enter_edit_mode(id);

        assert_eq!(store.commit_title_edit(id, "   "), Err(EmptyTitleError));

        let task = &store.snapshot()[0];
        assert_eq!(task.title, "Buy milk");
        assert!(task.editing);
    }

    #[test]
    fn delete_completed_keeps_pending() {
        let mut store = store_with(&["Buy milk", "Walk dog", "Read"]);
        let ids: Vec<_> = store.snapshot().iter().map(|t| t.id).collect();
        store.toggle_checked(ids[0]);
        store.toggle_checked(ids[2]);

        store.delete_completed();
        assert_eq!(titles(store.snapshot()), vec!["Walk dog"]);
    }

    #[test]
    fn listeners_fire_in_order_after_each_mutation() {
        let mut store = TaskStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&seen);
        store.subscribe(move |tasks| first.borrow_mut().push(("first", tasks.len())));
        let second = Rc::clone(&seen);
        let sub = store.subscribe(move |tasks| second.borrow_mut().push(("second", tasks.len())));

        store.add_task("Buy milk".to_string());
        assert_eq!(*seen.borrow(), vec![("first", 1), ("second", 1)]);

        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.delete_completed();
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn toggling_an_editing_task_ends_edit_mode() {
        let mut store = store_with(&["Buy milk"]);
        let id = store.snapshot()[0].id;
        store.enter_edit_mode(id);

        store.toggle_checked(id);
        let task = &store.snapshot()[0];
        assert!(task.completed);
        assert!(!task.editing);

        store.toggle_checked(id);
        assert!(!store.snapshot()[0].editing);
    }

    #[test]
    fn completed_task_keeps_its_title_on_commit() {
        let mut store = store_with(&["Buy milk"]);
        let id = store.snapshot()[0].id;
        store.toggle_checked(id);

        store.commit_title_edit(id, "Buy bread").expect("commit edit");
        assert_eq!(store.snapshot()[0].title, "Buy milk");
    }

    #[test]
    fn loaded_max_id_does_not_get_reused() {
        let mut store = TaskStore::with_ids(IdGenerator::with_clock(|| 1));
        store.replace_all(vec![Task::new_pending(u64::MAX, "Loaded".to_string())]);

        let a = store.add_task("Fresh".to_string());
        let b = store.add_task("Fresher".to_string());
        assert_ne!(a, u64::MAX);
        assert_ne!(b, u64::MAX);
        assert_ne!(a, b);
    }

    #[test]
    fn replace_all_keeps_new_ids_ahead_of_loaded_ones() {
        let mut store = TaskStore::with_ids(IdGenerator::with_clock(|| 1));
        store.replace_all(vec![Task::new_pending(500, "Loaded".to_string())]);
        let id = store.add_task("Fresh".to_string());
        assert_eq!(id, 501);
    }
}
