use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::{
  debug,
  trace
};

use crate::store::{
  Subscription,
  TaskStore
};
use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum FilterMode {
  #[default]
  All,
  Pending,
  Completed
}

impl FilterMode {
  pub fn as_str(self) -> &'static str {
    match self {
      | FilterMode::All => "all",
      | FilterMode::Pending => {
        "pending"
      }
      | FilterMode::Completed => {
        "completed"
      }
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | FilterMode::All => true,
      | FilterMode::Pending => {
        !task.completed
      }
      | FilterMode::Completed => {
        task.completed
      }
    }
  }
}

impl fmt::Display for FilterMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FilterMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(FilterMode::All),
      | "pending" => {
        Ok(FilterMode::Pending)
      }
      | "completed" => {
        Ok(FilterMode::Completed)
      }
      | other => Err(anyhow!(
        "unknown filter `{other}`; \
         expected all, pending or \
         completed"
      ))
    }
  }
}

pub fn filtered_tasks(
  tasks: &[Task],
  mode: FilterMode
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|task| mode.matches(task))
    .cloned()
    .collect()
}

/// Counts over the full collection,
/// whatever filter is active.
pub fn completed_count(
  tasks: &[Task]
) -> usize {
  tasks
    .iter()
    .filter(|task| task.completed)
    .count()
}

pub fn filtered_count(
  tasks: &[Task],
  mode: FilterMode
) -> usize {
  tasks
    .iter()
    .filter(|task| mode.matches(task))
    .count()
}

#[derive(Debug, Default)]
struct ViewState {
  mode:  FilterMode,
  tasks: Vec<Task>,
  view:  Vec<Task>
}

impl ViewState {
  fn recompute(&mut self) {
    self.view = filtered_tasks(
      &self.tasks,
      self.mode
    );
    trace!(
      mode = %self.mode,
      total = self.tasks.len(),
      shown = self.view.len(),
      "recomputed filtered view"
    );
  }
}

/// Holds the active filter and a view
/// derived from the store it is attached
/// to. Never mutates the store.
#[derive(Debug, Clone)]
pub struct FilterSelector {
  state:        Rc<RefCell<ViewState>>,
  subscription: Subscription
}

impl FilterSelector {
  pub fn attach(
    store: &mut TaskStore,
    mode: FilterMode
  ) -> Self {
    let state =
      Rc::new(RefCell::new(ViewState {
        mode,
        tasks: store
          .snapshot()
          .to_vec(),
        view: Vec::new()
      }));
    state.borrow_mut().recompute();

    let listener_state =
      Rc::clone(&state);
    let subscription = store.subscribe(
      move |tasks| {
        let mut state =
          listener_state.borrow_mut();
        state.tasks = tasks.to_vec();
        state.recompute();
      }
    );

    debug!(%mode, "filter selector attached");
    Self {
      state,
      subscription
    }
  }

  pub fn set_filter(
    &self,
    mode: FilterMode
  ) {
    let mut state =
      self.state.borrow_mut();
    state.mode = mode;
    state.recompute();
  }

  pub fn current_filter(
    &self
  ) -> FilterMode {
    self.state.borrow().mode
  }

  pub fn view(&self) -> Vec<Task> {
    self.state.borrow().view.clone()
  }

  pub fn completed_count(
    &self
  ) -> usize {
    completed_count(
      &self.state.borrow().tasks
    )
  }

  pub fn filtered_count(
    &self
  ) -> usize {
    self.state.borrow().view.len()
  }

  pub fn detach(
    self,
    store: &mut TaskStore
  ) {
    store
      .unsubscribe(self.subscription);
  }
}
