use std::io::{self, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument};

use crate::app::App;
use crate::cli::Invocation;
use crate::filter::{FilterMode, filtered_tasks};
use crate::render::Renderer;
use crate::task::TaskId;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "list",
        "toggle",
        "delete",
        "edit",
        "commit",
        "filter",
        "clear-completed",
        "count",
        "help",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(app, renderer, inv), fields(command = %inv.command))]
pub fn dispatch(app: &mut App, renderer: &Renderer, inv: Invocation) -> anyhow::Result<()> {
    let args = inv.command_args.as_slice();
    debug!(args = args.len(), "dispatching");

    match inv.command.as_str() {
        "add" => cmd_add(app, args),
        "list" => cmd_list(app, renderer, args),
        "toggle" => {
            let id = parse_id(args)?;
            app.toggle(id);
            report(app, id, |done| {
                if done { "completed" } else { "reopened" }
            })
        }
        "delete" => {
            let id = parse_id(args)?;
            let existed = app.get(id).is_some();
            app.delete(id);
            if existed {
                println!("Deleted task {id}.");
            } else {
                println!("No task {id}.");
            }
            Ok(())
        }
        "edit" => cmd_edit(app, args),
        "commit" => cmd_commit(app, args),
        "filter" => cmd_filter(app, args),
        "clear-completed" => {
            let before = app.tasks().len();
            app.delete_completed();
            println!("Deleted {} completed tasks.", before - app.tasks().len());
            Ok(())
        }
        "count" => {
            println!(
                "{} completed, {} shown ({})",
                app.completed_count(),
                app.filtered_count(),
                app.current_filter()
            );
            Ok(())
        }
        "help" => cmd_help(),
        other => Err(anyhow!("unsupported command: {other}")),
    }
}

#[instrument(skip(app, args))]
fn cmd_add(app: &mut App, args: &[String]) -> anyhow::Result<()> {
    info!("command add");
    let raw = args.join(" ");
    let id = app
        .submit_new_task(&raw)
        .context("task not created")?;
    println!("Created task {id}.");
    Ok(())
}

#[instrument(skip(app, renderer, args))]
fn cmd_list(app: &App, renderer: &Renderer, args: &[String]) -> anyhow::Result<()> {
    let (mode, tasks) = match args.first() {
        Some(raw) => {
            let mode: FilterMode = raw.parse()?;
            (mode, filtered_tasks(app.tasks(), mode))
        }
        None => (app.current_filter(), app.view()),
    };
    renderer.print_task_list(&tasks, mode, app.completed_count())
}

#[instrument(skip(app, args))]
fn cmd_edit(app: &mut App, args: &[String]) -> anyhow::Result<()> {
    let id = parse_id(args)?;
    app.enter_edit(id);
    match app.get(id) {
        Some(task) if task.editing => println!("Editing task {id}: {}", task.title),
        Some(_) => println!("Task {id} is completed and cannot be edited."),
        None => println!("No task {id}."),
    }
    Ok(())
}

#[instrument(skip(app, args))]
fn cmd_commit(app: &mut App, args: &[String]) -> anyhow::Result<()> {
    let id = parse_id(args)?;
    let text = args[1..].join(" ");
    app.commit_edit(id, &text)
        .context("title not changed")?;
    match app.get(id) {
        Some(task) if task.completed => {
            println!("Task {id} is completed and cannot be edited.");
            Ok(())
        }
        _ => report(app, id, |_| "renamed"),
    }
}

#[instrument(skip(app, args))]
fn cmd_filter(app: &mut App, args: &[String]) -> anyhow::Result<()> {
    if let Some(raw) = args.first() {
        let mode: FilterMode = raw.parse()?;
        app.change_filter(mode);
        println!("Filter set to {mode}.");
    } else {
        println!("{}", app.current_filter());
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "usage: myday [options] <command> [args]")?;
    writeln!(out)?;
    for (name, about) in [
        ("add <title..>", "create a task"),
        ("list [mode]", "show tasks (all, pending, completed)"),
        ("toggle <id>", "flip a task between pending and completed"),
        ("delete <id>", "remove a task"),
        ("edit <id>", "mark a pending task as being edited"),
        ("commit <id> <title..>", "save a new title"),
        ("filter [mode]", "show or set the active filter"),
        ("clear-completed", "remove every completed task"),
        ("count", "show completed and shown counts"),
    ] {
        writeln!(out, "  {name:<24}{about}")?;
    }
    Ok(())
}

fn report<F>(app: &App, id: TaskId, verb: F) -> anyhow::Result<()>
where
    F: FnOnce(bool) -> &'static str,
{
    match app.get(id) {
        Some(task) => println!("Task {id} {}: {}", verb(task.completed), task.title),
        None => println!("No task {id}."),
    }
    Ok(())
}

fn parse_id(args: &[String]) -> anyhow::Result<TaskId> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("missing task id"))?;
    raw.parse::<TaskId>()
        .with_context(|| format!("invalid task id: {raw}"))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{dispatch, expand_command_abbrev, known_command_names, parse_id};
    use crate::alert::{Alert, AlertSink};
    use crate::app::{App, AppOptions};
    use crate::cli::Invocation;
    use crate::config::Config;
    use crate::render::Renderer;
    use crate::storage::MemoryStorage;

    #[derive(Clone, Default)]
    struct Silent(Rc<RefCell<usize>>);

    impl AlertSink for Silent {
        fn show_alert(&self, _alert: &Alert) {
            *self.0.borrow_mut() += 1;
        }
    }

    fn invocation(command: &str, args: &[&str]) -> Invocation {
        Invocation {
            command: command.to_string(),
            command_args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn exact_names_win_over_prefixes() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("add", &known), Some("add"));
        assert_eq!(expand_command_abbrev("cl", &known), Some("clear-completed"));
        assert_eq!(expand_command_abbrev("co", &known), None);
    }

    #[test]
    fn ids_must_be_numeric() {
        assert!(parse_id(&[]).is_err());
        assert!(parse_id(&["abc".to_string()]).is_err());
        assert_eq!(parse_id(&["42".to_string()]).expect("id"), 42);
    }

    #[test]
    fn commands_drive_the_app() {
        let alerts = Silent::default();
        let storage = MemoryStorage::new("mydayapp-js");
        let mut app = App::start(
            Rc::new(storage.clone()),
            None,
            Box::new(alerts.clone()),
            AppOptions::default(),
        )
        .expect("start");
        let renderer = Renderer::new(&Config::default()).expect("renderer");

        dispatch(&mut app, &renderer, invocation("add", &["Buy", "milk"])).expect("add");
        assert!(dispatch(&mut app, &renderer, invocation("add", &["ab"])).is_err());
        assert_eq!(*alerts.0.borrow(), 1);

        let id = app.tasks()[0].id.to_string();
        dispatch(&mut app, &renderer, invocation("toggle", &[id.as_str()])).expect("toggle");
        dispatch(&mut app, &renderer, invocation("filter", &["completed"])).expect("filter");
        assert_eq!(app.filtered_count(), 1);

        dispatch(&mut app, &renderer, invocation("clear-completed", &[])).expect("clear");
        assert!(app.tasks().is_empty());
        assert_eq!(storage.raw().as_deref(), Some("[]"));
    }
}
