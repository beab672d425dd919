use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::filter::FilterMode;
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);
        Ok(Self { color })
    }

    pub fn color(&self) -> bool {
        self.color
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_list(
        &self,
        tasks: &[Task],
        mode: FilterMode,
        completed: usize,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let painted = io::stdout().is_terminal() && self.color;
        self.write_task_list(&mut out, tasks, mode, completed, painted)
    }

    fn write_task_list<W: Write>(
        &self,
        mut out: W,
        tasks: &[Task],
        mode: FilterMode,
        completed: usize,
        painted: bool,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "{}", empty_message(mode))?;
        } else {
            let headers = vec!["ID".to_string(), "Done".to_string(), "Title".to_string()];
            let rows = tasks
                .iter()
                .map(|task| {
                    let id = paint(&task.id.to_string(), "33", painted);
                    let done = if task.completed { "[x]" } else { "[ ]" }.to_string();
                    let title = if task.completed {
                        paint(&task.title, "2;9", painted)
                    } else if task.editing {
                        format!("{} {}", task.title, paint("(editing)", "36", painted))
                    } else {
                        task.title.clone()
                    };
                    vec![id, done, title]
                })
                .collect();
            write_table(&mut out, headers, rows)?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "{completed} completed, {} shown ({})",
            tasks.len(),
            mode
        )?;
        Ok(())
    }
}

fn empty_message(mode: FilterMode) -> &'static str {
    match mode {
        FilterMode::All => "No tasks.",
        FilterMode::Pending => "No pending tasks.",
        FilterMode::Completed => "No completed tasks.",
    }
}

fn paint(text: &str, code: &str, painted: bool) -> String {
    if !painted {
        return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let last = column_count.saturating_sub(1);
    for (idx, header) in headers.iter().enumerate() {
        if idx == last {
            writeln!(writer, "{header}")?;
        } else {
            write!(writer, "{:width$} ", header, width = widths[idx])?;
        }
    }

    for (idx, width) in widths.iter().enumerate() {
        let sep = if idx == last { "\n" } else { " " };
        write!(writer, "{:-<width$}{sep}", "", width = *width)?;
    }

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if idx == last {
                writeln!(writer, "{cell}")?;
                continue;
            }
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
