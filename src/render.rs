//! Plain-text rendering of progress for the terminal.
//!
//! Pure functions over engine queries; callers re-render after every mutation.

use reqwest::Url;

use crate::catalog::DocumentationIndex;
use crate::progress::{ProgressEngine, ProgressFraction, StepStatus};
use crate::store::ProgressStore;

const BAR_WIDTH: usize = 30;

/// Shorten a documentation link to its last two path segments.
///
/// Paths with two or fewer segments are shown whole; unparseable input is
/// returned unchanged.
pub fn format_doc_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let path = parsed.path();
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() > 2 {
        format!("{}/", parts[parts.len() - 2..].join("/"))
    } else {
        path.to_string()
    }
}

pub fn progress_bar(fraction: ProgressFraction, width: usize) -> String {
    let filled = if fraction.total == 0 {
        0
    } else {
        (fraction.completed * width / fraction.total).min(width)
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "[x]",
        StepStatus::InProgress => "[>]",
        StepStatus::Skipped => "[!]",
        StepStatus::Pending => "[ ]",
    }
}

/// "Step X of N" for the cursor, or the finished banner
pub fn position_line<S: ProgressStore>(engine: &ProgressEngine<S>) -> String {
    if engine.is_terminal() {
        format!("Finished all {} steps", engine.step_count())
    } else {
        format!(
            "Step {} of {}",
            engine.current_step() + 1,
            engine.step_count()
        )
    }
}

/// Position, percentage and bar
pub fn render_status<S: ProgressStore>(engine: &ProgressEngine<S>) -> String {
    let fraction = engine.progress_fraction();
    let mut lines = vec![
        position_line(engine),
        format!(
            "{} {:>3}%  ({} of {} counted steps complete)",
            progress_bar(fraction, BAR_WIDTH),
            fraction.percentage(),
            fraction.completed,
            fraction.total
        ),
    ];
    if let Some(step) = engine.current() {
        lines.push(format!("Current: {}", step.title));
    }
    lines.join("\n")
}

/// One line per step with its status marker
pub fn render_step_list<S: ProgressStore>(engine: &ProgressEngine<S>) -> String {
    let catalog = engine.catalog();
    let width = catalog.len().to_string().len();
    catalog
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let mut line = format!(
                "{} {:>width$}. {}",
                status_marker(engine.step_status(i)),
                i + 1,
                step.title,
            );
            if catalog.is_progress_exempt(i) {
                line.push_str("  (optional)");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full view of the step at `index`, or the finished view at the terminal index
pub fn render_step<S: ProgressStore>(engine: &ProgressEngine<S>, index: usize) -> String {
    let Some(step) = engine.catalog().get(index) else {
        return render_finished(engine);
    };

    let mut lines = vec![
        format!("Step {} of {}: {}", index + 1, engine.step_count(), step.title),
        format!("id: {}", step.id),
    ];
    if !step.description.is_empty() {
        lines.push(String::new());
        lines.push(step.description.clone());
    }
    if let Some(notice) = &step.notice {
        lines.push(String::new());
        lines.push(format!("WARNING: {notice}"));
    }
    if let Some(commands) = &step.commands {
        lines.push(String::new());
        lines.extend(commands.lines().map(|l| format!("    {l}")));
    }
    if let Some(link) = &step.dashboard_link {
        lines.push(String::new());
        lines.push(format!("Dashboard: {link}"));
    }

    let (done, required) = engine.required_tally(index);
    lines.push(String::new());
    lines.push(format!("Checkpoints ({done}/{required} required done):"));
    for checkpoint in &step.checkpoints {
        let mark = if engine.is_checkpoint_completed(&step.id, &checkpoint.id) {
            "[x]"
        } else {
            "[ ]"
        };
        let kind = if checkpoint.optional {
            "optional"
        } else {
            "required"
        };
        lines.push(format!("  {mark} {:<28} {} ({kind})", checkpoint.id, checkpoint.label));
    }

    if !step.documentation.is_empty() {
        lines.push(String::new());
        lines.push("Documentation:".to_string());
        for url in &step.documentation {
            lines.push(format!("  {}  <{url}>", format_doc_url(url)));
        }
    }

    if index == engine.current_step() {
        lines.push(String::new());
        lines.push(next_hint(engine));
    }

    lines.join("\n")
}

fn next_hint<S: ProgressStore>(engine: &ProgressEngine<S>) -> String {
    let is_last = engine.current_step() + 1 == engine.step_count();
    if engine.can_advance() {
        if is_last {
            "Run `cutover next` to complete the migration.".to_string()
        } else {
            "Run `cutover next` to continue.".to_string()
        }
    } else {
        let (done, required) = engine.required_tally(engine.current_step());
        format!(
            "{} required checkpoint(s) left before `cutover next`.",
            required - done
        )
    }
}

pub fn render_finished<S: ProgressStore>(engine: &ProgressEngine<S>) -> String {
    let mut lines = vec![
        "Migration complete".to_string(),
        format!(
            "All {} steps finished. Run `cutover reset` to start a new migration.",
            engine.step_count()
        ),
    ];
    let state = engine.state();
    if let Some(started) = state.started_at {
        lines.push(format!("Started:   {}", started.format("%Y-%m-%d %H:%M UTC")));
    }
    if let Some(completed) = state.completed_at {
        lines.push(format!("Completed: {}", completed.format("%Y-%m-%d %H:%M UTC")));
    }
    lines.join("\n")
}

/// Documentation links, optionally limited to one topic
pub fn render_documentation(index: &DocumentationIndex, topic: Option<&str>) -> Option<String> {
    let mut lines = Vec::new();
    for (name, links) in index {
        if topic.is_some_and(|t| t != name.as_str()) {
            continue;
        }
        lines.push(format!("{name}:"));
        lines.extend(
            links
                .iter()
                .map(|url| format!("  {}  <{url}>", format_doc_url(url))),
        );
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
