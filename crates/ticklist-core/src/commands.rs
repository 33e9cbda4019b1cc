use std::io::Write;

use anyhow::{Context, anyhow, bail};
use chrono::Utc;
use serde_json::Value;
use ticklist_shared::TaskDraft;
use tokio::io::BufReader;
use tracing::{debug, info};
use uuid::Uuid;

use crate::app::App;
use crate::cache::StateCache;
use crate::cli::Command;
use crate::config::{Config, HostSettings, parse_flag};
use crate::handlers::{self, Outcome};
use crate::host::{HostSink, stdio_shell};
use crate::menu::{MenuInput, build_menu};
use crate::prefs::Preference;
use crate::runtime::{HostLoopOptions, run_host, wait_for_shutdown_signal};
use crate::store::Store;
use crate::task::{Task, TaskList};

/// Shortest id prefix accepted as a task reference.
const MIN_ID_PREFIX: usize = 4;

#[tracing::instrument(skip(store, cfg, out))]
pub fn dispatch(
    store: &mut Store,
    cfg: &Config,
    command: Command,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let cache = StateCache::load(store)?;

    match command {
        Command::Run => bail!("`run` starts the tray loop; use run_tray"),
        Command::Add { text } => cmd_add(store, &cache, &text.join(" "), out),
        Command::List { completed } => {
            let list = if completed {
                TaskList::Completed
            } else {
                TaskList::Pending
            };
            cmd_list(&cache, list, out)
        }
        Command::Done { task } => cmd_done(store, &cache, &task, out),
        Command::Edit { task, text } => cmd_edit(store, &cache, &task, &text.join(" "), out),
        Command::Delete { task, completed } => {
            let list = if completed {
                TaskList::Completed
            } else {
                TaskList::Pending
            };
            cmd_delete(store, &cache, list, &task, out)
        }
        Command::ClearCompleted => {
            let cleared = cache.completed().len();
            handlers::clear_completed(store)?;
            writeln!(out, "Cleared {cleared} completed task(s).")?;
            Ok(())
        }
        Command::ClearAll { yes } => cmd_clear_all(store, &cache, yes, out),
        Command::Prefs => {
            for (key, value) in cache.preferences() {
                writeln!(out, "{key} = {value}")?;
            }
            Ok(())
        }
        Command::Set { key, value } => cmd_set(store, &key, &value, out),
        Command::Menu => {
            let menu = build_menu(&MenuInput::from_cache(&cache));
            let text = serde_json::to_string_pretty(&menu).context("failed to encode menu")?;
            writeln!(out, "{text}")?;
            debug!(config_files = cfg.loaded_files.len(), "printed menu");
            Ok(())
        }
    }
}

/// Starts the tray and serves the host on stdin/stdout until it quits or a
/// shutdown signal arrives.
#[tracing::instrument(skip_all)]
pub fn run_tray(store: Store, cfg: &Config) -> anyhow::Result<()> {
    let settings = HostSettings::from_config(cfg);
    let shell = stdio_shell(HostSink::stdout(), &settings);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let mut app = App::start(store, shell)?;
    let options = HostLoopOptions {
        accent_debounce: settings.accent_debounce,
    };
    runtime.block_on(run_host(
        &mut app,
        BufReader::new(tokio::io::stdin()),
        options,
        wait_for_shutdown_signal(),
    ))
}

fn cmd_add(
    store: &mut Store,
    cache: &StateCache,
    text: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let draft = TaskDraft::from_input(text).ok_or_else(|| anyhow!("task text is empty"))?;
    handlers::add_task(store, cache, draft, Utc::now())?;
    writeln!(out, "Added task 1.")?;
    Ok(())
}

fn cmd_list(cache: &StateCache, list: TaskList, out: &mut dyn Write) -> anyhow::Result<()> {
    let tasks = match list {
        TaskList::Pending => cache.tasks(),
        TaskList::Completed => cache.completed(),
    };
    if tasks.is_empty() {
        writeln!(out, "No tasks.")?;
        return Ok(());
    }

    for (index, task) in tasks.iter().enumerate() {
        let id = task.id.simple().to_string();
        writeln!(out, "{:>3}  {}  {}", index + 1, &id[..8], task.text)?;
    }
    Ok(())
}

fn cmd_done(
    store: &mut Store,
    cache: &StateCache,
    reference: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let id = resolve_task_ref(cache.tasks(), reference)?;

    // Auto-clear turns completion into deletion, same as the tray.
    let outcome = if cache.pref(Preference::AutomaticallyClear) {
        handlers::delete_task(store, cache, TaskList::Pending, id)?
    } else {
        handlers::complete_task(store, cache, id)?
    };
    report(outcome, "Completed task.", out)
}

fn cmd_edit(
    store: &mut Store,
    cache: &StateCache,
    reference: &str,
    text: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let id = resolve_task_ref(cache.tasks(), reference)?;
    let draft = TaskDraft::from_input(text).ok_or_else(|| anyhow!("task text is empty"))?;
    let outcome = handlers::update_task(store, cache, id, draft)?;
    report(outcome, "Modified task.", out)
}

fn cmd_delete(
    store: &mut Store,
    cache: &StateCache,
    list: TaskList,
    reference: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let tasks = match list {
        TaskList::Pending => cache.tasks(),
        TaskList::Completed => cache.completed(),
    };
    let id = resolve_task_ref(tasks, reference)?;
    let outcome = handlers::delete_task(store, cache, list, id)?;
    report(outcome, "Deleted task.", out)
}

fn cmd_clear_all(
    store: &mut Store,
    cache: &StateCache,
    confirmed: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if !handlers::has_any_tasks(cache) {
        writeln!(out, "Nothing to clear.")?;
        return Ok(());
    }
    if !confirmed {
        bail!("refusing to clear every task without --yes");
    }

    let removed = cache.tasks().len() + cache.completed().len();
    handlers::clear_all(store, cache)?;
    writeln!(out, "Cleared {removed} task(s).")?;
    Ok(())
}

fn cmd_set(store: &mut Store, key: &str, raw: &str, out: &mut dyn Write) -> anyhow::Result<()> {
    let Some(flag) = parse_flag(raw) else {
        bail!("expected a boolean for {key}, got: {}", raw.trim());
    };

    match handlers::update_preference(store, key, &Value::Bool(flag))? {
        Outcome::Applied => {
            writeln!(out, "{key} = {flag}")?;
            Ok(())
        }
        Outcome::Ignored(reason) => Err(anyhow!("cannot set {key}: {reason}")),
    }
}

fn report(outcome: Outcome, done: &str, out: &mut dyn Write) -> anyhow::Result<()> {
    match outcome {
        Outcome::Applied => writeln!(out, "{done}")?,
        Outcome::Ignored(reason) => {
            info!(reason, "command changed nothing");
            writeln!(out, "Nothing changed ({reason}).")?;
        }
    }
    Ok(())
}

/// A task reference is a 1-based position, a full id, or an unambiguous
/// id prefix.
pub fn resolve_task_ref(tasks: &[Task], reference: &str) -> anyhow::Result<Uuid> {
    let reference = reference.trim();

    if let Ok(position) = reference.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| tasks.get(index))
            .map(|task| task.id)
            .ok_or_else(|| anyhow!("no task at position {position}"));
    }

    if let Ok(id) = Uuid::parse_str(reference) {
        return Ok(id);
    }

    let prefix = reference.to_ascii_lowercase().replace('-', "");
    if prefix.len() < MIN_ID_PREFIX {
        bail!("task reference `{reference}` is too short");
    }

    let mut matches = tasks
        .iter()
        .filter(|task| task.id.simple().to_string().starts_with(&prefix));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id),
        (Some(_), Some(_)) => bail!("task reference `{reference}` is ambiguous"),
        (None, _) => bail!("no task matches `{reference}`"),
    }
}
