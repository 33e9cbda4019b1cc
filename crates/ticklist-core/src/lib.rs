pub mod app;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod editor;
pub mod handlers;
pub mod host;
pub mod menu;
pub mod platform;
pub mod prefs;
pub mod registry;
pub mod runtime;
pub mod store;
pub mod task;
pub mod title;
pub mod windows;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting ticklist"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let mut store =
    store::Store::open_dir(&data_dir)
      .with_context(|| {
        format!(
          "failed to open store at {}",
          data_dir.display()
        )
      })?;

  match cli
    .command
    .unwrap_or(cli::Command::Run)
  {
    | cli::Command::Run => {
      commands::run_tray(store, &cfg)?
    }
    | command => {
      let mut out =
        std::io::stdout().lock();
      commands::dispatch(
        &mut store, &cfg, command,
        &mut out
      )?;
    }
  }

  info!("done");
  Ok(())
}
