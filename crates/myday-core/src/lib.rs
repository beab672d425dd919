pub mod alert;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod render;
pub mod storage;
pub mod store;
pub mod sync;
pub mod task;
pub mod validate;

use std::ffi::OsString;
use std::rc::Rc;

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
    "starting myday CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rcfile.as_deref()
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

  let tasks = storage::FileStorage::open(
    &data_dir,
    &cfg.storage_key()
  )
  .with_context(|| {
    format!(
      "failed to open storage at {}",
      data_dir.display()
    )
  })?;
  let filter =
    storage::FileStorage::open(
      &data_dir,
      &cfg.filter_storage_key()
    )?;

  let renderer =
    render::Renderer::new(&cfg)?;
  let alerts = alert::TerminalAlerts::new(
    renderer.color()
  );
  let mut app = app::App::start(
    Rc::new(tasks),
    Some(Rc::new(filter)),
    Box::new(alerts),
    cfg.app_options()?
  )?;

  let inv =
    cli::Invocation::parse(cli.rest)?;
  let outcome = commands::dispatch(
    &mut app,
    &renderer,
    inv
  );

  app.shutdown();
  outcome?;
  info!("done");
  Ok(())
}
