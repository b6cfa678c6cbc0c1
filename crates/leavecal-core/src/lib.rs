pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod grid;
pub mod holidays;
pub mod model;
pub mod overlap;
pub mod render;
pub mod source;
pub mod timeline;
pub mod view;

use std::ffi::OsString;
use std::io::Write;

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
    "starting leavecal"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.leavecalrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir = cfg
    .data_dir(cli.data.as_deref())
    .context(
      "failed to resolve data \
       directory"
    )?;

  let paths =
    source::SnapshotPaths::resolve(
      &cfg, &data_dir
    );
  let snapshot =
    source::Snapshot::load(&paths)
      .with_context(|| {
        format!(
          "failed to load calendar data \
           from {}",
          data_dir.display()
        )
      })?;

  let tz = datetime::resolve_timezone(
    cfg.timezone()
  );
  let today = datetime::today_in(tz);
  debug!(%tz, %today, "resolved today");

  let renderer =
    render::Renderer::new(&cfg)?;
  let command =
    cli.command.unwrap_or(
      cli::Command::Month {
        date:  None,
        shift: 0
      }
    );

  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  commands::dispatch(
    &mut out,
    &cfg,
    &snapshot,
    &renderer,
    command,
    today,
    cli.json
  )?;
  out.flush()?;

  info!("done");
  Ok(())
}
