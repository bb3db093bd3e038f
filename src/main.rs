use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

mod business_hours;
mod cli;
mod error;
mod gitlab;
mod model;
mod output;
mod processor;
mod report;
mod stats;
mod util;
mod window;

use crate::cli::{normalize, Cli};

fn main() -> Result<()> {
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  util::init_tracing();

  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;

  // Phase 2: fix "now" and run
  let now = match cfg.now_override.as_deref() {
    Some(raw) => window::parse_now_override(Some(raw)).with_context(|| format!("unrecognized --now-override {raw:?}"))?,
    None => Utc::now(),
  };
  processor::run(&cfg, now)
}
