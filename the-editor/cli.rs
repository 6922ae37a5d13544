use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
  name = "the-editor",
  about = "Replay captured engine notifications through the frontend replica",
  long_about = None
)]
pub struct Cli {
  /// TOML config file
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Write logs to FILE instead of stderr
  #[arg(long, value_name = "FILE")]
  pub log: Option<PathBuf>,

  /// off, error, warn, info, debug or trace
  #[arg(long, value_name = "LEVEL", default_value = "info")]
  pub log_level: log::LevelFilter,

  /// Number of buffers to open, each shown in its own window
  #[arg(long, value_name = "N", default_value_t = 1)]
  pub buffers: usize,

  /// Notifications, one `{"buffer": id, "update": ...}` object per line
  #[arg(value_name = "UPDATES.jsonl")]
  pub updates: PathBuf,
}
