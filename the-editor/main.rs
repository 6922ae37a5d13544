use std::path::Path;

use anyhow::{
  Context,
  Result,
};
use clap::Parser;
use the_editor_event::ApplyQueue;
use the_lib::{
  config::Config,
  editor::Editor,
  frame_tree::Layout,
};
use tokio::{
  fs::File,
  io::BufReader,
};

use crate::cli::Cli;

mod cli;
mod replay;

fn setup_logging(level: log::LevelFilter, log_file: Option<&Path>) -> Result<()> {
  let logger = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .level(level);

  let logger = match log_file {
    Some(path) => {
      let file = fern::log_file(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
      logger.chain(file)
    },
    None => logger.chain(std::io::stderr()),
  };
  logger.apply()?;
  Ok(())
}

fn open_editor(cli: &Cli) -> Result<Editor> {
  let config = match &cli.config {
    Some(path) => {
      let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
      Config::from_toml(&source)
        .with_context(|| format!("failed to load config {}", path.display()))?
    },
    None => Config::default(),
  };

  let mut editor = Editor::new(config);
  for _ in 1..cli.buffers {
    let buffer = editor.open_buffer(None);
    let Some(window) = editor.split(editor.focus(), Layout::Vertical) else {
      break;
    };
    editor.show_buffer(window, buffer);
  }
  Ok(editor)
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  setup_logging(cli.log_level, cli.log.as_deref())?;

  let editor = open_editor(&cli)?;
  let (queue, events) = ApplyQueue::spawn();
  for (buffer, document) in editor.documents() {
    queue.register(buffer, document.clone());
  }
  let collector = tokio::spawn(replay::collect_events(events));

  let file = File::open(&cli.updates)
    .await
    .with_context(|| format!("failed to open {}", cli.updates.display()))?;
  let submitted = replay::submit_all(BufReader::new(file), &queue).await?;
  queue.shutdown().await;
  let summary = collector.await.context("event collector failed")?;

  for (buffer, document) in editor.documents() {
    let document = document.lock();
    let contents = document.buffer();
    println!(
      "buffer {}: revision {}, {} lines, max width {}",
      buffer.get(),
      contents.revision(),
      contents.len(),
      contents.max_width()
    );
  }
  for (window, area) in editor.layout() {
    if let Some(state) = editor.window(window) {
      let cursor = state.cursor();
      println!(
        "window {} ({}x{} at {},{}): buffer {}, cursor {}:{}, scroll {}",
        window.get(),
        area.width,
        area.height,
        area.x,
        area.y,
        state.buffer.get(),
        cursor.row,
        cursor.col,
        state.scroll.row
      );
    }
  }
  println!(
    "{submitted} notifications: {} applied, {} rejected, {} unrouted",
    summary.applied, summary.rejected, summary.unrouted
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(["the-editor"].iter().chain(args).chain(&["updates.jsonl"])).unwrap()
  }

  #[test]
  fn missing_config_file_is_reported_by_path() {
    let err = open_editor(&cli(&["--config", "/nonexistent/the-editor.toml"])).unwrap_err();
    assert!(
      err
        .to_string()
        .contains("failed to read config /nonexistent/the-editor.toml")
    );
  }

  #[test]
  fn config_file_is_parsed() {
    let path = std::env::temp_dir().join(format!("the-editor-{}.toml", std::process::id()));
    std::fs::write(&path, "[layout]\nwidth = 120\nheight = 40\n").unwrap();
    let editor = open_editor(&cli(&["--config", path.to_str().unwrap(), "--buffers", "2"]));
    std::fs::remove_file(&path).unwrap();

    let editor = editor.unwrap();
    assert_eq!(editor.config().layout.width, 120);
    assert_eq!(editor.layout().len(), 2);
  }
}
