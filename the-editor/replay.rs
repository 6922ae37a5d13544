//! Feeding a captured notification stream through the apply queue.

use std::num::NonZeroUsize;

use anyhow::{
  Context,
  Result,
};
use serde::Deserialize;
use the_editor_event::{
  ApplyEvent,
  ApplyQueue,
};
use the_lib::{
  buffer::BufferId,
  line_cache::Update,
};
use tokio::{
  io::{
    AsyncBufRead,
    AsyncBufReadExt,
  },
  sync::mpsc::UnboundedReceiver,
};

/// One captured engine notification.
#[derive(Debug, Deserialize)]
pub struct Notification {
  pub buffer: NonZeroUsize,
  pub update: Update,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
  pub applied:  usize,
  pub rejected: usize,
  pub unrouted: usize,
}

/// Submits every notification read from `reader`. Blank lines are skipped.
///
/// Returns the number of notifications submitted.
pub async fn submit_all<R>(reader: R, queue: &ApplyQueue) -> Result<usize>
where
  R: AsyncBufRead + Unpin,
{
  let mut lines = reader.lines();
  let mut line_no = 0;
  let mut submitted = 0;

  while let Some(line) = lines.next_line().await.context("failed to read notifications")? {
    line_no += 1;
    if line.trim().is_empty() {
      continue;
    }
    let notification: Notification = serde_json::from_str(&line)
      .with_context(|| format!("malformed notification on line {line_no}"))?;
    queue.submit(BufferId::new(notification.buffer), notification.update);
    submitted += 1;
  }

  Ok(submitted)
}

/// Logs every apply event until the queue shuts down.
pub async fn collect_events(mut events: UnboundedReceiver<ApplyEvent>) -> Summary {
  let mut summary = Summary::default();
  while let Some(event) = events.recv().await {
    match event {
      ApplyEvent::Applied {
        buffer,
        revision,
        invalid,
      } => {
        log::info!(
          "buffer {} at revision {revision}, {} invalid ranges",
          buffer.get(),
          invalid.len()
        );
        summary.applied += 1;
      },
      ApplyEvent::Rejected { buffer, error } => {
        log::warn!("buffer {}: {error}", buffer.get());
        summary.rejected += 1;
      },
      ApplyEvent::Unrouted { buffer } => {
        log::warn!("buffer {} is not open", buffer.get());
        summary.unrouted += 1;
      },
    }
  }
  summary
}
