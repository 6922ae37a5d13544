//! Local mirror of one engine-owned buffer.
//!
//! A [`Buffer`] is only ever mutated by applying an engine [`Update`]; the
//! whole reconciliation is computed first and committed in one step, so a
//! rejected update leaves lines, geometry and revision untouched.

use std::{
  num::NonZeroUsize,
  ops::Range,
  path::{
    Path,
    PathBuf,
  },
};

use crate::{
  line::Line,
  line_cache::{
    self,
    ReconcileError,
    RowMap,
    Update,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(NonZeroUsize);

impl BufferId {
  pub const fn new(id: NonZeroUsize) -> Self {
    Self(id)
  }

  pub const fn get(self) -> NonZeroUsize {
    self.0
  }
}

impl From<NonZeroUsize> for BufferId {
  fn from(value: NonZeroUsize) -> Self {
    Self::new(value)
  }
}

/// What a successfully applied update changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
  pub revision: u64,
  pub invalid:  Vec<Range<usize>>,
  pub rows:     RowMap,
}

#[derive(Debug, Clone)]
pub struct Buffer {
  id:              BufferId,
  path:            Option<PathBuf>,
  lines:           Vec<Line>,
  revision:        u64,
  engine_revision: Option<u64>,
  max_width:       usize,
}

impl Buffer {
  pub fn new(id: BufferId, path: Option<PathBuf>) -> Self {
    Self {
      id,
      path,
      lines: Vec::new(),
      revision: 0,
      engine_revision: None,
      max_width: 0,
    }
  }

  pub fn id(&self) -> BufferId {
    self.id
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn set_path(&mut self, path: Option<PathBuf>) {
    self.path = path;
  }

  pub fn lines(&self) -> &[Line] {
    &self.lines
  }

  pub fn line(&self, row: usize) -> Option<&Line> {
    self.lines.get(row)
  }

  pub fn len(&self) -> usize {
    self.lines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  /// Local revision, bumped by exactly one per applied update.
  pub fn revision(&self) -> u64 {
    self.revision
  }

  /// Engine revision of the last applied update.
  pub fn engine_revision(&self) -> Option<u64> {
    self.engine_revision
  }

  pub fn max_width(&self) -> usize {
    self.max_width
  }

  /// Total height in rows.
  pub fn height(&self) -> usize {
    self.lines.len()
  }

  pub fn invalid_ranges(&self) -> Vec<Range<usize>> {
    line_cache::invalid_ranges(&self.lines)
  }

  /// Clears the redraw flag of every line in `rows`.
  pub fn mark_painted(&mut self, rows: Range<usize>) {
    let end = rows.end.min(self.lines.len());
    let start = rows.start.min(end);
    for line in &mut self.lines[start..end] {
      line.mark_painted();
    }
  }

  /// Applies an engine update atomically.
  pub fn apply(&mut self, update: &Update) -> line_cache::Result<Applied> {
    if let Some(last) = self.engine_revision
      && update.rev <= last
    {
      return Err(ReconcileError::StaleRevision {
        last,
        rev: update.rev,
      });
    }

    let reconciled = line_cache::reconcile(&self.lines, self.max_width, update)?;

    self.lines = reconciled.lines;
    self.max_width = reconciled.max_width;
    self.revision += 1;
    self.engine_revision = Some(update.rev);

    Ok(Applied {
      revision: self.revision,
      invalid:  reconciled.invalid,
      rows:     reconciled.rows,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    line::LinePayload,
    line_cache::Op,
  };

  fn buffer_with(texts: &[&str]) -> Buffer {
    let mut buffer = Buffer::new(BufferId::new(NonZeroUsize::MIN), None);
    let lines = texts.iter().map(|text| LinePayload::new(*text)).collect();
    buffer
      .apply(&Update::new(1, texts.len(), vec![Op::Ins {
        n: texts.len(),
        lines,
      }]))
      .expect("initial load");
    buffer
  }

  #[test]
  fn revision_advances_once_per_update() {
    let mut buffer = buffer_with(&["a", "b", "c"]);
    assert_eq!(buffer.revision(), 1);

    let applied = buffer
      .apply(&Update::new(2, 3, vec![Op::Copy { n: 3 }]))
      .unwrap();
    assert_eq!(applied.revision, 2);
    assert_eq!(buffer.revision(), 2);
    assert_eq!(buffer.engine_revision(), Some(2));
  }

  #[test]
  fn rejected_update_leaves_buffer_untouched() {
    let mut buffer = buffer_with(&["a", "b", "c"]);
    buffer.mark_painted(0..3);

    let err = buffer
      .apply(&Update::new(2, 5, vec![Op::Copy { n: 5 }]))
      .unwrap_err();
    assert!(matches!(err, ReconcileError::OutOfBounds { .. }));
    assert_eq!(buffer.revision(), 1);
    assert_eq!(buffer.engine_revision(), Some(1));
    assert_eq!(buffer.len(), 3);
    assert!(buffer.invalid_ranges().is_empty());
  }

  #[test]
  fn stale_engine_revision_is_rejected() {
    let mut buffer = buffer_with(&["a"]);
    let err = buffer
      .apply(&Update::new(1, 1, vec![Op::Copy { n: 1 }]))
      .unwrap_err();
    assert_eq!(err, ReconcileError::StaleRevision { last: 1, rev: 1 });
    assert_eq!(buffer.revision(), 1);
  }

  #[test]
  fn painting_clears_invalid_rows() {
    let mut buffer = buffer_with(&["a", "bb", "ccc"]);
    assert_eq!(buffer.invalid_ranges(), vec![0..3]);
    buffer.mark_painted(1..10);
    assert_eq!(buffer.invalid_ranges(), vec![0..1]);
    assert_eq!(buffer.max_width(), 3);
    assert_eq!(buffer.height(), 3);
  }
}
