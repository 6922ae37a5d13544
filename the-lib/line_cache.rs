//! Line-cache reconciliation.
//!
//! The backing engine owns the text. It describes every change as an ordered
//! stream of coarse line operations that transforms the previous local line
//! array into the new one:
//!
//! - **Skip(n)** - drop `n` old lines
//! - **Copy(n)** - keep `n` old lines
//! - **Invalidate(n)** - keep `n` old lines but force a redraw
//! - **Ins(n, lines)** - insert `n` new lines
//! - **Update(n, patches)** - keep `n` old lines with new decorations
//!
//! Operations are applied strictly left to right with two cursors, one into
//! the old array and one into the new array. [`reconcile`] is pure: it builds
//! the new array next to the old one and fails without side effects on any
//! protocol error, so callers can commit the result atomically.
//!
//! Alongside the new lines the pass records a [`RowMap`] describing where
//! every old row went, which windows use to keep their cursors on the same
//! content.
//!
//! # Example
//!
//! ```
//! use the_lib::{
//!   line::{
//!     Line,
//!     LinePayload,
//!   },
//!   line_cache::{
//!     Op,
//!     Update,
//!     reconcile,
//!   },
//! };
//!
//! let old = vec![Line::new("a"), Line::new("b")];
//! let update = Update::new(1, 3, vec![
//!   Op::Copy { n: 1 },
//!   Op::Ins {
//!     n:     1,
//!     lines: vec![LinePayload::new("x")],
//!   },
//!   Op::Copy { n: 1 },
//! ]);
//! let result = reconcile(&old, 1, &update).unwrap();
//! assert_eq!(result.lines[1].text(), "x");
//! assert_eq!(result.rows.map(1).row(), 2);
//! ```

use std::{
  fmt,
  ops::Range,
};

use serde::Deserialize;
use thiserror::Error;

use crate::line::{
  Line,
  LinePatch,
  LinePayload,
};

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Op {
  Skip { n: usize },
  Copy { n: usize },
  Invalidate { n: usize },
  Ins { n: usize, lines: Vec<LinePayload> },
  Update { n: usize, lines: Vec<LinePatch> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
  Skip,
  Copy,
  Invalidate,
  Ins,
  Update,
}

impl fmt::Display for OpKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      OpKind::Skip => "skip",
      OpKind::Copy => "copy",
      OpKind::Invalidate => "invalidate",
      OpKind::Ins => "ins",
      OpKind::Update => "update",
    })
  }
}

impl Op {
  pub fn kind(&self) -> OpKind {
    match self {
      Op::Skip { .. } => OpKind::Skip,
      Op::Copy { .. } => OpKind::Copy,
      Op::Invalidate { .. } => OpKind::Invalidate,
      Op::Ins { .. } => OpKind::Ins,
      Op::Update { .. } => OpKind::Update,
    }
  }

  /// Declared line count.
  pub fn len(&self) -> usize {
    match self {
      Op::Skip { n }
      | Op::Copy { n }
      | Op::Invalidate { n }
      | Op::Ins { n, .. }
      | Op::Update { n, .. } => *n,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// One notification from the backing engine for a single buffer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Update {
  /// Engine revision; strictly increasing per buffer.
  pub rev:     u64,
  /// Total number of lines after applying `ops`.
  pub new_len: usize,
  pub ops:     Vec<Op>,
}

impl Update {
  pub fn new(rev: u64, new_len: usize, ops: Vec<Op>) -> Self {
    Self { rev, new_len, ops }
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReconcileError {
  #[error("op #{index} ({kind}) reads old lines {start}..{end} but only {old_len} exist")]
  OutOfBounds {
    index:   usize,
    kind:    OpKind,
    start:   usize,
    end:     usize,
    old_len: usize,
  },
  #[error("op #{index} ({kind}) declares {expected} lines but carries {actual}")]
  PayloadMismatch {
    index:    usize,
    kind:     OpKind,
    expected: usize,
    actual:   usize,
  },
  #[error("update declares {expected} lines but its ops produce {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("stale revision {rev}: revision {last} was already applied")]
  StaleRevision { last: u64, rev: u64 },
}

/// Where a contiguous run of old rows ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
  /// `old..old + len` now lives at `new..new + len`.
  Kept { old: usize, new: usize, len: usize },
  /// `old..old + len` was dropped; the following content starts at `at`.
  Deleted { old: usize, at: usize, len: usize },
}

impl Span {
  fn old_range(&self) -> Range<usize> {
    match *self {
      Span::Kept { old, len, .. } | Span::Deleted { old, len, .. } => old..old + len,
    }
  }
}

/// Result of mapping an old row through a [`RowMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapped {
  /// The row's content survived at this new row.
  Kept(usize),
  /// The row's content is gone; this is the nearest valid boundary.
  Clamped(usize),
}

impl Mapped {
  pub fn row(self) -> usize {
    match self {
      Mapped::Kept(row) | Mapped::Clamped(row) => row,
    }
  }

  pub fn is_kept(self) -> bool {
    matches!(self, Mapped::Kept(_))
  }
}

/// Old-row to new-row table recorded during a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMap {
  spans:   Vec<Span>,
  new_len: usize,
  /// New row at which the old content ran out.
  old_end: usize,
}

impl RowMap {
  pub fn spans(&self) -> &[Span] {
    &self.spans
  }

  pub fn new_len(&self) -> usize {
    self.new_len
  }

  pub fn map(&self, row: usize) -> Mapped {
    let ix = self
      .spans
      .partition_point(|span| span.old_range().end <= row);
    match self.spans.get(ix) {
      Some(Span::Kept { old, new, .. }) if row >= *old => Mapped::Kept(new + (row - old)),
      Some(Span::Deleted { old, at, .. }) if row >= *old => Mapped::Clamped(self.clamp(*at)),
      // rows past the old content stay where the old content ended
      _ => Mapped::Clamped(self.clamp(self.old_end)),
    }
  }

  fn clamp(&self, row: usize) -> usize {
    row.min(self.new_len.saturating_sub(1))
  }

  fn push(&mut self, span: Span) {
    let len = match span {
      Span::Kept { len, .. } | Span::Deleted { len, .. } => len,
    };
    if len > 0 {
      self.spans.push(span);
    }
  }
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
  pub lines:     Vec<Line>,
  /// Coalesced rows of `lines` that need a redraw.
  pub invalid:   Vec<Range<usize>>,
  pub rows:      RowMap,
  pub max_width: usize,
}

/// Applies `update` to `old`, producing the new line array.
///
/// `old_max_width` is the cached maximum width of `old`; it is only trusted
/// when no line was deleted.
pub fn reconcile(old: &[Line], old_max_width: usize, update: &Update) -> Result<Reconciliation> {
  let old_len = old.len();
  let inserted: usize = update
    .ops
    .iter()
    .filter_map(|op| {
      match op {
        Op::Ins { lines, .. } => Some(lines.len()),
        _ => None,
      }
    })
    .sum();
  let mut lines = Vec::with_capacity(update.new_len.min(old_len.saturating_add(inserted)));
  let mut rows = RowMap {
    spans:   Vec::new(),
    new_len: update.new_len,
    old_end: 0,
  };
  let mut old_ix: usize = 0;
  let mut old_end = None;
  let mut touched_width = 0;
  let mut deleted = false;

  for (index, op) in update.ops.iter().enumerate() {
    let n = op.len();
    let new_ix = lines.len();
    if old_ix == old_len && old_end.is_none() {
      old_end = Some(new_ix);
    }
    // every emitted line must fit the declared length; this also bounds
    // allocation for hostile counts
    if !matches!(op, Op::Skip { .. }) && new_ix.saturating_add(n) > update.new_len {
      return Err(ReconcileError::LengthMismatch {
        expected: update.new_len,
        actual:   new_ix.saturating_add(n),
      });
    }
    let old_range = || {
      let end = old_ix.checked_add(n).filter(|end| *end <= old_len);
      end.map(|end| old_ix..end).ok_or(ReconcileError::OutOfBounds {
        index,
        kind: op.kind(),
        start: old_ix,
        end: old_ix.saturating_add(n),
        old_len,
      })
    };

    match op {
      Op::Skip { .. } => {
        let range = old_range()?;
        rows.push(Span::Deleted {
          old: range.start,
          at:  new_ix,
          len: n,
        });
        deleted |= n > 0;
        old_ix = range.end;
      },
      Op::Copy { .. } => {
        let range = old_range()?;
        let shifted = new_ix != old_ix;
        lines.extend(old[range.clone()].iter().map(|line| {
          let mut line = line.clone();
          if shifted {
            line.invalidate();
          }
          line
        }));
        rows.push(Span::Kept {
          old: range.start,
          new: new_ix,
          len: n,
        });
        old_ix = range.end;
      },
      Op::Invalidate { .. } => {
        let present = n.min(old_len.saturating_sub(old_ix));
        for line in &old[old_ix..old_ix + present] {
          let mut line = line.clone();
          line.invalidate();
          touched_width = touched_width.max(line.width());
          lines.push(line);
        }
        lines.extend((present..n).map(|_| Line::hole()));
        rows.push(Span::Kept {
          old: old_ix,
          new: new_ix,
          len: present,
        });
        old_ix += present;
      },
      Op::Ins { lines: payload, .. } => {
        if payload.len() != n {
          return Err(ReconcileError::PayloadMismatch {
            index,
            kind: OpKind::Ins,
            expected: n,
            actual: payload.len(),
          });
        }
        for line in payload.iter().map(Line::from_payload) {
          touched_width = touched_width.max(line.width());
          lines.push(line);
        }
      },
      Op::Update { lines: patches, .. } => {
        if patches.len() != n {
          return Err(ReconcileError::PayloadMismatch {
            index,
            kind: OpKind::Update,
            expected: n,
            actual: patches.len(),
          });
        }
        let range = old_range()?;
        for (line, patch) in old[range.clone()].iter().zip(patches) {
          let mut line = line.clone();
          line.apply_patch(patch);
          touched_width = touched_width.max(line.width());
          lines.push(line);
        }
        rows.push(Span::Kept {
          old: range.start,
          new: new_ix,
          len: n,
        });
        old_ix = range.end;
      },
    }
  }

  if lines.len() != update.new_len {
    return Err(ReconcileError::LengthMismatch {
      expected: update.new_len,
      actual:   lines.len(),
    });
  }

  // anything the stream never consumed is gone
  if old_ix < old_len {
    rows.push(Span::Deleted {
      old: old_ix,
      at:  lines.len(),
      len: old_len - old_ix,
    });
    deleted = true;
  }
  rows.old_end = old_end.unwrap_or(lines.len());

  let max_width = if deleted {
    lines.iter().map(Line::width).max().unwrap_or(0)
  } else {
    old_max_width.max(touched_width)
  };
  let invalid = invalid_ranges(&lines);

  Ok(Reconciliation {
    lines,
    invalid,
    rows,
    max_width,
  })
}

/// Coalesced ranges of rows whose lines are flagged invalid.
pub fn invalid_ranges(lines: &[Line]) -> Vec<Range<usize>> {
  let mut ranges: Vec<Range<usize>> = Vec::new();
  for (row, line) in lines.iter().enumerate() {
    if !line.is_invalid() {
      continue;
    }
    match ranges.last_mut() {
      Some(last) if last.end == row => last.end = row + 1,
      _ => ranges.push(row..row + 1),
    }
  }
  ranges
}
