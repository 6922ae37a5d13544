use std::num::NonZeroUsize;

use crate::{
  buffer::BufferId,
  frame_tree::FrameId,
  graphics::{
    Position,
    Rect,
  },
  line_cache::{
    Mapped,
    RowMap,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(NonZeroUsize);

impl WindowId {
  pub const fn new(id: NonZeroUsize) -> Self {
    Self(id)
  }

  pub const fn get(self) -> NonZeroUsize {
    self.0
  }
}

impl From<NonZeroUsize> for WindowId {
  fn from(value: NonZeroUsize) -> Self {
    Self::new(value)
  }
}

/// Per-window view onto a shared buffer.
///
/// The cursor is tracked twice: `cursor` is the authoritative position as last
/// confirmed by the engine, `optimistic` is the position local input moved to
/// before the engine echoed the edit back. Reconciliation remaps the
/// authoritative cursor and never lets the effective cursor fall behind the
/// optimistic one; once the engine catches up the optimistic cursor is
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
  pub id:     WindowId,
  pub buffer: BufferId,
  pub frame:  FrameId,
  /// Paint area, refreshed from frame geometry after every layout pass.
  pub area:   Rect,
  /// Visual scroll offset (row/col) in buffer coordinates.
  pub scroll: Position,
  cursor:     Position,
  optimistic: Option<Position>,
}

impl WindowState {
  pub fn new(id: WindowId, buffer: BufferId, frame: FrameId) -> Self {
    Self {
      id,
      buffer,
      frame,
      area: Rect::default(),
      scroll: Position::default(),
      cursor: Position::default(),
      optimistic: None,
    }
  }

  /// A new window on the same buffer with the same cursor and scroll.
  pub fn fork(&self, id: WindowId, frame: FrameId) -> Self {
    Self {
      id,
      frame,
      optimistic: None,
      cursor: self.cursor(),
      ..self.clone()
    }
  }

  /// Effective cursor: the optimistic one while an edit is in flight.
  pub fn cursor(&self) -> Position {
    self.optimistic.unwrap_or(self.cursor)
  }

  pub fn authoritative_cursor(&self) -> Position {
    self.cursor
  }

  pub fn optimistic_cursor(&self) -> Option<Position> {
    self.optimistic
  }

  /// Moves the cursor without an edit in flight.
  pub fn move_cursor(&mut self, cursor: Position, len: usize) {
    self.cursor = clamp_row(cursor, len);
    self.optimistic = None;
  }

  /// Records where local input put the cursor ahead of the engine.
  pub fn set_optimistic_cursor(&mut self, cursor: Position) {
    self.optimistic = Some(cursor);
  }

  /// Carries this window across one reconciliation pass.
  pub fn remap(&mut self, rows: &RowMap, scroll_margin: usize) {
    let len = rows.new_len();

    self.cursor = match rows.map(self.cursor.row) {
      Mapped::Kept(row) => Position::new(row, self.cursor.col),
      Mapped::Clamped(row) => Position::new(row, 0),
    };
    if let Some(optimistic) = self.optimistic
      && self.cursor.row >= optimistic.row
    {
      self.optimistic = None;
    }
    self.cursor = clamp_row(self.cursor, len);
    self.optimistic = self.optimistic.map(|cursor| clamp_row(cursor, len));

    self.scroll.row = rows.map(self.scroll.row).row();
    self.scroll_to_cursor(len, scroll_margin);
  }

  /// Adjusts the scroll row so the effective cursor is visible.
  pub fn scroll_to_cursor(&mut self, len: usize, margin: usize) {
    let height = usize::from(self.area.height);
    let row = self.cursor().row;
    if height > 0 {
      let margin = margin.min(height.saturating_sub(1) / 2);
      if row < self.scroll.row + margin {
        self.scroll.row = row.saturating_sub(margin);
      } else if row + margin >= self.scroll.row + height {
        self.scroll.row = row + margin + 1 - height;
      }
    }
    // the viewport never runs past the last line
    let last_top = if height > 0 {
      len.saturating_sub(height)
    } else {
      len.saturating_sub(1)
    };
    self.scroll.row = self.scroll.row.min(last_top);
  }
}

fn clamp_row(cursor: Position, len: usize) -> Position {
  let last = len.saturating_sub(1);
  if cursor.row > last {
    Position::new(last, 0)
  } else {
    cursor
  }
}
