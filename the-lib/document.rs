//! A buffer together with every window bound to it.
//!
//! [`Document`] is the unit of exclusive access: reconciling a buffer and
//! remapping the rows of its windows happen under one lock, so no window ever
//! observes lines from one revision with a cursor from another.
//!
//! # Example
//!
//! ```
//! use std::num::NonZeroUsize;
//!
//! use the_lib::{
//!   buffer::{
//!     Buffer,
//!     BufferId,
//!   },
//!   document::Document,
//!   line::LinePayload,
//!   line_cache::{
//!     Op,
//!     Update,
//!   },
//! };
//!
//! let id = BufferId::new(NonZeroUsize::MIN);
//! let mut doc = Document::new(Buffer::new(id, None), 0);
//! let update = Update::new(1, 1, vec![Op::Ins {
//!   n:     1,
//!   lines: vec![LinePayload::new("hello")],
//! }]);
//! let applied = doc.apply(&update).unwrap();
//! assert_eq!(applied.revision, 1);
//! assert_eq!(doc.buffer().max_width(), 5);
//! ```

use std::{
  collections::BTreeMap,
  ops::Range,
  sync::Arc,
};

use parking_lot::Mutex;

use crate::{
  buffer::{
    Applied,
    Buffer,
    BufferId,
  },
  frame_tree::FrameId,
  graphics::{
    Position,
    Rect,
  },
  line_cache::{
    self,
    Update,
  },
  window::{
    WindowId,
    WindowState,
  },
};

pub type SharedDocument = Arc<Mutex<Document>>;

#[derive(Debug)]
pub struct Document {
  buffer:        Buffer,
  views:         BTreeMap<WindowId, WindowState>,
  scroll_margin: usize,
}

impl Document {
  pub fn new(buffer: Buffer, scroll_margin: usize) -> Self {
    Self {
      buffer,
      views: BTreeMap::new(),
      scroll_margin,
    }
  }

  pub fn into_shared(self) -> SharedDocument {
    Arc::new(Mutex::new(self))
  }

  pub fn id(&self) -> BufferId {
    self.buffer.id()
  }

  pub fn buffer(&self) -> &Buffer {
    &self.buffer
  }

  pub fn views(&self) -> impl Iterator<Item = &WindowState> {
    self.views.values()
  }

  pub fn view(&self, window: WindowId) -> Option<&WindowState> {
    self.views.get(&window)
  }

  pub fn insert_view(&mut self, view: WindowState) {
    self.views.insert(view.id, view);
  }

  pub fn remove_view(&mut self, window: WindowId) -> Option<WindowState> {
    self.views.remove(&window)
  }

  /// Reconciles the buffer and carries every window across the change.
  ///
  /// A rejected update leaves both the buffer and its windows untouched.
  pub fn apply(&mut self, update: &Update) -> line_cache::Result<Applied> {
    let applied = match self.buffer.apply(update) {
      Ok(applied) => applied,
      Err(err) => {
        tracing::warn!(
          buffer = self.id().get().get(),
          rev = update.rev,
          %err,
          "rejected engine update"
        );
        return Err(err);
      },
    };

    for view in self.views.values_mut() {
      view.remap(&applied.rows, self.scroll_margin);
    }
    tracing::trace!(
      buffer = self.id().get().get(),
      revision = applied.revision,
      invalid = applied.invalid.len(),
      "applied engine update"
    );
    Ok(applied)
  }

  pub fn mark_painted(&mut self, rows: Range<usize>) {
    self.buffer.mark_painted(rows);
  }

  /// Moves a window's cursor after local navigation.
  pub fn move_cursor(&mut self, window: WindowId, cursor: Position) -> bool {
    let len = self.buffer.len();
    let Some(view) = self.views.get_mut(&window) else {
      return false;
    };
    view.move_cursor(cursor, len);
    view.scroll_to_cursor(len, self.scroll_margin);
    true
  }

  /// Records a cursor position local input produced ahead of the engine.
  pub fn set_optimistic_cursor(&mut self, window: WindowId, cursor: Position) -> bool {
    let len = self.buffer.len();
    let Some(view) = self.views.get_mut(&window) else {
      return false;
    };
    view.set_optimistic_cursor(cursor);
    view.scroll_to_cursor(len, self.scroll_margin);
    true
  }

  /// Updates a window's frame and paint area after a layout pass.
  pub(crate) fn place_view(&mut self, window: WindowId, frame: FrameId, area: Rect) {
    let len = self.buffer.len();
    if let Some(view) = self.views.get_mut(&window) {
      view.frame = frame;
      view.area = area;
      view.scroll_to_cursor(len, self.scroll_margin);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use slotmap::KeyData;

  use super::*;
  use crate::{
    line::LinePayload,
    line_cache::{
      Op,
      ReconcileError,
    },
  };

  fn wid(n: usize) -> WindowId {
    WindowId::new(NonZeroUsize::new(n).unwrap())
  }

  fn document(texts: &[&str]) -> Document {
    let id = BufferId::new(NonZeroUsize::MIN);
    let mut doc = Document::new(Buffer::new(id, None), 0);
    doc
      .apply(&Update::new(1, texts.len(), vec![Op::Ins {
        n:     texts.len(),
        lines: texts.iter().map(|text| LinePayload::new(*text)).collect(),
      }]))
      .unwrap();
    for n in 1..=2 {
      let mut view = WindowState::new(wid(n), id, FrameId::from(KeyData::from_ffi(n as u64)));
      view.area = Rect::new(0, 0, 40, 10);
      doc.insert_view(view);
    }
    doc
  }

  #[test]
  fn every_view_is_remapped() {
    let mut doc = document(&["a", "b", "c", "d"]);
    assert!(doc.move_cursor(wid(1), Position::new(3, 0)));
    assert!(doc.move_cursor(wid(2), Position::new(1, 2)));

    // one line inserted at the top
    doc
      .apply(&Update::new(2, 5, vec![
        Op::Ins {
          n:     1,
          lines: vec![LinePayload::new("z")],
        },
        Op::Copy { n: 4 },
      ]))
      .unwrap();
    assert_eq!(doc.view(wid(1)).unwrap().cursor(), Position::new(4, 0));
    assert_eq!(doc.view(wid(2)).unwrap().cursor(), Position::new(2, 2));
  }

  #[test]
  fn rejected_update_does_not_touch_views() {
    let mut doc = document(&["a", "b", "c"]);
    assert!(doc.move_cursor(wid(1), Position::new(2, 1)));

    let err = doc
      .apply(&Update::new(2, 2, vec![Op::Copy { n: 1 }, Op::Update {
        n:     1,
        lines: vec![],
      }]))
      .unwrap_err();
    assert!(matches!(err, ReconcileError::PayloadMismatch { .. }));
    assert_eq!(doc.buffer().revision(), 1);
    assert_eq!(doc.view(wid(1)).unwrap().cursor(), Position::new(2, 1));
  }

  #[test]
  fn unknown_window_is_ignored() {
    let mut doc = document(&["a"]);
    assert!(!doc.move_cursor(wid(9), Position::new(0, 0)));
    assert!(!doc.set_optimistic_cursor(wid(9), Position::new(0, 0)));
    assert!(doc.remove_view(wid(2)).is_some());
    assert_eq!(doc.views().count(), 1);
  }
}
