//! Frontend session state: documents plus the frame tree that lays out their
//! windows.
//!
//! All structural commands run on the caller's thread. Engine updates either
//! go through [`Editor::apply_update`] on the same thread or are handed to an
//! apply queue together with the buffer's [`SharedDocument`]; both paths lock
//! the document for the whole reconciliation.

use std::{
  collections::BTreeMap,
  num::NonZeroUsize,
  path::PathBuf,
};

use crate::{
  buffer::{
    Applied,
    Buffer,
    BufferId,
  },
  config::Config,
  document::{
    Document,
    SharedDocument,
  },
  frame_tree::{
    Direction,
    FrameTree,
    Layout,
  },
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

#[derive(Debug)]
pub struct Editor {
  config:         Config,
  tree:           FrameTree,
  documents:      BTreeMap<BufferId, SharedDocument>,
  windows:        BTreeMap<WindowId, BufferId>,
  next_buffer_id: NonZeroUsize,
  next_window_id: NonZeroUsize,
}

impl Editor {
  /// Creates a session showing one empty scratch buffer in one window.
  pub fn new(config: Config) -> Self {
    let buffer = BufferId::new(NonZeroUsize::MIN);
    let window = WindowId::new(NonZeroUsize::MIN);

    let mut tree = FrameTree::new(window, config.layout.area());
    tree.set_min_extent(config.layout.min_extent);

    let mut document = Document::new(Buffer::new(buffer, None), config.scroll.margin);
    document.insert_view(WindowState::new(window, buffer, tree.root()));

    let editor = Self {
      config,
      tree,
      documents: BTreeMap::from([(buffer, document.into_shared())]),
      windows: BTreeMap::from([(window, buffer)]),
      next_buffer_id: NonZeroUsize::MIN.saturating_add(1),
      next_window_id: NonZeroUsize::MIN.saturating_add(1),
    };
    editor.sync_windows();
    editor
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn tree(&self) -> &FrameTree {
    &self.tree
  }

  pub fn focus(&self) -> WindowId {
    self.tree.focus()
  }

  pub fn focused_buffer(&self) -> Option<BufferId> {
    self.windows.get(&self.tree.focus()).copied()
  }

  pub fn buffer_of(&self, window: WindowId) -> Option<BufferId> {
    self.windows.get(&window).copied()
  }

  pub fn document(&self, buffer: BufferId) -> Option<&SharedDocument> {
    self.documents.get(&buffer)
  }

  pub fn documents(&self) -> impl Iterator<Item = (BufferId, &SharedDocument)> {
    self.documents.iter().map(|(id, doc)| (*id, doc))
  }

  /// Snapshot of a window's state.
  pub fn window(&self, window: WindowId) -> Option<WindowState> {
    let doc = self.documents.get(self.windows.get(&window)?)?;
    doc.lock().view(window).cloned()
  }

  /// Paint area of every window in leaf order.
  pub fn layout(&self) -> Vec<(WindowId, Rect)> {
    self.tree.layout()
  }

  /// Creates a document for a new engine buffer without showing it.
  pub fn open_buffer(&mut self, path: Option<PathBuf>) -> BufferId {
    let id = BufferId::new(self.next_buffer_id);
    self.next_buffer_id = self.next_buffer_id.saturating_add(1);

    let document = Document::new(Buffer::new(id, path), self.config.scroll.margin);
    self.documents.insert(id, document.into_shared());
    tracing::debug!(buffer = id.get().get(), "opened buffer");
    id
  }

  /// Rebinds `window` to `buffer`, starting at the top of the buffer.
  pub fn show_buffer(&mut self, window: WindowId, buffer: BufferId) -> bool {
    let Some(&current) = self.windows.get(&window) else {
      return false;
    };
    if current == buffer {
      return true;
    }
    let (Some(from), Some(to)) = (self.documents.get(&current), self.documents.get(&buffer)) else {
      return false;
    };

    // never hold two document locks at once
    let Some(old) = from.lock().remove_view(window) else {
      return false;
    };
    let mut view = WindowState::new(window, buffer, old.frame);
    view.area = old.area;
    to.lock().insert_view(view);

    self.windows.insert(window, buffer);
    true
  }

  /// Reconciles `buffer` on the calling thread.
  ///
  /// Returns `None` when the buffer is unknown.
  pub fn apply_update(
    &self,
    buffer: BufferId,
    update: &Update,
  ) -> Option<line_cache::Result<Applied>> {
    let doc = self.documents.get(&buffer)?;
    Some(doc.lock().apply(update))
  }

  /// Splits `window`; the new window shows the same buffer and takes focus.
  pub fn split(&mut self, window: WindowId, layout: Layout) -> Option<WindowId> {
    let buffer = *self.windows.get(&window)?;
    let new_window = WindowId::new(self.next_window_id);
    let frame = self.tree.split(window, new_window, layout)?;
    self.next_window_id = self.next_window_id.saturating_add(1);

    let doc = self.documents.get(&buffer)?;
    {
      let mut doc = doc.lock();
      let view = doc.view(window)?.fork(new_window, frame);
      doc.insert_view(view);
    }
    self.windows.insert(new_window, buffer);
    self.sync_windows();

    tracing::debug!(
      window = window.get().get(),
      new_window = new_window.get().get(),
      ?layout,
      "split window"
    );
    Some(new_window)
  }

  /// Closes `window`, returning the window that took over focus.
  pub fn close(&mut self, window: WindowId) -> Option<WindowId> {
    let target = self.tree.close(window)?;
    self.forget_window(window);
    self.sync_windows();
    tracing::debug!(window = window.get().get(), "closed window");
    Some(target)
  }

  /// Closes every window except the focused one.
  pub fn only(&mut self) -> Vec<WindowId> {
    let closed = self.tree.only();
    for &window in &closed {
      self.forget_window(window);
    }
    self.sync_windows();
    closed
  }

  pub fn exchange(&mut self, window: WindowId) -> bool {
    let exchanged = self.tree.exchange(window);
    if exchanged {
      self.sync_windows();
    }
    exchanged
  }

  pub fn transpose(&mut self) -> bool {
    let transposed = self.tree.transpose();
    if transposed {
      self.sync_windows();
    }
    transposed
  }

  pub fn change_size(&mut self, window: WindowId, delta: i32, layout: Layout) -> bool {
    let changed = self.tree.change_size(window, delta, layout);
    if changed {
      self.sync_windows();
    }
    changed
  }

  pub fn resize(&mut self, area: Rect) -> bool {
    let resized = self.tree.resize(area);
    if resized {
      self.sync_windows();
    }
    resized
  }

  pub fn focus_direction(&mut self, direction: Direction) -> bool {
    self.tree.focus_direction(direction)
  }

  pub fn focus_next(&mut self) -> bool {
    self.tree.rotate_focus(true)
  }

  pub fn focus_prev(&mut self) -> bool {
    self.tree.rotate_focus(false)
  }

  pub fn move_cursor(&self, window: WindowId, cursor: Position) -> bool {
    self
      .window_document(window)
      .is_some_and(|doc| doc.lock().move_cursor(window, cursor))
  }

  pub fn set_optimistic_cursor(&self, window: WindowId, cursor: Position) -> bool {
    self
      .window_document(window)
      .is_some_and(|doc| doc.lock().set_optimistic_cursor(window, cursor))
  }

  fn window_document(&self, window: WindowId) -> Option<&SharedDocument> {
    self.documents.get(self.windows.get(&window)?)
  }

  fn forget_window(&mut self, window: WindowId) {
    if let Some(buffer) = self.windows.remove(&window)
      && let Some(doc) = self.documents.get(&buffer)
    {
      doc.lock().remove_view(window);
    }
  }

  /// Pushes frame geometry into the window states.
  fn sync_windows(&self) {
    for (window, area) in self.tree.layout() {
      let (Some(frame), Some(doc)) = (self.tree.frame_of(window), self.window_document(window))
      else {
        continue;
      };
      doc.lock().place_view(window, frame, area);
    }
  }
}
