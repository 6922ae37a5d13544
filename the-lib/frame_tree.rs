//! Split-frame layout tree.
//!
//! Frames live in an arena addressed by [`FrameId`]; a frame is either a leaf
//! holding one window or a split holding an ordered list of child frames.
//! Parents own their children through the arena, children point back at their
//! parent by id.
//!
//! The tree is kept normalized: a split always has at least two children and
//! never shares its layout with its parent. Geometry is derived: every
//! structural change calls [`FrameTree::equalize`], which gives every leaf the
//! same share of the outer area along each axis. Manual resizes through
//! [`FrameTree::change_size`] persist until the next structural change.
//!
//! The tree stores window ids only; window state lives with the buffer the
//! window shows.

use std::collections::{
  BTreeMap,
  BTreeSet,
};

use slotmap::HopSlotMap;

use crate::{
  graphics::{
    Rect,
    span_overlap,
  },
  window::WindowId,
};

slotmap::new_key_type! {
  pub struct FrameId;
}

/// Split layout, named after the separators it draws.
///
/// A `Vertical` split puts its children side by side (left to right) and
/// divides width; a `Horizontal` split stacks them top to bottom and divides
/// height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
  Horizontal,
  Vertical,
}

impl Layout {
  pub const fn transpose(self) -> Self {
    match self {
      Self::Horizontal => Self::Vertical,
      Self::Vertical => Self::Horizontal,
    }
  }

  fn extent(self, area: Rect) -> u16 {
    match self {
      Layout::Vertical => area.width,
      Layout::Horizontal => area.height,
    }
  }

  fn set_extent(self, area: &mut Rect, extent: u16) {
    match self {
      Layout::Vertical => area.width = extent,
      Layout::Horizontal => area.height = extent,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Up,
  Down,
  Left,
  Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
  Window(WindowId),
  Split(Split),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
  pub layout:   Layout,
  pub children: Vec<FrameId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  parent:  Option<FrameId>,
  content: Content,
  area:    Rect,
}

impl Frame {
  fn leaf(window: WindowId, parent: Option<FrameId>) -> Self {
    Self {
      parent,
      content: Content::Window(window),
      area: Rect::default(),
    }
  }

  pub fn parent(&self) -> Option<FrameId> {
    self.parent
  }

  pub fn content(&self) -> &Content {
    &self.content
  }

  pub fn area(&self) -> Rect {
    self.area
  }

  pub fn window(&self) -> Option<WindowId> {
    match self.content {
      Content::Window(window) => Some(window),
      Content::Split(_) => None,
    }
  }

  pub fn split(&self) -> Option<&Split> {
    match &self.content {
      Content::Split(split) => Some(split),
      Content::Window(_) => None,
    }
  }

  fn split_mut(&mut self) -> Option<&mut Split> {
    match &mut self.content {
      Content::Split(split) => Some(split),
      Content::Window(_) => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantError {
  MissingRoot,
  RootHasParent,
  MissingNode,
  ParentMismatch,
  DuplicateVisit,
  UnreachableNode,
  DegenerateSplit,
  NestedLayout,
  WindowMismatch,
  MissingFocus,
  GeometryMismatch,
}

#[derive(Debug, Clone)]
pub struct FrameTree {
  root:       FrameId,
  focus:      WindowId,
  area:       Rect,
  min_extent: u16,
  nodes:      HopSlotMap<FrameId, Frame>,
  windows:    BTreeMap<WindowId, FrameId>,
}

impl FrameTree {
  pub fn new(window: WindowId, area: Rect) -> Self {
    let mut nodes = HopSlotMap::with_key();
    let root = nodes.insert(Frame::leaf(window, None));
    let mut windows = BTreeMap::new();
    windows.insert(window, root);

    let mut tree = Self {
      root,
      focus: window,
      area,
      min_extent: 1,
      nodes,
      windows,
    };
    tree.equalize();
    tree
  }

  /// Smallest extent [`Self::change_size`] may shrink a frame to.
  pub fn set_min_extent(&mut self, min_extent: u16) {
    self.min_extent = min_extent.max(1);
  }

  pub fn root(&self) -> FrameId {
    self.root
  }

  pub fn area(&self) -> Rect {
    self.area
  }

  pub fn focus(&self) -> WindowId {
    self.focus
  }

  pub fn set_focus(&mut self, window: WindowId) -> bool {
    if !self.contains(window) {
      return false;
    }
    self.focus = window;
    true
  }

  pub fn frame(&self, id: FrameId) -> Option<&Frame> {
    self.nodes.get(id)
  }

  pub fn frame_of(&self, window: WindowId) -> Option<FrameId> {
    self.windows.get(&window).copied()
  }

  pub fn contains(&self, window: WindowId) -> bool {
    self.windows.contains_key(&window)
  }

  pub fn window_count(&self) -> usize {
    self.windows.len()
  }

  pub fn frame_count(&self) -> usize {
    self.nodes.len()
  }

  /// Windows in left-to-right, top-to-bottom leaf order.
  pub fn windows(&self) -> Vec<WindowId> {
    self
      .leaf_order(self.root)
      .into_iter()
      .filter_map(|id| self.nodes[id].window())
      .collect()
  }

  /// Paint area of every window, in leaf order.
  pub fn layout(&self) -> Vec<(WindowId, Rect)> {
    self
      .leaf_order(self.root)
      .into_iter()
      .filter_map(|id| {
        let frame = &self.nodes[id];
        frame.window().map(|window| (window, frame.area))
      })
      .collect()
  }

  /// Splits the frame showing `window`, placing `new_window` after it.
  ///
  /// Returns the new window's frame, or `None` when `window` is not in the
  /// tree or `new_window` already is.
  pub fn split(&mut self, window: WindowId, new_window: WindowId, layout: Layout) -> Option<FrameId> {
    let leaf = self.frame_of(window)?;
    if self.contains(new_window) {
      return None;
    }

    let parent = self.nodes[leaf].parent;
    let new_leaf = match parent {
      Some(parent) if self.split_layout(parent) == Some(layout) => {
        let new_leaf = self.nodes.insert(Frame::leaf(new_window, Some(parent)));
        let split = self.nodes[parent].split_mut()?;
        let pos = split.children.iter().position(|&child| child == leaf)?;
        split.children.insert(pos + 1, new_leaf);
        new_leaf
      },
      _ => {
        // the leaf turns into the split in place so its id (and the root's)
        // stays stable
        let first = self.nodes.insert(Frame::leaf(window, Some(leaf)));
        let second = self.nodes.insert(Frame::leaf(new_window, Some(leaf)));
        self.nodes[leaf].content = Content::Split(Split {
          layout,
          children: vec![first, second],
        });
        self.windows.insert(window, first);
        second
      },
    };

    self.windows.insert(new_window, new_leaf);
    self.focus = new_window;
    self.equalize();
    debug_assert_eq!(self.validate(), Ok(()));
    Some(new_leaf)
  }

  /// Removes the frame showing `window`.
  ///
  /// Returns the window that inherits focus: the closed frame's next sibling
  /// (previous when it was last). Closing the last window or an unknown one
  /// does nothing.
  pub fn close(&mut self, window: WindowId) -> Option<WindowId> {
    let leaf = self.frame_of(window)?;
    if self.windows.len() <= 1 {
      return None;
    }
    let parent = self.nodes[leaf].parent?;

    let split = self.nodes[parent].split_mut()?;
    let pos = split.children.iter().position(|&child| child == leaf)?;
    split.children.remove(pos);
    let sibling = split
      .children
      .get(pos)
      .or_else(|| split.children.last())
      .copied();

    self.nodes.remove(leaf);
    self.windows.remove(&window);

    let target = match sibling {
      Some(sibling) => self.first_window(sibling)?,
      None => self.focus,
    };
    self.collapse(parent);

    if self.focus == window {
      self.focus = target;
    }
    self.equalize();
    debug_assert_eq!(self.validate(), Ok(()));
    Some(target)
  }

  /// Closes every window except the focused one.
  pub fn only(&mut self) -> Vec<WindowId> {
    let focus = self.focus;
    let closed: Vec<_> = self
      .windows
      .keys()
      .copied()
      .filter(|window| *window != focus)
      .collect();
    if closed.is_empty() {
      return closed;
    }

    let root = self.root;
    self.nodes.retain(|id, _| id == root);
    self.nodes[root].content = Content::Window(focus);
    self.windows.clear();
    self.windows.insert(focus, root);
    self.equalize();
    debug_assert_eq!(self.validate(), Ok(()));
    closed
  }

  /// Swaps the frame showing `window` with its next sibling (previous when it
  /// is last). A frame without siblings swaps its parent instead.
  pub fn exchange(&mut self, window: WindowId) -> bool {
    let Some(mut frame) = self.frame_of(window) else {
      return false;
    };

    loop {
      let Some(parent) = self.nodes[frame].parent else {
        return false;
      };
      let Some(split) = self.nodes[parent].split_mut() else {
        return false;
      };
      if split.children.len() < 2 {
        frame = parent;
        continue;
      }
      let Some(pos) = split.children.iter().position(|&child| child == frame) else {
        return false;
      };
      let other = if pos + 1 < split.children.len() {
        pos + 1
      } else {
        pos - 1
      };
      split.children.swap(pos, other);
      break;
    }

    self.equalize();
    true
  }

  /// Flips the layout of the split containing the focused window.
  pub fn transpose(&mut self) -> bool {
    let Some(leaf) = self.frame_of(self.focus) else {
      return false;
    };
    let Some(parent) = self.nodes[leaf].parent else {
      return false;
    };
    let Some(split) = self.nodes[parent].split_mut() else {
      return false;
    };
    split.layout = split.layout.transpose();
    let layout = split.layout;
    let children = split.children.clone();

    // children sharing the new layout dissolve into this split
    for child in children {
      if self.split_layout(child) == Some(layout) {
        self.splice_into_parent(child);
      }
    }
    self.flatten(parent);
    self.equalize();
    debug_assert_eq!(self.validate(), Ok(()));
    true
  }

  /// Number of leaves a line along `layout` crosses through `frame`.
  fn min_total(&self, frame: FrameId, layout: Layout) -> i32 {
    let splits = i32::try_from(self.count_splits(frame, layout)).unwrap_or(i32::MAX);
    splits.saturating_mul(i32::from(self.min_extent))
  }

  pub fn count_splits(&self, frame: FrameId, layout: Layout) -> usize {
    let Some(node) = self.nodes.get(frame) else {
      return 0;
    };
    match &node.content {
      Content::Window(_) => 1,
      Content::Split(split) => {
        let counts = split
          .children
          .iter()
          .map(|&child| self.count_splits(child, layout));
        if split.layout == layout {
          counts.sum()
        } else {
          counts.max().unwrap_or(1)
        }
      },
    }
  }

  /// Gives `frame` an extent of `extent` cells along `layout` and distributes
  /// it over the subtree.
  ///
  /// Children of a split along `layout` receive shares proportional to their
  /// own split counts, so every leaf ends up with the same unit; remainders
  /// are spread one cell at a time and the shares always add up exactly.
  pub fn set_size(&mut self, frame: FrameId, layout: Layout, extent: u16) {
    let Some(node) = self.nodes.get_mut(frame) else {
      return;
    };
    layout.set_extent(&mut node.area, extent);
    let Some(split) = node.split() else {
      return;
    };

    let children = split.children.clone();
    if split.layout != layout {
      for child in children {
        self.set_size(child, layout, extent);
      }
      return;
    }

    let total = self.count_splits(frame, layout).max(1) as u64;
    let mut cumulative = 0u64;
    let mut prev_end = 0u64;
    for child in children {
      cumulative += self.count_splits(child, layout) as u64;
      let end = u64::from(extent) * cumulative / total;
      self.set_size(child, layout, (end - prev_end) as u16);
      prev_end = end;
    }
  }

  /// Assigns absolute positions to `frame` and its subtree.
  pub fn set_pos(&mut self, frame: FrameId, x: u16, y: u16) {
    let Some(node) = self.nodes.get_mut(frame) else {
      return;
    };
    node.area.x = x;
    node.area.y = y;
    let Some(split) = node.split() else {
      return;
    };

    let layout = split.layout;
    let children = split.children.clone();
    let (mut x, mut y) = (x, y);
    for child in children {
      self.set_pos(child, x, y);
      let area = self.nodes[child].area;
      match layout {
        Layout::Vertical => x = x.saturating_add(area.width),
        Layout::Horizontal => y = y.saturating_add(area.height),
      }
    }
  }

  /// Redistributes the outer area evenly over all leaves.
  pub fn equalize(&mut self) {
    let (root, area) = (self.root, self.area);
    self.set_size(root, Layout::Vertical, area.width);
    self.set_size(root, Layout::Horizontal, area.height);
    self.set_pos(root, area.x, area.y);
  }

  /// Changes the outer area. Returns `false` when it is unchanged.
  pub fn resize(&mut self, area: Rect) -> bool {
    if self.area == area {
      return false;
    }
    self.area = area;
    self.equalize();
    true
  }

  /// Grows the frame showing `window` by `delta` cells along `layout`,
  /// taking the space from its neighbour.
  ///
  /// The resize applies to the nearest ancestor split laid out along
  /// `layout`; without one nothing happens.
  pub fn change_size(&mut self, window: WindowId, delta: i32, layout: Layout) -> bool {
    let Some(mut frame) = self.frame_of(window) else {
      return false;
    };
    let parent = loop {
      let Some(parent) = self.nodes[frame].parent else {
        return false;
      };
      if self.split_layout(parent) == Some(layout) {
        break parent;
      }
      frame = parent;
    };

    let Some(split) = self.nodes[parent].split() else {
      return false;
    };
    let Some(pos) = split.children.iter().position(|&child| child == frame) else {
      return false;
    };
    let other = if pos + 1 < split.children.len() {
      split.children[pos + 1]
    } else if pos > 0 {
      split.children[pos - 1]
    } else {
      return false;
    };

    let current = i32::from(layout.extent(self.nodes[frame].area));
    let total = current + i32::from(layout.extent(self.nodes[other].area));
    // every leaf stacked along `layout` keeps at least `min_extent`
    let min_frame = self.min_total(frame, layout);
    let min_other = self.min_total(other, layout);
    if total < min_frame.saturating_add(min_other) {
      return false;
    }
    let new = current
      .saturating_add(delta)
      .clamp(min_frame, total - min_other);
    if new == current {
      return false;
    }

    self.set_size(frame, layout, new as u16);
    self.set_size(other, layout, (total - new) as u16);
    let origin = self.nodes[parent].area;
    self.set_pos(parent, origin.x, origin.y);
    true
  }

  /// The window whose frame touches `window`'s frame on the `direction` side.
  pub fn find_in_direction(&self, window: WindowId, direction: Direction) -> Option<WindowId> {
    let current = self.nodes[self.frame_of(window)?].area;

    self
      .windows
      .iter()
      .filter(|(candidate, _)| **candidate != window)
      .filter_map(|(candidate, frame)| {
        let area = self.nodes[*frame].area;
        if area.is_empty() {
          return None;
        }
        let (touching, overlap, start, origin) = match direction {
          Direction::Left | Direction::Right => {
            let touching = match direction {
              Direction::Left => area.right() == current.left(),
              _ => area.left() == current.right(),
            };
            let overlap = span_overlap(current.top(), current.bottom(), area.top(), area.bottom());
            (touching, overlap, area.top(), current.top())
          },
          Direction::Up | Direction::Down => {
            let touching = match direction {
              Direction::Up => area.bottom() == current.top(),
              _ => area.top() == current.bottom(),
            };
            let overlap = span_overlap(current.left(), current.right(), area.left(), area.right());
            (touching, overlap, area.left(), current.left())
          },
        };
        (touching && overlap > 0).then_some((*candidate, start.abs_diff(origin), start))
      })
      .min_by_key(|&(_, distance, start)| (distance, start))
      .map(|(candidate, ..)| candidate)
  }

  /// Moves focus to the window adjacent in `direction`.
  pub fn focus_direction(&mut self, direction: Direction) -> bool {
    match self.find_in_direction(self.focus, direction) {
      Some(target) => {
        self.focus = target;
        true
      },
      None => false,
    }
  }

  /// Cycles focus through windows in leaf order.
  pub fn rotate_focus(&mut self, next: bool) -> bool {
    let windows = self.windows();
    if windows.len() <= 1 {
      return false;
    }
    let Some(current) = windows.iter().position(|window| *window == self.focus) else {
      return false;
    };
    let next_index = if next {
      (current + 1) % windows.len()
    } else {
      (current + windows.len() - 1) % windows.len()
    };
    self.focus = windows[next_index];
    true
  }

  pub fn validate(&self) -> Result<(), InvariantError> {
    let root = self.nodes.get(self.root).ok_or(InvariantError::MissingRoot)?;
    if root.parent.is_some() {
      return Err(InvariantError::RootHasParent);
    }

    let mut visited = 0;
    let mut seen_windows = BTreeMap::new();
    let mut stack = vec![(self.root, None)];
    let mut seen = BTreeSet::new();

    while let Some((id, expected_parent)) = stack.pop() {
      if !seen.insert(id) {
        return Err(InvariantError::DuplicateVisit);
      }
      visited += 1;
      let node = self.nodes.get(id).ok_or(InvariantError::MissingNode)?;
      if node.parent != expected_parent {
        return Err(InvariantError::ParentMismatch);
      }

      match &node.content {
        Content::Window(window) => {
          seen_windows.insert(*window, id);
        },
        Content::Split(split) => {
          if split.children.len() < 2 {
            return Err(InvariantError::DegenerateSplit);
          }
          let mut along = 0u32;
          for &child in &split.children {
            let child_node = self.nodes.get(child).ok_or(InvariantError::MissingNode)?;
            if self.split_layout(child) == Some(split.layout) {
              return Err(InvariantError::NestedLayout);
            }
            along += u32::from(split.layout.extent(child_node.area));
            let across = split.layout.transpose();
            if across.extent(child_node.area) != across.extent(node.area) {
              return Err(InvariantError::GeometryMismatch);
            }
            stack.push((child, Some(id)));
          }
          if along != u32::from(split.layout.extent(node.area)) {
            return Err(InvariantError::GeometryMismatch);
          }
        },
      }
    }

    if visited != self.nodes.len() {
      return Err(InvariantError::UnreachableNode);
    }
    if seen_windows != self.windows {
      return Err(InvariantError::WindowMismatch);
    }
    if !self.windows.contains_key(&self.focus) {
      return Err(InvariantError::MissingFocus);
    }
    Ok(())
  }

  fn split_layout(&self, id: FrameId) -> Option<Layout> {
    self.nodes.get(id)?.split().map(|split| split.layout)
  }

  fn first_window(&self, id: FrameId) -> Option<WindowId> {
    let mut current = id;
    loop {
      match &self.nodes.get(current)?.content {
        Content::Window(window) => return Some(*window),
        Content::Split(split) => current = *split.children.first()?,
      }
    }
  }

  fn leaf_order(&self, root: FrameId) -> Vec<FrameId> {
    let mut order = Vec::with_capacity(self.windows.len());
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
      let Some(node) = self.nodes.get(id) else {
        continue;
      };
      match &node.content {
        Content::Window(_) => order.push(id),
        Content::Split(split) => stack.extend(split.children.iter().rev()),
      }
    }
    order
  }

  /// Restores the two-children minimum after `id` lost a child.
  fn collapse(&mut self, id: FrameId) {
    let Some(split) = self.nodes.get(id).and_then(Frame::split) else {
      return;
    };
    match split.children.as_slice() {
      [] => {
        // an empty split closes itself, except the root
        let Some(parent) = self.nodes[id].parent else {
          return;
        };
        if let Some(split) = self.nodes[parent].split_mut() {
          split.children.retain(|&child| child != id);
        }
        self.nodes.remove(id);
        self.collapse(parent);
      },
      [only] => {
        // the parent takes over its single child's content in place
        let only = *only;
        let Some(child) = self.nodes.remove(only) else {
          return;
        };
        match &child.content {
          Content::Window(window) => {
            self.windows.insert(*window, id);
          },
          Content::Split(split) => {
            for &grandchild in &split.children {
              self.nodes[grandchild].parent = Some(id);
            }
          },
        }
        self.nodes[id].content = child.content;
        self.flatten(id);
      },
      _ => {},
    }
  }

  /// Dissolves `id` into its parent when both share a layout.
  fn flatten(&mut self, id: FrameId) {
    let Some(parent) = self.nodes.get(id).and_then(|node| node.parent) else {
      return;
    };
    if self.split_layout(id).is_some() && self.split_layout(id) == self.split_layout(parent) {
      self.splice_into_parent(id);
    }
  }

  fn splice_into_parent(&mut self, id: FrameId) {
    let Some(parent) = self.nodes.get(id).and_then(|node| node.parent) else {
      return;
    };
    let Some(Frame {
      content: Content::Split(split),
      ..
    }) = self.nodes.remove(id)
    else {
      return;
    };
    for &child in &split.children {
      self.nodes[child].parent = Some(parent);
    }
    if let Some(parent_split) = self.nodes[parent].split_mut()
      && let Some(pos) = parent_split.children.iter().position(|&child| child == id)
    {
      parent_split.children.splice(pos..=pos, split.children);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use super::*;

  fn wid(n: usize) -> WindowId {
    WindowId::new(NonZeroUsize::new(n).expect("nonzero"))
  }

  fn area_of(tree: &FrameTree, window: WindowId) -> Rect {
    tree.frame(tree.frame_of(window).unwrap()).unwrap().area()
  }

  #[test]
  fn new_tree_is_a_single_root_leaf() {
    let tree = FrameTree::new(wid(1), Rect::new(0, 0, 80, 24));
    assert_eq!(tree.window_count(), 1);
    assert_eq!(tree.frame_of(wid(1)), Some(tree.root()));
    assert_eq!(area_of(&tree, wid(1)), Rect::new(0, 0, 80, 24));
    assert_eq!(tree.validate(), Ok(()));
  }

  #[test]
  fn vertical_split_divides_width_evenly() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 80, 24));
    let root = tree.root();
    tree.split(wid(1), wid(2), Layout::Vertical).unwrap();

    let split = tree.frame(root).unwrap().split().unwrap();
    assert_eq!(split.layout, Layout::Vertical);
    assert_eq!(split.children.len(), 2);
    assert_eq!(area_of(&tree, wid(1)), Rect::new(0, 0, 40, 24));
    assert_eq!(area_of(&tree, wid(2)), Rect::new(40, 0, 40, 24));
    assert_eq!(tree.focus(), wid(2));
    assert_eq!(tree.validate(), Ok(()));
  }

  #[test]
  fn split_along_parent_layout_adds_sibling() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 90, 24));
    tree.split(wid(1), wid(2), Layout::Vertical);
    tree.split(wid(1), wid(3), Layout::Vertical);

    assert_eq!(tree.windows(), vec![wid(1), wid(3), wid(2)]);
    assert_eq!(tree.frame_count(), 4);
    let widths: Vec<_> = tree.layout().iter().map(|(_, rect)| rect.width).collect();
    assert_eq!(widths, vec![30, 30, 30]);
  }

  #[test]
  fn closing_last_sibling_collapses_into_root() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 80, 24));
    let root = tree.root();
    tree.split(wid(1), wid(2), Layout::Vertical);

    assert_eq!(tree.close(wid(2)), Some(wid(1)));
    assert_eq!(tree.root(), root);
    assert_eq!(tree.frame(root).unwrap().window(), Some(wid(1)));
    assert_eq!(tree.frame_count(), 1);
    assert_eq!(tree.focus(), wid(1));
    assert_eq!(area_of(&tree, wid(1)), Rect::new(0, 0, 80, 24));
    assert_eq!(tree.validate(), Ok(()));
  }

  #[test]
  fn closing_pulls_nested_split_up_in_place() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 80, 24));
    let root = tree.root();
    tree.split(wid(1), wid(2), Layout::Vertical);
    tree.split(wid(2), wid(3), Layout::Horizontal);

    assert_eq!(tree.close(wid(1)), Some(wid(2)));
    let split = tree.frame(root).unwrap().split().unwrap();
    assert_eq!(split.layout, Layout::Horizontal);
    assert_eq!(tree.windows(), vec![wid(2), wid(3)]);
    assert_eq!(area_of(&tree, wid(2)), Rect::new(0, 0, 80, 12));
    // focus was elsewhere and stays there
    assert_eq!(tree.focus(), wid(3));
    assert_eq!(tree.validate(), Ok(()));
  }

  #[test]
  fn closing_keeps_layouts_from_nesting() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 180, 80));
    tree.split(wid(1), wid(2), Layout::Vertical);
    tree.split(wid(2), wid(3), Layout::Horizontal);
    tree.close(wid(3));
    tree.split(wid(2), wid(4), Layout::Vertical);

    assert_eq!(tree.windows().len(), 3);
    assert_eq!(tree.frame_count(), 4);
    let widths: Vec<_> = tree.layout().iter().map(|(_, rect)| rect.width).collect();
    assert_eq!(widths, vec![60, 60, 60]);
    assert_eq!(tree.validate(), Ok(()));
  }

  #[test]
  fn last_window_and_stale_ids_cannot_be_closed() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 80, 24));
    assert_eq!(tree.close(wid(1)), None);
    assert_eq!(tree.close(wid(7)), None);
    assert_eq!(tree.split(wid(7), wid(8), Layout::Vertical), None);
    assert!(!tree.exchange(wid(7)));
    assert!(!tree.change_size(wid(7), 3, Layout::Vertical));
    assert_eq!(tree.window_count(), 1);
    assert_eq!(tree.validate(), Ok(()));
  }

  /// | L0  | L2 |    |
  /// |    L1    | R0 |
  fn quad() -> FrameTree {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 180, 80));
    tree.split(wid(1), wid(2), Layout::Vertical);
    tree.split(wid(1), wid(3), Layout::Horizontal);
    tree.split(wid(1), wid(4), Layout::Vertical);
    tree
  }

  #[test]
  fn geometry_follows_split_counts() {
    let tree = quad();
    let root = tree.root();
    assert_eq!(tree.count_splits(root, Layout::Vertical), 3);
    assert_eq!(tree.count_splits(root, Layout::Horizontal), 2);
    assert_eq!(area_of(&tree, wid(1)), Rect::new(0, 0, 60, 40));
    assert_eq!(area_of(&tree, wid(4)), Rect::new(60, 0, 60, 40));
    assert_eq!(area_of(&tree, wid(3)), Rect::new(0, 40, 120, 40));
    assert_eq!(area_of(&tree, wid(2)), Rect::new(120, 0, 60, 80));
  }

  #[test]
  fn find_in_direction() {
    let tree = quad();
    let (l0, r0, l1, l2) = (wid(1), wid(2), wid(3), wid(4));

    assert_eq!(tree.find_in_direction(l2, Direction::Left), Some(l0));
    assert_eq!(tree.find_in_direction(l2, Direction::Down), Some(l1));
    assert_eq!(tree.find_in_direction(l2, Direction::Right), Some(r0));
    assert_eq!(tree.find_in_direction(l2, Direction::Up), None);

    assert_eq!(tree.find_in_direction(l1, Direction::Left), None);
    assert_eq!(tree.find_in_direction(l1, Direction::Down), None);
    assert_eq!(tree.find_in_direction(l1, Direction::Right), Some(r0));
    assert_eq!(tree.find_in_direction(l1, Direction::Up), Some(l0));

    assert_eq!(tree.find_in_direction(l0, Direction::Right), Some(l2));
    assert_eq!(tree.find_in_direction(l0, Direction::Down), Some(l1));

    assert_eq!(tree.find_in_direction(r0, Direction::Left), Some(l2));
    assert_eq!(tree.find_in_direction(r0, Direction::Up), None);
  }

  #[test]
  fn focus_direction_without_neighbour_is_a_no_op() {
    let mut tree = quad();
    assert!(tree.set_focus(wid(2)));
    assert!(!tree.focus_direction(Direction::Right));
    assert_eq!(tree.focus(), wid(2));
    assert!(tree.focus_direction(Direction::Left));
    assert_eq!(tree.focus(), wid(4));
  }

  #[test]
  fn exchange_swaps_with_next_sibling() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 90, 24));
    tree.split(wid(1), wid(2), Layout::Vertical);
    tree.split(wid(2), wid(3), Layout::Vertical);
    assert_eq!(tree.windows(), vec![wid(1), wid(2), wid(3)]);

    assert!(tree.exchange(wid(1)));
    assert_eq!(tree.windows(), vec![wid(2), wid(1), wid(3)]);
    assert_eq!(area_of(&tree, wid(1)).x, 30);

    // last child swaps backwards
    assert!(tree.exchange(wid(3)));
    assert_eq!(tree.windows(), vec![wid(2), wid(3), wid(1)]);
    assert_eq!(tree.validate(), Ok(()));

    let mut single = FrameTree::new(wid(1), Rect::new(0, 0, 90, 24));
    assert!(!single.exchange(wid(1)));
  }

  #[test]
  fn change_size_moves_the_shared_edge() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 80, 24));
    tree.split(wid(1), wid(2), Layout::Vertical);

    assert!(tree.change_size(wid(1), 10, Layout::Vertical));
    assert_eq!(area_of(&tree, wid(1)), Rect::new(0, 0, 50, 24));
    assert_eq!(area_of(&tree, wid(2)), Rect::new(50, 0, 30, 24));

    tree.set_min_extent(5);
    assert!(tree.change_size(wid(2), 100, Layout::Vertical));
    assert_eq!(area_of(&tree, wid(1)).width, 5);
    assert_eq!(area_of(&tree, wid(2)).width, 75);
    assert!(!tree.change_size(wid(2), 1, Layout::Vertical));

    assert!(!tree.change_size(wid(1), 3, Layout::Horizontal));
    assert_eq!(tree.validate(), Ok(()));
  }

  #[test]
  fn change_size_delegates_to_matching_ancestor() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 80, 24));
    tree.split(wid(1), wid(2), Layout::Vertical);
    tree.split(wid(2), wid(3), Layout::Horizontal);

    assert!(tree.change_size(wid(3), 4, Layout::Vertical));
    assert_eq!(area_of(&tree, wid(1)).width, 36);
    assert_eq!(area_of(&tree, wid(2)), Rect::new(36, 0, 44, 12));
    assert_eq!(area_of(&tree, wid(3)), Rect::new(36, 12, 44, 12));
    assert_eq!(tree.validate(), Ok(()));

    // the next structural change equalizes again
    tree.split(wid(1), wid(4), Layout::Horizontal);
    assert_eq!(area_of(&tree, wid(1)).width, 40);
  }

  #[test]
  fn change_size_keeps_nested_leaves_at_min_extent() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 80, 24));
    tree.split(wid(1), wid(2), Layout::Vertical);
    tree.split(wid(2), wid(4), Layout::Horizontal);
    tree.split(wid(2), wid(3), Layout::Vertical);
    tree.set_min_extent(5);

    // the right column holds two leaves side by side, so it keeps 10 cells
    assert!(tree.change_size(wid(1), 100, Layout::Vertical));
    assert_eq!(area_of(&tree, wid(1)).width, 70);
    assert_eq!(area_of(&tree, wid(2)), Rect::new(70, 0, 5, 12));
    assert_eq!(area_of(&tree, wid(3)), Rect::new(75, 0, 5, 12));
    assert_eq!(area_of(&tree, wid(4)), Rect::new(70, 12, 10, 12));
    assert_eq!(tree.validate(), Ok(()));
    assert!(!tree.change_size(wid(1), 1, Layout::Vertical));
    assert_eq!(tree.find_in_direction(wid(1), Direction::Right), Some(wid(2)));
  }

  #[test]
  fn transpose_flips_and_renormalizes() {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 80, 24));
    tree.split(wid(1), wid(2), Layout::Vertical);
    tree.split(wid(2), wid(3), Layout::Horizontal);

    // 3 sits in the horizontal split; flipping it to vertical merges it with
    // the root
    assert!(tree.transpose());
    let root = tree.frame(tree.root()).unwrap().split().unwrap();
    assert_eq!(root.layout, Layout::Vertical);
    assert_eq!(root.children.len(), 3);
    assert_eq!(tree.validate(), Ok(()));

    assert!(tree.transpose());
    let root = tree.frame(tree.root()).unwrap().split().unwrap();
    assert_eq!(root.layout, Layout::Horizontal);
    assert_eq!(tree.validate(), Ok(()));
  }

  #[test]
  fn only_keeps_the_focused_window() {
    let mut tree = quad();
    let root = tree.root();
    assert!(tree.set_focus(wid(3)));
    let mut closed = tree.only();
    closed.sort();
    assert_eq!(closed, vec![wid(1), wid(2), wid(4)]);
    assert_eq!(tree.root(), root);
    assert_eq!(tree.windows(), vec![wid(3)]);
    assert_eq!(tree.validate(), Ok(()));
  }

  #[test]
  fn rotate_focus_cycles_leaf_order() {
    let mut tree = quad();
    assert_eq!(tree.windows(), vec![wid(1), wid(4), wid(3), wid(2)]);
    assert_eq!(tree.focus(), wid(4));
    assert!(tree.rotate_focus(true));
    assert_eq!(tree.focus(), wid(3));
    assert!(tree.rotate_focus(false));
    assert!(tree.rotate_focus(false));
    assert_eq!(tree.focus(), wid(1));
  }

  #[test]
  fn resize_reflows_and_reports_changes() {
    let mut tree = quad();
    assert!(!tree.resize(Rect::new(0, 0, 180, 80)));
    assert!(tree.resize(Rect::new(0, 0, 91, 31)));
    let total: usize = tree.layout().iter().map(|(_, rect)| rect.area()).sum();
    assert_eq!(total, 91 * 31);
    assert_eq!(tree.validate(), Ok(()));
  }

  fn run_commands(commands: &[(u8, u8)]) -> (FrameTree, usize) {
    let mut tree = FrameTree::new(wid(1), Rect::new(0, 0, 200, 60));
    let mut next = 2;
    let mut live = 1;
    for &(command, arg) in commands {
      let focus = tree.focus();
      match command % 7 {
        0 | 1 => {
          let layout = if command % 7 == 0 {
            Layout::Vertical
          } else {
            Layout::Horizontal
          };
          if tree.split(focus, wid(next), layout).is_some() {
            live += 1;
          }
          next += 1;
        },
        2 => {
          if tree.close(focus).is_some() {
            live -= 1;
          }
        },
        3 => {
          tree.exchange(focus);
        },
        4 => {
          let direction = [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
            [usize::from(arg % 4)];
          tree.focus_direction(direction);
        },
        5 => {
          let layout = if arg % 2 == 0 {
            Layout::Vertical
          } else {
            Layout::Horizontal
          };
          tree.change_size(focus, i32::from(arg % 16) - 8, layout);
        },
        _ => {
          tree.rotate_focus(arg % 2 == 0);
        },
      }
    }
    (tree, live)
  }

  quickcheck::quickcheck! {
    fn windows_are_conserved(commands: Vec<(u8, u8)>) -> bool {
      let (tree, live) = run_commands(&commands);
      tree.window_count() == live && live >= 1 && tree.validate().is_ok()
    }

    fn equalize_is_idempotent(commands: Vec<(u8, u8)>) -> bool {
      let (mut tree, _) = run_commands(&commands);
      tree.equalize();
      let first = tree.layout();
      tree.equalize();
      first == tree.layout() && tree.validate().is_ok()
    }
  }
}
