//! Cell-space geometry shared by the frame tree and windows.

/// A rectangular area in terminal cells.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
  pub x:      u16,
  pub y:      u16,
  pub width:  u16,
  pub height: u16,
}

impl Rect {
  pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  #[inline]
  pub const fn left(self) -> u16 {
    self.x
  }

  #[inline]
  pub const fn right(self) -> u16 {
    self.x.saturating_add(self.width)
  }

  #[inline]
  pub const fn top(self) -> u16 {
    self.y
  }

  #[inline]
  pub const fn bottom(self) -> u16 {
    self.y.saturating_add(self.height)
  }

  pub const fn area(self) -> usize {
    self.width as usize * self.height as usize
  }

  pub const fn is_empty(self) -> bool {
    self.width == 0 || self.height == 0
  }

  pub fn intersects(self, other: Rect) -> bool {
    self.x < other.right()
      && other.x < self.right()
      && self.y < other.bottom()
      && other.y < self.bottom()
  }
}

/// A row/column pair in buffer coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
  pub row: usize,
  pub col: usize,
}

impl Position {
  pub const fn new(row: usize, col: usize) -> Self {
    Self { row, col }
  }
}

/// Length of the overlap between `a_start..a_end` and `b_start..b_end`.
pub(crate) fn span_overlap(a_start: u16, a_end: u16, b_start: u16, b_end: u16) -> u16 {
  a_end.min(b_end).saturating_sub(a_start.max(b_start))
}
