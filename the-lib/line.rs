//! A single line of the local mirror.
//!
//! Lines are created by `ins` operations and patched in place by `update`
//! operations; their text never changes after creation. Style runs are kept in
//! the wire representation (each run's offset is relative to the end of the
//! previous run) and resolved lazily for rendering.

use std::ops::Range;

use serde::Deserialize;
use smallvec::SmallVec;
use unicode_width::UnicodeWidthStr;

use crate::Tendril;

/// Opaque style identifier assigned by the backing engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct StyleId(pub u32);

/// One style run as sent on the wire.
///
/// `offset` is measured from the end of the previous run (or from the start
/// of the line for the first run), so it can be negative for overlapping runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "(i64, usize, u32)")]
pub struct StyleSpan {
  pub offset: i64,
  pub len:    usize,
  pub style:  StyleId,
}

impl StyleSpan {
  pub const fn new(offset: i64, len: usize, style: StyleId) -> Self {
    Self { offset, len, style }
  }
}

impl From<(i64, usize, u32)> for StyleSpan {
  fn from((offset, len, style): (i64, usize, u32)) -> Self {
    Self::new(offset, len, StyleId(style))
  }
}

pub type Styles = SmallVec<[StyleSpan; 4]>;
pub type Cursors = SmallVec<[usize; 1]>;

/// Payload of an `ins` operation: a brand-new line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinePayload {
  pub text:   String,
  pub styles: Vec<StyleSpan>,
  pub cursor: Vec<usize>,
}

impl LinePayload {
  pub fn new(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      ..Self::default()
    }
  }
}

/// Payload of an `update` operation: new decorations for an existing line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinePatch {
  pub styles: Vec<StyleSpan>,
  pub cursor: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
  text:    Tendril,
  styles:  Styles,
  cursors: Cursors,
  width:   usize,
  hole:    bool,
  invalid: bool,
}

impl Line {
  /// Creates a line that still needs to be painted.
  pub fn new(text: impl Into<Tendril>) -> Self {
    let text = text.into();
    let width = display_width(&text);
    Self {
      text,
      styles: Styles::new(),
      cursors: Cursors::new(),
      width,
      hole: false,
      invalid: true,
    }
  }

  pub fn from_payload(payload: &LinePayload) -> Self {
    let mut line = Self::new(payload.text.as_str());
    line.styles = payload.styles.iter().copied().collect();
    line.cursors = payload.cursor.iter().copied().collect();
    line
  }

  /// Placeholder for a row the engine invalidated but never sent.
  pub fn hole() -> Self {
    Self {
      hole: true,
      ..Self::new("")
    }
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn styles(&self) -> &[StyleSpan] {
    &self.styles
  }

  pub fn cursors(&self) -> &[usize] {
    &self.cursors
  }

  /// Display width in cells, excluding the line ending.
  pub fn width(&self) -> usize {
    self.width
  }

  pub fn is_hole(&self) -> bool {
    self.hole
  }

  pub fn is_invalid(&self) -> bool {
    self.invalid
  }

  pub fn invalidate(&mut self) {
    self.invalid = true;
  }

  pub fn mark_painted(&mut self) {
    self.invalid = false;
  }

  /// Replaces decorations, leaving the text untouched.
  pub fn apply_patch(&mut self, patch: &LinePatch) {
    self.styles = patch.styles.iter().copied().collect();
    self.cursors = patch.cursor.iter().copied().collect();
    self.invalid = true;
  }

  /// Style runs with absolute byte ranges.
  ///
  /// Runs are clipped to the line's text, so out-of-range offsets from the
  /// engine yield empty ranges at either end.
  pub fn resolved_styles(&self) -> impl Iterator<Item = (Range<usize>, StyleId)> + '_ {
    let text_len = self.text.len();
    let mut end = 0usize;
    self.styles.iter().map(move |span| {
      let start = shift(end, span.offset).min(text_len);
      end = start.saturating_add(span.len).min(text_len);
      (start..end, span.style)
    })
  }
}

fn shift(base: usize, offset: i64) -> usize {
  let distance = usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX);
  if offset < 0 {
    base.saturating_sub(distance)
  } else {
    base.saturating_add(distance)
  }
}

fn display_width(text: &str) -> usize {
  let text = text
    .strip_suffix('\n')
    .map(|text| text.strip_suffix('\r').unwrap_or(text))
    .unwrap_or(text);
  text.width()
}
