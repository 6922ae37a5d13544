//! Frontend replica of engine-owned buffers and the split-frame layout that
//! shows them.
//!
//! Everything in this crate is synchronous and free of IO, including
//! [`config`], which parses sources its caller has read. Engine updates are
//! reconciled by [`line_cache`], window state is remapped in [`document`] and
//! the layout lives in [`frame_tree`]. [`editor::Editor`] ties them together.

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod buffer;
pub mod config;
pub mod document;
pub mod editor;
pub mod frame_tree;
pub mod graphics;
pub mod line;
pub mod line_cache;
pub mod window;

pub type Tendril = SmartString<LazyCompact>;
