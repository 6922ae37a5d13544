//! Asynchronous delivery of engine updates into the frontend replica.

pub mod apply_queue;

pub use apply_queue::{
  ApplyEvent,
  ApplyQueue,
};
