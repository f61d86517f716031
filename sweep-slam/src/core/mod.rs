//! Core foundation layer.
//!
//! Bottom of the stack with no internal dependencies.
//!
//! - [`types`]: poses and points
//! - [`math`]: angle arithmetic

pub mod math;
pub mod types;
