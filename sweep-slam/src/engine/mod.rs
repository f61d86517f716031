//! SLAM orchestration layer.
//!
//! - [`slam`]: engine combining pose search and grid integration

pub mod slam;
