//! Boundary types shared with the orchestration layer.

pub mod geometry;
pub mod window;
