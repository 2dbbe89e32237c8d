//! Placement engine for a tiling window manager.
//!
//! Each desktop owns a layout tree of split, stack and static panels whose
//! leaves are windows. [`TilingWorkspace`] places new windows, applies the
//! structural edits a user makes with the mouse or keyboard, and lays the
//! tree out so that every window gets at least its minimum size.

pub mod common;
pub mod layout_engine;
pub mod model;
pub mod sys;

pub use layout_engine::{TilingError, TilingWorkspace};
