//! The window handle boundary.
//!
//! The engine never talks to a window directly. It identifies windows by
//! [`WindowId`] and asks a [`WindowSource`] for their minimum size whenever a
//! tree is measured.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::collections::HashMap;
use crate::sys::geometry::Size;

#[allow(non_camel_case_types)]
pub type pid_t = i32;

/// An identifier representing a window.
///
/// This identifier is only valid for the lifetime of the process that owns it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct WindowId {
    pub pid: pid_t,
    pub idx: u32,
}

impl WindowId {
    pub const fn new(pid: pid_t, idx: u32) -> WindowId { WindowId { pid, idx } }
}

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowId({}:{})", self.pid, self.idx)
    }
}

/// Identifies a virtual desktop. Assigned by the orchestration layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DesktopId(u64);

impl DesktopId {
    pub const fn new(id: u64) -> DesktopId { DesktopId(id) }

    pub fn get(&self) -> u64 { self.0 }
}

impl fmt::Display for DesktopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Supplies the current size limits of managed windows.
///
/// `None` means the size could not be queried; the engine treats a missing
/// minimum as zero and a missing maximum as unbounded.
pub trait WindowSource {
    fn minimum_size(&self, window: WindowId) -> Option<Size>;

    fn maximum_size(&self, _window: WindowId) -> Option<Size> { None }
}

impl<T: WindowSource + ?Sized> WindowSource for &T {
    fn minimum_size(&self, window: WindowId) -> Option<Size> { (**self).minimum_size(window) }

    fn maximum_size(&self, window: WindowId) -> Option<Size> { (**self).maximum_size(window) }
}

/// A source for windows that never constrain their size.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unconstrained;

impl WindowSource for Unconstrained {
    fn minimum_size(&self, _window: WindowId) -> Option<Size> { None }
}

/// Size limits recorded ahead of time, e.g. from the last accessibility
/// query of each window.
#[derive(Clone, Debug, Default)]
pub struct RecordedSizes {
    minimum: HashMap<WindowId, Size>,
    maximum: HashMap<WindowId, Size>,
}

impl RecordedSizes {
    pub fn new() -> Self { Self::default() }

    pub fn set_minimum(&mut self, window: WindowId, size: Size) { self.minimum.insert(window, size); }

    pub fn set_maximum(&mut self, window: WindowId, size: Size) { self.maximum.insert(window, size); }

    pub fn forget(&mut self, window: WindowId) {
        self.minimum.remove(&window);
        self.maximum.remove(&window);
    }
}

impl WindowSource for RecordedSizes {
    fn minimum_size(&self, window: WindowId) -> Option<Size> { self.minimum.get(&window).copied() }

    fn maximum_size(&self, window: WindowId) -> Option<Size> { self.maximum.get(&window).copied() }
}

impl FromIterator<(WindowId, Size)> for RecordedSizes {
    /// Collects minimum sizes.
    fn from_iter<I: IntoIterator<Item = (WindowId, Size)>>(iter: I) -> Self {
        Self {
            minimum: iter.into_iter().collect(),
            maximum: HashMap::default(),
        }
    }
}
