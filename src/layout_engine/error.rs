use thiserror::Error;

use super::flex::FlexError;
use crate::sys::window::{DesktopId, WindowId};

/// Conditions under which the workspace refuses an edit.
///
/// None of these leave the tree partially modified: an edit either commits
/// completely or the tree is exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TilingError {
    #[error("layout constraints cannot be satisfied")]
    UnsatisfiableConstraints,
    #[error("no valid placement exists for the window")]
    NoValidPlacement,
    #[error("the requested target cannot fit the node")]
    TargetCannotFit,
    #[error("there is no target for the operation")]
    MissingTarget,
    #[error("there is no adjacent window in that direction")]
    MissingAdjacentWindow,
    #[error("the operation would nest a node inside itself")]
    CausesRecursiveNesting,
    #[error("stack panels may only contain windows")]
    NestingInStackPanel,
    #[error("the operation would modify the top-level panel")]
    ModifiesTopLevelPanel,
    #[error("the operation would pull a node beyond the top-level panel")]
    PullsBeyondTopLevelPanel,
    #[error("window {0:?} is already registered")]
    AlreadyRegistered(WindowId),
    #[error("desktop {0} is not registered")]
    UnknownDesktop(DesktopId),
}

impl From<FlexError> for TilingError {
    fn from(err: FlexError) -> Self {
        match err {
            FlexError::Unsatisfiable => TilingError::UnsatisfiableConstraints,
        }
    }
}

pub type Result<T, E = TilingError> = std::result::Result<T, E>;
