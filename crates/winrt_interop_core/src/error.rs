//! Runtime error taxonomy and its mapping to ABI status codes.
//!
//! # Invariants
//! - Every variant maps to exactly one failure `HResult`.
//! - Errors never cross the ABI boundary as panics; entry points convert them.

use crate::abi::{Guid, HResult, Handle};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type InteropResult<T> = Result<T, InteropError>;

/// Failure of one runtime operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteropError {
    /// Handle unknown to the registry, or its backing state is gone.
    NotFound(Handle),
    /// A required pointer argument was null.
    InvalidArgument(&'static str),
    /// QueryInterface asked for an id the object does not implement.
    NoSuchInterface(Guid),
    /// `GetCurrent` without a current element.
    OutOfRange { index: isize, len: usize },
}

impl InteropError {
    /// Status code reported at the ABI boundary.
    pub fn hresult(&self) -> HResult {
        match self {
            Self::NotFound(_) => HResult::E_FAIL,
            Self::InvalidArgument(_) => HResult::E_POINTER,
            Self::NoSuchInterface(_) => HResult::E_NOINTERFACE,
            Self::OutOfRange { .. } => HResult::E_BOUNDS,
        }
    }
}

impl Display for InteropError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(handle) => write!(f, "object not found: {handle}"),
            Self::InvalidArgument(name) => write!(f, "required argument is null: {name}"),
            Self::NoSuchInterface(iid) => write!(f, "interface not supported: {iid}"),
            Self::OutOfRange { index, len } => {
                write!(f, "iterator has no current item (index {index}, length {len})")
            }
        }
    }
}

impl Error for InteropError {}

#[cfg(test)]
mod tests {
    use super::InteropError;
    use crate::abi::{HResult, Handle, IID_IUNKNOWN};

    #[test]
    fn maps_each_variant_to_its_status() {
        assert_eq!(
            InteropError::NotFound(Handle::from_addr(1)).hresult(),
            HResult::E_FAIL
        );
        assert_eq!(
            InteropError::InvalidArgument("out").hresult(),
            HResult::E_POINTER
        );
        assert_eq!(
            InteropError::NoSuchInterface(IID_IUNKNOWN).hresult(),
            HResult::E_NOINTERFACE
        );
        assert_eq!(
            InteropError::OutOfRange { index: 3, len: 3 }.hresult(),
            HResult::E_BOUNDS
        );
    }

    #[test]
    fn display_names_the_failure() {
        let err = InteropError::OutOfRange { index: -1, len: 0 };
        assert!(err.to_string().contains("no current item"));
    }
}
