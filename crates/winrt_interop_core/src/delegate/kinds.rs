//! Argument decoding for the delegate kinds the runtime knows about.

use super::RawArgs;
use crate::abi::{Guid, Handle};
use std::fmt::{Display, Formatter};

/// Generic base id of ``AsyncOperationCompletedHandler`1``.
pub const IID_ASYNC_OPERATION_COMPLETED_HANDLER: Guid =
    Guid::from_u128(0xfcdcf02c_e5d8_4478_915a_4d90b74b83a5);
/// Id of the non-generic `AsyncActionCompletedHandler`.
pub const IID_ASYNC_ACTION_COMPLETED_HANDLER: Guid =
    Guid::from_u128(0xa4ed5c81_76c9_40bd_8be6_b1d90fb20ae7);
/// Generic base id of ``TypedEventHandler`2``.
pub const IID_TYPED_EVENT_HANDLER: Guid = Guid::from_u128(0x9de1c534_6ae1_11e0_84e1_18a905bcc53f);

/// Decodes the nine raw argument words of one delegate kind.
pub trait DelegateKind {
    const NAME: &'static str;
    type Args;

    fn decode(raw: &RawArgs) -> Self::Args;
}

/// Completion status reported to async completion handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncStatus {
    Started,
    Completed,
    Canceled,
    Error,
    Other(i32),
}

impl From<i32> for AsyncStatus {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Started,
            1 => Self::Completed,
            2 => Self::Canceled,
            3 => Self::Error,
            other => Self::Other(other),
        }
    }
}

impl From<AsyncStatus> for i32 {
    fn from(value: AsyncStatus) -> Self {
        match value {
            AsyncStatus::Started => 0,
            AsyncStatus::Completed => 1,
            AsyncStatus::Canceled => 2,
            AsyncStatus::Error => 3,
            AsyncStatus::Other(other) => other,
        }
    }
}

impl Display for AsyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => f.write_str("started"),
            Self::Completed => f.write_str("completed"),
            Self::Canceled => f.write_str("canceled"),
            Self::Error => f.write_str("error"),
            Self::Other(value) => write!(f, "other({value})"),
        }
    }
}

/// The enum argument arrives in the low 32 bits of its word.
fn status_word(word: usize) -> AsyncStatus {
    AsyncStatus::from(word as u32 as i32)
}

/// Arguments of an async completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncCompleted {
    pub async_info: Handle,
    pub status: AsyncStatus,
}

/// Arguments of a typed event callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedEvent {
    pub sender: Handle,
    pub args: Handle,
}

pub struct AsyncActionCompleted;

impl DelegateKind for AsyncActionCompleted {
    const NAME: &'static str = "async_action_completed";
    type Args = AsyncCompleted;

    fn decode(raw: &RawArgs) -> AsyncCompleted {
        AsyncCompleted {
            async_info: Handle::from_addr(raw[0]),
            status: status_word(raw[1]),
        }
    }
}

pub struct AsyncOperationCompleted;

impl DelegateKind for AsyncOperationCompleted {
    const NAME: &'static str = "async_operation_completed";
    type Args = AsyncCompleted;

    fn decode(raw: &RawArgs) -> AsyncCompleted {
        AsyncActionCompleted::decode(raw)
    }
}

pub struct TypedEventHandler;

impl DelegateKind for TypedEventHandler {
    const NAME: &'static str = "typed_event_handler";
    type Args = TypedEvent;

    fn decode(raw: &RawArgs) -> TypedEvent {
        TypedEvent {
            sender: Handle::from_addr(raw[0]),
            args: Handle::from_addr(raw[1]),
        }
    }
}

/// Generated delegates decode their own arguments.
pub struct RawDelegate;

impl DelegateKind for RawDelegate {
    const NAME: &'static str = "raw";
    type Args = RawArgs;

    fn decode(raw: &RawArgs) -> RawArgs {
        *raw
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AsyncActionCompleted, AsyncStatus, DelegateKind, RawDelegate, TypedEventHandler,
    };
    use crate::abi::Handle;

    #[test]
    fn status_keeps_unknown_values() {
        assert_eq!(AsyncStatus::from(1), AsyncStatus::Completed);
        assert_eq!(AsyncStatus::from(42), AsyncStatus::Other(42));
        assert_eq!(i32::from(AsyncStatus::Other(42)), 42);
        assert_eq!(i32::from(AsyncStatus::Canceled), 2);
        assert_eq!(AsyncStatus::Error.to_string(), "error");
    }

    #[test]
    fn async_completed_reads_handle_and_low_status_bits() {
        let mut raw = [0_usize; 9];
        raw[0] = 0xbeef0;
        raw[1] = 3;
        let args = AsyncActionCompleted::decode(&raw);
        assert_eq!(args.async_info, Handle::from_addr(0xbeef0));
        assert_eq!(args.status, AsyncStatus::Error);
    }

    #[test]
    fn typed_event_and_raw_decode_words() {
        let raw = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        let event = TypedEventHandler::decode(&raw);
        assert_eq!(event.sender, Handle::from_addr(1));
        assert_eq!(event.args, Handle::from_addr(2));
        assert_eq!(RawDelegate::decode(&raw), raw);
    }
}
