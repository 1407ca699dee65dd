//! Core interop runtime for objects that speak the platform's binary,
//! vtable-based object protocol.
//! This crate owns object identity, lifetime and every dispatch table it hands
//! out to native callers.

pub mod abi;
pub mod collections;
pub mod config;
pub mod delegate;
pub mod error;
pub mod logging;
pub mod object;
pub mod signature;

pub use abi::{AbiBool, Guid, HResult, Handle, IID_IINSPECTABLE, IID_IUNKNOWN};
pub use collections::{new_array_iterable, Item, IterableRef, IteratorRef};
pub use config::RuntimeConfig;
pub use delegate::{
    new_async_action_completed_handler, new_async_operation_completed_handler, new_delegate,
    new_raw_delegate, new_typed_event_handler, AsyncStatus, DelegateRef, RawArgs,
};
pub use error::{InteropError, InteropResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use object::{GlobalScope, ObjectRef, RegistryScope};
pub use signature::{
    parameterized_instance_guid, parameterized_instance_guid_string, Fundamental,
    SignatureError, TypeShape,
};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Number of objects currently alive in the process-wide registry.
pub fn live_objects() -> usize {
    GlobalScope::registry().len()
}
