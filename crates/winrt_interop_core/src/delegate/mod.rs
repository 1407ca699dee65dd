//! Native callback bridge.
//!
//! # Responsibility
//! - Build delegate objects whose `Invoke` slot routes to a host closure.
//! - Decode the fixed nine-word argument list per delegate kind.
//!
//! # Invariants
//! - `Invoke` on a live delegate always reports success.
//! - A panicking closure is logged and never unwinds into native frames.
//! - The registry entry owns the closure until the last release.

pub mod kinds;

pub use kinds::{
    AsyncActionCompleted, AsyncCompleted, AsyncOperationCompleted, AsyncStatus, DelegateKind,
    RawDelegate, TypedEvent, TypedEventHandler, IID_ASYNC_ACTION_COMPLETED_HANDLER,
    IID_ASYNC_OPERATION_COMPLETED_HANDLER, IID_TYPED_EVENT_HANDLER,
};

use crate::abi::{abi_call, Guid, HResult, Handle};
use crate::error::InteropError;
use crate::logging::describe_panic;
use crate::object::{
    create_object, DispatchTable, IUnknownVtbl, ObjectKind, ObjectRef, RegistryScope,
};
use crate::signature::parameterized_instance_guid;
use log::{debug, error};
use std::ffi::c_void;
use std::fmt::{Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};

/// Machine words every `Invoke` receives after `this`.
pub const DELEGATE_ARITY: usize = 9;

pub type RawArgs = [usize; DELEGATE_ARITY];

pub type InvokeFn = unsafe extern "system" fn(
    *mut c_void,
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
) -> HResult;

type Callback = Box<dyn Fn(&RawArgs) + Send + Sync>;

/// Host state of a delegate object.
pub struct DelegateState {
    kind: &'static str,
    callback: Callback,
}

impl DelegateState {
    /// Runs the closure, logging instead of propagating a panic.
    fn invoke(&self, handle: Handle, raw: &RawArgs) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(raw))) {
            error!(
                "event=delegate_invoke module=delegate status=error kind={} handle={handle} error_code=callback_panicked payload={}",
                self.kind,
                describe_panic(payload.as_ref())
            );
        }
    }
}

impl Debug for DelegateState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateState")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Delegates derive from `IUnknown` only; `Invoke` is slot 3.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct DelegateVtbl {
    pub base: IUnknownVtbl,
    pub invoke: InvokeFn,
}

impl DelegateVtbl {
    pub fn new<S: RegistryScope>() -> Self {
        Self {
            base: IUnknownVtbl::new::<S>(),
            invoke: invoke::<S>,
        }
    }
}

unsafe impl DispatchTable for DelegateVtbl {}

/// Builds a delegate answering to `iid` whose arguments decode as `K`.
pub fn new_delegate<S, K>(iid: Guid, callback: impl Fn(K::Args) + Send + Sync + 'static) -> Handle
where
    S: RegistryScope,
    K: DelegateKind + 'static,
{
    let state = DelegateState {
        kind: K::NAME,
        callback: Box::new(move |raw: &RawArgs| callback(K::decode(raw))),
    };
    let handle = create_object::<S, _>(iid, ObjectKind::Delegate(state), DelegateVtbl::new::<S>());
    debug!(
        "event=delegate_create module=delegate status=ok kind={} handle={handle} iid={iid}",
        K::NAME
    );
    handle
}

/// Delegate for a generated type that decodes its own arguments.
pub fn new_raw_delegate<S: RegistryScope>(
    iid: Guid,
    callback: impl Fn(&RawArgs) + Send + Sync + 'static,
) -> Handle {
    new_delegate::<S, RawDelegate>(iid, move |raw| callback(&raw))
}

pub fn new_async_action_completed_handler<S: RegistryScope>(
    callback: impl Fn(AsyncCompleted) + Send + Sync + 'static,
) -> Handle {
    new_delegate::<S, AsyncActionCompleted>(IID_ASYNC_ACTION_COMPLETED_HANDLER, callback)
}

/// `AsyncOperationCompletedHandler<TResult>` for the result type signature.
pub fn new_async_operation_completed_handler<S: RegistryScope>(
    result_signature: &str,
    callback: impl Fn(AsyncCompleted) + Send + Sync + 'static,
) -> Handle {
    let iid =
        parameterized_instance_guid(IID_ASYNC_OPERATION_COMPLETED_HANDLER, &[result_signature]);
    new_delegate::<S, AsyncOperationCompleted>(iid, callback)
}

/// `TypedEventHandler<TSender, TResult>` for the two type signatures.
pub fn new_typed_event_handler<S: RegistryScope>(
    sender_signature: &str,
    args_signature: &str,
    callback: impl Fn(TypedEvent) + Send + Sync + 'static,
) -> Handle {
    let iid = parameterized_instance_guid(
        IID_TYPED_EVENT_HANDLER,
        &[sender_signature, args_signature],
    );
    new_delegate::<S, TypedEventHandler>(iid, callback)
}

#[allow(clippy::too_many_arguments)]
unsafe extern "system" fn invoke<S: RegistryScope>(
    this: *mut c_void,
    a0: usize,
    a1: usize,
    a2: usize,
    a3: usize,
    a4: usize,
    a5: usize,
    a6: usize,
    a7: usize,
    a8: usize,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("Invoke", handle, || {
        let object = S::registry().lookup(handle)?;
        let ObjectKind::Delegate(state) = object.kind() else {
            return Err(InteropError::NotFound(handle));
        };
        state.invoke(handle, &[a0, a1, a2, a3, a4, a5, a6, a7, a8]);
        Ok(())
    })
}

/// Owning reference to a delegate object.
#[derive(Debug, Clone)]
pub struct DelegateRef {
    object: ObjectRef,
}

impl DelegateRef {
    /// # Safety
    /// `handle` must be a live delegate and the caller must own one reference.
    pub unsafe fn from_owned(handle: Handle) -> Self {
        Self {
            // SAFETY: forwarded from the caller.
            object: unsafe { ObjectRef::from_owned(handle) },
        }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn handle(&self) -> Handle {
        self.object.handle()
    }

    /// Calls `Invoke` through the table with the given words.
    pub fn invoke(&self, raw: RawArgs) -> Result<(), HResult> {
        let [a0, a1, a2, a3, a4, a5, a6, a7, a8] = raw;
        // SAFETY: this view was built over a delegate table.
        let hr = unsafe {
            let vtbl = self.object.vtable::<DelegateVtbl>();
            (vtbl.invoke)(self.handle().as_ptr(), a0, a1, a2, a3, a4, a5, a6, a7, a8)
        };
        hr.ok()
    }
}
