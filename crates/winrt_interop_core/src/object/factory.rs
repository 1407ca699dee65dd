//! Dispatch table factory.
//!
//! # Responsibility
//! - Allocate the fixed-address block whose first word points at the object's
//!   function table, with the table stored in the same allocation.
//! - Wire the shared header slots (IUnknown, optionally IInspectable) to
//!   trampolines that resolve the handle through a `RegistryScope`.
//! - Register the new object so every later ABI call can find it.
//!
//! # Invariants
//! - The block never moves; its address is the handle.
//! - The block is freed with its `LogicalObject`, after it left the registry.
//! - Trampolines never dereference the handle; they only look it up.

use super::{LogicalObject, ObjectKind, RegistryScope, Unknown};
use crate::abi::{abi_call, abi_count, Guid, HResult, Handle, BASE_TRUST};
use crate::error::{InteropError, InteropResult};
use log::debug;
use std::any::Any;
use std::ffi::c_void;
use std::ptr::{self, NonNull};
use std::sync::Arc;

pub type QueryInterfaceFn =
    unsafe extern "system" fn(*mut c_void, *const Guid, *mut *mut c_void) -> HResult;
pub type AddRefFn = unsafe extern "system" fn(*mut c_void) -> u32;
pub type ReleaseFn = unsafe extern "system" fn(*mut c_void) -> u32;
pub type GetIidsFn = unsafe extern "system" fn(*mut c_void, *mut u32, *mut *mut Guid) -> HResult;
pub type GetRuntimeClassNameFn =
    unsafe extern "system" fn(*mut c_void, *mut *mut c_void) -> HResult;
pub type GetTrustLevelFn = unsafe extern "system" fn(*mut c_void, *mut i32) -> HResult;

/// A `#[repr(C)]` function table that can back an object.
///
/// # Safety
/// Implementors must be `#[repr(C)]`, begin with `IUnknownVtbl` (directly or
/// through `IInspectableVtbl`) and hold nothing but function pointers.
pub unsafe trait DispatchTable: Copy + Send + Sync + 'static {}

/// Slots 0..=2 of every table.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct IUnknownVtbl {
    pub query_interface: QueryInterfaceFn,
    pub add_ref: AddRefFn,
    pub release: ReleaseFn,
}

impl IUnknownVtbl {
    pub fn new<S: RegistryScope>() -> Self {
        Self {
            query_interface: query_interface::<S>,
            add_ref: add_ref::<S>,
            release: release::<S>,
        }
    }
}

unsafe impl DispatchTable for IUnknownVtbl {}

/// Slots 0..=5 of every inspectable table.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct IInspectableVtbl {
    pub base: IUnknownVtbl,
    pub get_iids: GetIidsFn,
    pub get_runtime_class_name: GetRuntimeClassNameFn,
    pub get_trust_level: GetTrustLevelFn,
}

impl IInspectableVtbl {
    pub fn new<S: RegistryScope>() -> Self {
        Self {
            base: IUnknownVtbl::new::<S>(),
            get_iids: get_iids::<S>,
            get_runtime_class_name: get_runtime_class_name::<S>,
            get_trust_level: get_trust_level::<S>,
        }
    }
}

unsafe impl DispatchTable for IInspectableVtbl {}

#[repr(C)]
struct Block<V> {
    vtable: *const V,
    table: V,
}

/// Owner of one fixed-address block.
pub(crate) struct NativeBlock {
    ptr: NonNull<c_void>,
    free: unsafe fn(NonNull<c_void>),
}

impl NativeBlock {
    fn allocate<V: DispatchTable>(table: V) -> Self {
        let block = Box::leak(Box::new(Block {
            vtable: ptr::null(),
            table,
        }));
        block.vtable = ptr::addr_of!(block.table);
        Self {
            ptr: NonNull::from(block).cast(),
            free: free_block::<V>,
        }
    }

    pub(crate) fn handle(&self) -> Handle {
        Handle::from_ptr(self.ptr.as_ptr())
    }
}

unsafe fn free_block<V>(ptr: NonNull<c_void>) {
    // SAFETY: `ptr` came from `Box::leak` of a `Block<V>` in `allocate`.
    drop(unsafe { Box::from_raw(ptr.cast::<Block<V>>().as_ptr()) });
}

impl Drop for NativeBlock {
    fn drop(&mut self) {
        // SAFETY: each block is owned by exactly one `NativeBlock`.
        unsafe { (self.free)(self.ptr) }
    }
}

// SAFETY: the block holds only function pointers and a pointer into itself;
// it is immutable after `allocate`.
unsafe impl Send for NativeBlock {}
unsafe impl Sync for NativeBlock {}

/// Allocates a block for `table`, registers the object in scope `S` and
/// returns its handle carrying one reference.
pub fn create_object<S: RegistryScope, V: DispatchTable>(
    iid: Guid,
    kind: ObjectKind,
    table: V,
) -> Handle {
    let block = NativeBlock::allocate(table);
    let handle = block.handle();
    let kind_name = kind.name();
    S::registry().register(handle, Arc::new(LogicalObject::new(iid, kind, block)));
    debug!(
        "event=object_create module=factory status=ok kind={kind_name} handle={handle} iid={iid}"
    );
    handle
}

/// Recovers the typed state of a generated class object.
pub fn class_state<S: RegistryScope, T: Any + Send + Sync>(
    handle: Handle,
) -> InteropResult<Arc<T>> {
    let object = S::registry().lookup(handle)?;
    match object.kind() {
        ObjectKind::Class(state) => Arc::clone(state)
            .downcast::<T>()
            .map_err(|_| InteropError::NotFound(handle)),
        _ => Err(InteropError::NotFound(handle)),
    }
}

unsafe extern "system" fn query_interface<S: RegistryScope>(
    this: *mut c_void,
    iid: *const Guid,
    out: *mut *mut c_void,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("QueryInterface", handle, || {
        if out.is_null() {
            return Err(InteropError::InvalidArgument("out"));
        }
        // SAFETY: `out` is a caller-supplied, non-null slot.
        unsafe { out.write(ptr::null_mut()) };
        if iid.is_null() {
            return Err(InteropError::InvalidArgument("iid"));
        }
        // SAFETY: `iid` is non-null and points at a caller-owned GUID.
        let requested = unsafe { iid.read_unaligned() };
        let object = S::registry().lookup(handle)?;
        if !object.answers_to(&requested) {
            return Err(InteropError::NoSuchInterface(requested));
        }
        object.add_ref();
        // SAFETY: checked non-null above.
        unsafe { out.write(this) };
        Ok(())
    })
}

unsafe extern "system" fn add_ref<S: RegistryScope>(this: *mut c_void) -> u32 {
    let handle = Handle::from_ptr(this);
    abi_count("AddRef", handle, || S::registry().add_ref(handle))
}

unsafe extern "system" fn release<S: RegistryScope>(this: *mut c_void) -> u32 {
    let handle = Handle::from_ptr(this);
    abi_count("Release", handle, || S::registry().release(handle))
}

unsafe extern "system" fn get_iids<S: RegistryScope>(
    this: *mut c_void,
    count: *mut u32,
    iids: *mut *mut Guid,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("GetIids", handle, || {
        if count.is_null() || iids.is_null() {
            return Err(InteropError::InvalidArgument("out"));
        }
        S::registry().lookup(handle)?;
        // SAFETY: both slots are caller-supplied and non-null.
        unsafe {
            count.write(0);
            iids.write(ptr::null_mut());
        }
        Ok(())
    })
}

unsafe extern "system" fn get_runtime_class_name<S: RegistryScope>(
    this: *mut c_void,
    out: *mut *mut c_void,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("GetRuntimeClassName", handle, || {
        if out.is_null() {
            return Err(InteropError::InvalidArgument("out"));
        }
        S::registry().lookup(handle)?;
        // A null string handle is the empty class name.
        // SAFETY: caller-supplied, non-null slot.
        unsafe { out.write(ptr::null_mut()) };
        Ok(())
    })
}

unsafe extern "system" fn get_trust_level<S: RegistryScope>(
    this: *mut c_void,
    out: *mut i32,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("GetTrustLevel", handle, || {
        if out.is_null() {
            return Err(InteropError::InvalidArgument("out"));
        }
        S::registry().lookup(handle)?;
        // SAFETY: caller-supplied, non-null slot.
        unsafe { out.write(BASE_TRUST) };
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::{class_state, create_object, IInspectableVtbl, IUnknownVtbl};
    use crate::abi::{Guid, HResult, Handle, IID_IINSPECTABLE, IID_IUNKNOWN};
    use crate::object::{ObjectKind, RegistryScope};
    use crate::registry_scope;
    use std::ffi::c_void;
    use std::ptr;
    use std::sync::Arc;

    const OWN_IID: Guid = Guid::from_u128(0x7822b3cd_2889_4f86_a051_3f0aed1c2760);

    fn header(handle: Handle) -> IUnknownVtbl {
        // SAFETY: the first word of a live block points at its table.
        unsafe { **(handle.as_ptr() as *const *const IUnknownVtbl) }
    }

    fn new_class<S: RegistryScope>() -> Handle {
        create_object::<S, _>(
            OWN_IID,
            ObjectKind::Class(Arc::new(41_u32)),
            IInspectableVtbl::new::<S>(),
        )
    }

    #[test]
    fn first_word_points_at_registered_table() {
        registry_scope!(Scope);
        let handle = new_class::<Scope>();
        let vtbl = header(handle);
        assert!(Scope::registry().contains(handle));

        // SAFETY: trampolines only look the handle up.
        unsafe {
            assert_eq!((vtbl.add_ref)(handle.as_ptr()), 2);
            assert_eq!((vtbl.release)(handle.as_ptr()), 1);
            assert_eq!((vtbl.release)(handle.as_ptr()), 0);
            assert_eq!((vtbl.release)(handle.as_ptr()), 0);
        }
        assert!(Scope::registry().is_empty());
    }

    #[test]
    fn query_interface_accepts_own_and_universal_ids() {
        registry_scope!(Scope);
        let handle = new_class::<Scope>();
        let vtbl = header(handle);

        for iid in [OWN_IID, IID_IUNKNOWN, IID_IINSPECTABLE] {
            let mut out: *mut c_void = ptr::null_mut();
            // SAFETY: valid handle, iid and out slot.
            let hr = unsafe { (vtbl.query_interface)(handle.as_ptr(), &iid, &mut out) };
            assert_eq!(hr, HResult::S_OK);
            assert_eq!(out, handle.as_ptr());
        }
        let object = Scope::registry().lookup(handle).expect("registered");
        assert_eq!(object.ref_count(), 4);
        drop(object);

        let other = Guid::from_u128(0x1);
        let mut out: *mut c_void = handle.as_ptr();
        // SAFETY: valid handle, iid and out slot.
        let hr = unsafe { (vtbl.query_interface)(handle.as_ptr(), &other, &mut out) };
        assert_eq!(hr, HResult::E_NOINTERFACE);
        assert!(out.is_null());

        // SAFETY: null out slot is rejected before any write.
        let hr = unsafe { (vtbl.query_interface)(handle.as_ptr(), &OWN_IID, ptr::null_mut()) };
        assert_eq!(hr, HResult::E_POINTER);

        for _ in 0..4 {
            // SAFETY: trampolines only look the handle up.
            unsafe { (vtbl.release)(handle.as_ptr()) };
        }
        assert!(Scope::registry().is_empty());
    }

    #[test]
    fn inspectable_slots_report_empty_metadata() {
        registry_scope!(Scope);
        let handle = new_class::<Scope>();
        // SAFETY: the block was built from an `IInspectableVtbl`.
        let vtbl = unsafe { **(handle.as_ptr() as *const *const IInspectableVtbl) };

        let mut count = 7_u32;
        let mut iids: *mut Guid = ptr::NonNull::dangling().as_ptr();
        let mut name: *mut c_void = ptr::NonNull::dangling().as_ptr();
        let mut trust = -1_i32;
        // SAFETY: valid handle and out slots.
        unsafe {
            assert_eq!((vtbl.get_iids)(handle.as_ptr(), &mut count, &mut iids), HResult::S_OK);
            assert_eq!(
                (vtbl.get_runtime_class_name)(handle.as_ptr(), &mut name),
                HResult::S_OK
            );
            assert_eq!((vtbl.get_trust_level)(handle.as_ptr(), &mut trust), HResult::S_OK);
            (vtbl.base.release)(handle.as_ptr());
        }
        assert_eq!(count, 0);
        assert!(iids.is_null());
        assert!(name.is_null());
        assert_eq!(trust, 0);
    }

    #[test]
    fn class_state_downcasts_to_the_stored_type() {
        registry_scope!(Scope);
        let handle = new_class::<Scope>();
        let state = class_state::<Scope, u32>(handle).expect("u32 state");
        assert_eq!(*state, 41);
        assert!(class_state::<Scope, String>(handle).is_err());

        let vtbl = header(handle);
        // SAFETY: trampolines only look the handle up.
        unsafe { (vtbl.release)(handle.as_ptr()) };
        assert!(class_state::<Scope, u32>(handle).is_err());
    }

    #[test]
    fn unknown_handle_fails_without_dereferencing() {
        registry_scope!(Scope);
        let vtbl = IUnknownVtbl::new::<Scope>();
        let bogus = Handle::from_addr(0x8);
        let mut out: *mut c_void = ptr::null_mut();
        // SAFETY: trampolines never read through the handle.
        unsafe {
            assert_eq!((vtbl.add_ref)(bogus.as_ptr()), 0);
            assert_eq!((vtbl.release)(bogus.as_ptr()), 0);
            assert_eq!(
                (vtbl.query_interface)(bogus.as_ptr(), &IID_IUNKNOWN, &mut out),
                HResult::E_FAIL
            );
        }
        assert!(out.is_null());
    }
}
