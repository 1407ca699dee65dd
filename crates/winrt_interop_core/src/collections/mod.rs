//! Generic enumerator protocol over host sequences.
//!
//! # Responsibility
//! - Expose an immutable snapshot as an `IIterable<T>` object whose `First`
//!   spawns independent `IIterator<T>` objects.
//! - Copy items into caller buffers at their ABI width.
//!
//! # Invariants
//! - The snapshot is captured once and shared by every iterator.
//! - Identity ids derive from the item signature, once per iterable.
//! - Null output slots fail with `E_POINTER` before any state changes.
//!
//! # See also
//! - `signature` for the parameterized id derivation.

pub mod client;
pub mod iterator;
pub mod snapshot;

pub use client::{AbiItem, IterableRef, IteratorRef};
pub use iterator::{ArrayIterable, ArrayIterator, IteratorState};
pub use snapshot::{Item, Snapshot};

use crate::abi::{abi_call, AbiBool, Guid, HResult, Handle};
use crate::error::{InteropError, InteropResult};
use crate::object::{create_object, DispatchTable, IInspectableVtbl, ObjectKind, RegistryScope};
use crate::signature::parameterized_instance_guid;
use log::debug;
use std::ffi::c_void;

/// Generic base id of ``IIterable`1``.
pub const IID_IITERABLE: Guid = Guid::from_u128(0xfaa585ea_6214_4217_afda_7f46de5869b3);
/// Generic base id of ``IIterator`1``.
pub const IID_IITERATOR: Guid = Guid::from_u128(0x6a79e863_4300_459a_9966_cbb660963ee1);

pub type FirstFn = unsafe extern "system" fn(*mut c_void, *mut *mut c_void) -> HResult;
pub type GetCurrentFn = unsafe extern "system" fn(*mut c_void, *mut c_void) -> HResult;
pub type GetHasCurrentFn = unsafe extern "system" fn(*mut c_void, *mut AbiBool) -> HResult;
pub type MoveNextFn = unsafe extern "system" fn(*mut c_void, *mut AbiBool) -> HResult;
pub type GetManyFn =
    unsafe extern "system" fn(*mut c_void, u32, *mut c_void, *mut u32) -> HResult;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct IIterableVtbl {
    pub base: IInspectableVtbl,
    pub first: FirstFn,
}

impl IIterableVtbl {
    pub fn new<S: RegistryScope>() -> Self {
        Self {
            base: IInspectableVtbl::new::<S>(),
            first: first::<S>,
        }
    }
}

unsafe impl DispatchTable for IIterableVtbl {}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct IIteratorVtbl {
    pub base: IInspectableVtbl,
    pub get_current: GetCurrentFn,
    pub get_has_current: GetHasCurrentFn,
    pub move_next: MoveNextFn,
    pub get_many: GetManyFn,
}

impl IIteratorVtbl {
    pub fn new<S: RegistryScope>() -> Self {
        Self {
            base: IInspectableVtbl::new::<S>(),
            get_current: get_current::<S>,
            get_has_current: get_has_current::<S>,
            move_next: move_next::<S>,
            get_many: get_many::<S>,
        }
    }
}

unsafe impl DispatchTable for IIteratorVtbl {}

/// Builds an iterable over `items` in scope `S`.
///
/// `item_signature` is the element's signature (e.g. `i4`); it selects the
/// iterable and iterator identity ids. The returned handle carries one
/// reference.
pub fn new_array_iterable<S, T>(items: impl IntoIterator<Item = T>, item_signature: &str) -> Handle
where
    S: RegistryScope,
    T: Into<Item>,
{
    let snapshot = Snapshot::new(items.into_iter().map(Into::into));
    let iterable_iid = parameterized_instance_guid(IID_IITERABLE, &[item_signature]);
    let iterator_iid = parameterized_instance_guid(IID_IITERATOR, &[item_signature]);
    let len = snapshot.len();
    let handle = create_object::<S, _>(
        iterable_iid,
        ObjectKind::ArrayIterable(ArrayIterable::new(snapshot, item_signature, iterator_iid)),
        IIterableVtbl::new::<S>(),
    );
    debug!(
        "event=iterable_create module=collections status=ok handle={handle} len={len} item_signature={item_signature}"
    );
    handle
}

fn with_iterable<S: RegistryScope, R>(
    handle: Handle,
    f: impl FnOnce(&ArrayIterable) -> InteropResult<R>,
) -> InteropResult<R> {
    let object = S::registry().lookup(handle)?;
    match object.kind() {
        ObjectKind::ArrayIterable(iterable) => f(iterable),
        _ => Err(InteropError::NotFound(handle)),
    }
}

fn with_iterator<S: RegistryScope, R>(
    handle: Handle,
    f: impl FnOnce(&ArrayIterator) -> InteropResult<R>,
) -> InteropResult<R> {
    let object = S::registry().lookup(handle)?;
    match object.kind() {
        ObjectKind::ArrayIterator(iterator) => f(iterator),
        _ => Err(InteropError::NotFound(handle)),
    }
}

unsafe extern "system" fn first<S: RegistryScope>(
    this: *mut c_void,
    out: *mut *mut c_void,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("First", handle, || {
        if out.is_null() {
            return Err(InteropError::InvalidArgument("out"));
        }
        let (iid, state, item_signature) = with_iterable::<S, _>(handle, |iterable| {
            Ok((
                iterable.iterator_iid(),
                iterable.first(),
                iterable.item_signature().to_string(),
            ))
        })?;
        let iterator = create_object::<S, _>(
            iid,
            ObjectKind::ArrayIterator(state),
            IIteratorVtbl::new::<S>(),
        );
        debug!(
            "event=iterator_create module=collections status=ok iterable={handle} handle={iterator} item_signature={item_signature}"
        );
        // SAFETY: caller-supplied, non-null slot.
        unsafe { out.write(iterator.as_ptr()) };
        Ok(())
    })
}

unsafe extern "system" fn get_current<S: RegistryScope>(
    this: *mut c_void,
    out: *mut c_void,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("GetCurrent", handle, || {
        if out.is_null() {
            return Err(InteropError::InvalidArgument("out"));
        }
        let item = with_iterator::<S, _>(handle, ArrayIterator::current)?;
        // SAFETY: the caller sized `out` for one element of this sequence.
        unsafe { item.write_to(out.cast()) };
        Ok(())
    })
}

unsafe extern "system" fn get_has_current<S: RegistryScope>(
    this: *mut c_void,
    out: *mut AbiBool,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("GetHasCurrent", handle, || {
        if out.is_null() {
            return Err(InteropError::InvalidArgument("out"));
        }
        let has_current = with_iterator::<S, _>(handle, |it| Ok(it.has_current()))?;
        // SAFETY: caller-supplied, non-null slot.
        unsafe { out.write(AbiBool::from(has_current)) };
        Ok(())
    })
}

unsafe extern "system" fn move_next<S: RegistryScope>(
    this: *mut c_void,
    out: *mut AbiBool,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("MoveNext", handle, || {
        if out.is_null() {
            return Err(InteropError::InvalidArgument("out"));
        }
        let has_current = with_iterator::<S, _>(handle, |it| Ok(it.move_next()))?;
        // SAFETY: caller-supplied, non-null slot.
        unsafe { out.write(AbiBool::from(has_current)) };
        Ok(())
    })
}

unsafe extern "system" fn get_many<S: RegistryScope>(
    this: *mut c_void,
    capacity: u32,
    items: *mut c_void,
    actual: *mut u32,
) -> HResult {
    let handle = Handle::from_ptr(this);
    abi_call("GetMany", handle, || {
        if actual.is_null() {
            return Err(InteropError::InvalidArgument("actual"));
        }
        if items.is_null() && capacity > 0 {
            return Err(InteropError::InvalidArgument("items"));
        }
        let object = S::registry().lookup(handle)?;
        let ObjectKind::ArrayIterator(iterator) = object.kind() else {
            return Err(InteropError::NotFound(handle));
        };
        let taken = iterator.get_many(capacity as usize);
        let mut cursor = items.cast::<u8>();
        for item in taken {
            // SAFETY: the caller sized `items` for `capacity` elements and
            // `taken` holds at most that many.
            cursor = unsafe { cursor.add(item.write_to(cursor)) };
        }
        // SAFETY: checked non-null above.
        unsafe { actual.write(taken.len() as u32) };
        Ok(())
    })
}
