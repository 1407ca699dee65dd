//! Host-side owning reference that calls an object through its table.
//!
//! Calls go through the function pointers stored behind the handle, exactly
//! as a native caller would, so the same code drives runtime-built objects
//! and foreign ones.

use super::factory::IUnknownVtbl;
use crate::abi::{Guid, HResult, Handle};
use std::ffi::c_void;
use std::ptr;

/// One counted reference to a live object; released on drop.
#[derive(Debug)]
pub struct ObjectRef {
    handle: Handle,
}

impl ObjectRef {
    /// Takes over one reference the caller already owns.
    ///
    /// # Safety
    /// `handle` must address a live object whose first word points at a table
    /// starting with `IUnknownVtbl`, and the caller must own one reference.
    pub unsafe fn from_owned(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Typed view of the table behind the handle.
    ///
    /// # Safety
    /// `V` must be the object's actual table type (or a prefix of it).
    pub unsafe fn vtable<V>(&self) -> &V {
        // SAFETY: a live object's first word points at its table.
        unsafe { &**(self.handle.as_ptr() as *const *const V) }
    }

    fn unknown(&self) -> &IUnknownVtbl {
        // SAFETY: every table starts with the IUnknown header.
        unsafe { self.vtable::<IUnknownVtbl>() }
    }

    /// Calls `AddRef` and returns the new count.
    pub fn add_ref(&self) -> u32 {
        // SAFETY: this reference keeps the object alive.
        unsafe { (self.unknown().add_ref)(self.handle.as_ptr()) }
    }

    /// Asks the object for `iid`, returning a new counted reference.
    pub fn query_interface(&self, iid: &Guid) -> Result<ObjectRef, HResult> {
        let mut out: *mut c_void = ptr::null_mut();
        // SAFETY: live object, valid iid and out slot.
        let hr = unsafe { (self.unknown().query_interface)(self.handle.as_ptr(), iid, &mut out) };
        hr.ok()?;
        // SAFETY: a successful QueryInterface transfers one reference.
        Ok(unsafe { Self::from_owned(Handle::from_ptr(out)) })
    }
}

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        self.add_ref();
        Self {
            handle: self.handle,
        }
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        // SAFETY: this reference is owned and is given up here.
        unsafe { (self.unknown().release)(self.handle.as_ptr()) };
    }
}
