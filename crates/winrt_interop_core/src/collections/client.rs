//! Host-side views that drive iterables through their dispatch tables.

use super::{IIterableVtbl, IIteratorVtbl};
use crate::abi::{AbiBool, HResult, Handle};
use crate::object::ObjectRef;
use std::ffi::c_void;
use std::mem::{self, MaybeUninit};
use std::ptr;

mod sealed {
    pub trait Sealed {}
}

/// Element types a host can read back out of an iterator.
pub trait AbiItem: sealed::Sealed + Copy {}

macro_rules! abi_item {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}
            impl AbiItem for $ty {}
        )*
    };
}

abi_item!(i8, u8, i16, u16, i32, u32, i64, u64, usize);

/// Widest item the runtime ever writes for one element.
const MAX_ITEM_WIDTH: usize = 8;

fn read_item<T: AbiItem>(bytes: &[u8]) -> T {
    debug_assert!(bytes.len() >= mem::size_of::<T>());
    // SAFETY: `T` is a plain integer, valid for any bit pattern, and `bytes`
    // holds at least `size_of::<T>()` bytes.
    unsafe { bytes.as_ptr().cast::<T>().read_unaligned() }
}

/// Owning reference to an `IIterable<T>` object.
#[derive(Debug, Clone)]
pub struct IterableRef {
    object: ObjectRef,
}

impl IterableRef {
    /// # Safety
    /// `handle` must be a live iterable and the caller must own one reference.
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

    pub fn first(&self) -> Result<IteratorRef, HResult> {
        let mut out: *mut c_void = ptr::null_mut();
        // SAFETY: this view was built over an iterable table.
        let hr = unsafe {
            let vtbl = self.object.vtable::<IIterableVtbl>();
            (vtbl.first)(self.handle().as_ptr(), &mut out)
        };
        hr.ok()?;
        // SAFETY: `First` hands out one reference to a new iterator.
        Ok(unsafe { IteratorRef::from_owned(Handle::from_ptr(out)) })
    }
}

/// Owning reference to an `IIterator<T>` object.
#[derive(Debug, Clone)]
pub struct IteratorRef {
    object: ObjectRef,
}

impl IteratorRef {
    /// # Safety
    /// `handle` must be a live iterator and the caller must own one reference.
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

    fn vtbl(&self) -> &IIteratorVtbl {
        // SAFETY: this view was built over an iterator table.
        unsafe { self.object.vtable::<IIteratorVtbl>() }
    }

    /// Reads the current element as `T`.
    ///
    /// `T` should match the sequence's element type; a wider `T` reads zeros
    /// past the element.
    pub fn current<T: AbiItem>(&self) -> Result<T, HResult> {
        let mut buffer = [0_u8; MAX_ITEM_WIDTH];
        // SAFETY: the buffer fits any element.
        let hr = unsafe {
            (self.vtbl().get_current)(self.handle().as_ptr(), buffer.as_mut_ptr().cast())
        };
        hr.ok()?;
        Ok(read_item(&buffer))
    }

    pub fn has_current(&self) -> Result<bool, HResult> {
        let mut out: AbiBool = 0;
        // SAFETY: live iterator and valid out slot.
        let hr = unsafe { (self.vtbl().get_has_current)(self.handle().as_ptr(), &mut out) };
        hr.ok()?;
        Ok(out != 0)
    }

    pub fn move_next(&self) -> Result<bool, HResult> {
        let mut out: AbiBool = 0;
        // SAFETY: live iterator and valid out slot.
        let hr = unsafe { (self.vtbl().move_next)(self.handle().as_ptr(), &mut out) };
        hr.ok()?;
        Ok(out != 0)
    }

    /// Bulk-reads up to `capacity` elements of type `T`.
    pub fn get_many<T: AbiItem>(&self, capacity: u32) -> Result<Vec<T>, HResult> {
        let width = mem::size_of::<T>();
        let mut buffer: Vec<MaybeUninit<T>> = vec![MaybeUninit::zeroed(); capacity as usize];
        let mut actual = 0_u32;
        // SAFETY: the buffer holds `capacity` elements of the caller's type.
        let hr = unsafe {
            (self.vtbl().get_many)(
                self.handle().as_ptr(),
                capacity,
                buffer.as_mut_ptr().cast(),
                &mut actual,
            )
        };
        hr.ok()?;
        let bytes = buffer.as_ptr().cast::<u8>();
        Ok((0..actual as usize)
            .map(|i| {
                // SAFETY: `i < actual <= capacity`, and every element is
                // zero-initialized or written by `GetMany`.
                let element = unsafe { std::slice::from_raw_parts(bytes.add(i * width), width) };
                read_item(element)
            })
            .collect())
    }

    /// Steps through the remaining elements with `MoveNext` / `GetCurrent`.
    pub fn drain<T: AbiItem>(&self) -> Result<Vec<T>, HResult> {
        let mut items = Vec::new();
        while self.move_next()? {
            items.push(self.current()?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::IterableRef;
    use crate::abi::HResult;
    use crate::collections::new_array_iterable;
    use crate::object::RegistryScope;
    use crate::registry_scope;

    #[test]
    fn views_drive_the_tables_and_release_on_drop() {
        registry_scope!(Scope);
        // SAFETY: fresh handle carrying one reference.
        let iterable =
            unsafe { IterableRef::from_owned(new_array_iterable::<Scope, u16>([7, 8, 9], "u2")) };
        let iterator = iterable.first().expect("first should succeed");

        assert_eq!(iterator.get_many::<u16>(2), Ok(vec![7, 8]));
        assert_eq!(iterator.current::<u16>(), Ok(9));
        assert_eq!(iterator.drain::<u16>(), Ok(vec![]));
        assert_eq!(iterator.current::<u16>(), Err(HResult::E_BOUNDS));
        assert_eq!(Scope::registry().len(), 2);

        drop(iterator);
        drop(iterable);
        assert!(Scope::registry().is_empty());
    }

    #[test]
    fn pointer_items_round_trip_at_word_width() {
        registry_scope!(Scope);
        let words = [0x1000_usize, 0x2000, usize::MAX];
        // SAFETY: fresh handle carrying one reference.
        let iterable =
            unsafe { IterableRef::from_owned(new_array_iterable::<Scope, usize>(words, "string")) };
        let iterator = iterable.first().expect("first should succeed");
        assert_eq!(iterator.drain::<usize>(), Ok(words.to_vec()));
    }
}
