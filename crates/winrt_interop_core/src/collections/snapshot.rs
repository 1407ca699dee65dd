//! Immutable item storage shared by an iterable and its iterators.

use std::ffi::c_void;
use std::mem;

/// One sequence element in its ABI representation.
///
/// Scalars keep their own width; everything else travels as a
/// pointer-sized raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Pointer(usize),
}

macro_rules! item_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Item {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

item_from! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    usize => Pointer,
}

impl From<*const c_void> for Item {
    fn from(value: *const c_void) -> Self {
        Self::Pointer(value as usize)
    }
}

impl From<*mut c_void> for Item {
    fn from(value: *mut c_void) -> Self {
        Self::Pointer(value as usize)
    }
}

impl Item {
    /// Bytes this item occupies in an output buffer.
    pub fn width(&self) -> usize {
        match self {
            Self::I8(_) | Self::U8(_) => 1,
            Self::I16(_) | Self::U16(_) => 2,
            Self::I32(_) | Self::U32(_) => 4,
            Self::I64(_) | Self::U64(_) => 8,
            Self::Pointer(_) => mem::size_of::<usize>(),
        }
    }

    /// Copies the item to `out` and returns the bytes written.
    ///
    /// # Safety
    /// `out` must be valid for `self.width()` bytes of writes.
    pub unsafe fn write_to(&self, out: *mut u8) -> usize {
        // SAFETY: the caller guarantees `width()` writable bytes; unaligned
        // writes tolerate any buffer alignment.
        unsafe {
            match *self {
                Self::I8(v) => out.cast::<i8>().write_unaligned(v),
                Self::U8(v) => out.write_unaligned(v),
                Self::I16(v) => out.cast::<i16>().write_unaligned(v),
                Self::U16(v) => out.cast::<u16>().write_unaligned(v),
                Self::I32(v) => out.cast::<i32>().write_unaligned(v),
                Self::U32(v) => out.cast::<u32>().write_unaligned(v),
                Self::I64(v) => out.cast::<i64>().write_unaligned(v),
                Self::U64(v) => out.cast::<u64>().write_unaligned(v),
                Self::Pointer(v) => out.cast::<usize>().write_unaligned(v),
            }
        }
        self.width()
    }
}

/// Items captured once when an iterable is built; never mutated.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    items: Box<[Item]>,
}

impl Snapshot {
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Item> {
        self.items.get(index).copied()
    }

    /// Up to `count` items starting at `start`, clamped to the end.
    pub fn window(&self, start: usize, count: usize) -> &[Item] {
        let start = start.min(self.items.len());
        let end = start.saturating_add(count).min(self.items.len());
        &self.items[start..end]
    }
}
