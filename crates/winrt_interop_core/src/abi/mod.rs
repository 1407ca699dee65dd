//! Binary vocabulary shared by every dispatch table.
//!
//! # Responsibility
//! - Define the status codes, GUID layout and handle type native callers see.
//! - Provide the well-known interface ids every object answers to.
//! - Guard ABI entry points so no panic unwinds into native frames.
//!
//! # Invariants
//! - `Guid` matches the platform `{u32, u16, u16, [u8; 8]}` layout.
//! - `HResult` is ABI-transparent over `i32`; zero is success.
//! - A `Handle` is compared by address only and never dereferenced here.

use crate::error::{InteropError, InteropResult};
use crate::logging::describe_panic;
use log::{error, trace, warn};
use std::ffi::c_void;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use uuid::Uuid;

/// Platform `boolean`: one byte, zero is false.
pub type AbiBool = u8;

/// `TrustLevel::BaseTrust` reported by every inspectable object.
pub const BASE_TRUST: i32 = 0;

/// Status code returned by every ABI entry point.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    pub const S_OK: Self = Self(0);
    pub const E_NOINTERFACE: Self = Self(0x8000_4002_u32 as i32);
    pub const E_POINTER: Self = Self(0x8000_4003_u32 as i32);
    pub const E_FAIL: Self = Self(0x8000_4005_u32 as i32);
    pub const E_BOUNDS: Self = Self(0x8000_000B_u32 as i32);
    pub const E_UNEXPECTED: Self = Self(0x8000_FFFF_u32 as i32);
    pub const E_INVALIDARG: Self = Self(0x8007_0057_u32 as i32);

    /// Mirrors the platform `SUCCEEDED` macro.
    pub fn is_ok(self) -> bool {
        self.0 >= 0
    }

    /// Converts into a `Result`, keeping the failing code as the error.
    pub fn ok(self) -> Result<(), HResult> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for HResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)
    }
}

/// 128-bit identity id in the platform's in-memory layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    /// Builds a GUID from its canonical big-endian numeric value.
    pub const fn from_u128(value: u128) -> Self {
        Self {
            data1: (value >> 96) as u32,
            data2: (value >> 80) as u16,
            data3: (value >> 64) as u16,
            data4: (value as u64).to_be_bytes(),
        }
    }

    /// Parses hyphenated, simple, braced or urn text.
    pub fn parse(text: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(text.trim()).map(Self::from)
    }

    pub fn to_uuid(self) -> Uuid {
        Uuid::from_fields(self.data1, self.data2, self.data3, &self.data4)
    }

    /// Uppercase braced form, e.g. `{90EB4ECA-D465-5EA0-A61C-033C8C5ECEF2}`.
    pub fn to_braced_upper(self) -> String {
        format!("{{{:X}}}", self.to_uuid().hyphenated())
    }
}

impl From<Uuid> for Guid {
    fn from(value: Uuid) -> Self {
        let (data1, data2, data3, data4) = value.as_fields();
        Self {
            data1,
            data2,
            data3,
            data4: *data4,
        }
    }
}

impl From<Guid> for Uuid {
    fn from(value: Guid) -> Self {
        value.to_uuid()
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uuid().hyphenated())
    }
}

/// `IUnknown`: answered by every object.
pub const IID_IUNKNOWN: Guid = Guid::from_u128(0x00000000_0000_0000_C000_000000000046);
/// `IInspectable`: answered by every object.
pub const IID_IINSPECTABLE: Guid = Guid::from_u128(0xAF86E2E0_B12D_4C6A_9C5A_D7AA65101E90);

/// Opaque address identifying an object to native callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
    pub fn from_ptr(ptr: *const c_void) -> Self {
        Self(ptr as usize)
    }

    pub fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    pub fn addr(self) -> usize {
        self.0
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Runs one status-returning ABI operation.
///
/// Errors become their status code; a panic becomes `E_UNEXPECTED`.
pub(crate) fn abi_call(
    op: &'static str,
    handle: Handle,
    call: impl FnOnce() -> InteropResult<()>,
) -> HResult {
    trace!("event=abi_call module=abi op={op} handle={handle}");
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => HResult::S_OK,
        Ok(Err(err)) => {
            log_failure(op, handle, &err);
            err.hresult()
        }
        Err(payload) => {
            error!(
                "event=abi_call module=abi status=error op={op} handle={handle} error_code=panicked payload={}",
                describe_panic(payload.as_ref())
            );
            HResult::E_UNEXPECTED
        }
    }
}

/// Runs one count-returning ABI operation (`AddRef`/`Release`).
///
/// Failures report a count of zero.
pub(crate) fn abi_count(
    op: &'static str,
    handle: Handle,
    call: impl FnOnce() -> InteropResult<u32>,
) -> u32 {
    trace!("event=abi_call module=abi op={op} handle={handle}");
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(count)) => count,
        Ok(Err(err)) => {
            log_failure(op, handle, &err);
            0
        }
        Err(payload) => {
            error!(
                "event=abi_call module=abi status=error op={op} handle={handle} error_code=panicked payload={}",
                describe_panic(payload.as_ref())
            );
            0
        }
    }
}

fn log_failure(op: &str, handle: Handle, err: &InteropError) {
    match err {
        InteropError::NotFound(_) => warn!(
            "event=abi_call module=abi status=error op={op} handle={handle} error_code=not_found"
        ),
        other => trace!(
            "event=abi_call module=abi status=error op={op} handle={handle} error={other}"
        ),
    }
}
