//! C exports for native hosts and code generated against the runtime.
//!
//! # Responsibility
//! - Expose object constructors, id derivation and runtime setup to C.
//! - Translate C strings and arrays into core calls.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Null required pointers return `E_POINTER`; malformed input returns
//!   `E_INVALIDARG`; runtime failures return `E_FAIL`.
//! - Every handle written to an out slot carries one reference.

use log::{error, warn};
use once_cell::sync::Lazy;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use winrt_interop_core::{
    core_version, init_logging, live_objects, new_array_iterable, new_raw_delegate,
    parameterized_instance_guid, GlobalScope, Guid, HResult, RawArgs, RuntimeConfig,
};

static CORE_VERSION: Lazy<CString> =
    Lazy::new(|| CString::new(core_version()).unwrap_or_default());

/// Native callback behind a delegate: `(context, args, arg_count)`.
pub type DelegateCallback = unsafe extern "C" fn(*mut c_void, *const usize, usize);

type FfiResult<T> = Result<T, HResult>;

fn guarded(op: &'static str, call: impl FnOnce() -> FfiResult<()>) -> HResult {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => HResult::S_OK,
        Ok(Err(hr)) => {
            warn!("event=ffi_call module=ffi status=error op={op} hresult={hr}");
            hr
        }
        Err(_) => {
            error!("event=ffi_call module=ffi status=error op={op} error_code=panicked");
            HResult::E_UNEXPECTED
        }
    }
}

/// Borrows a NUL-terminated UTF-8 string.
///
/// # Safety
/// `value` must be null or point at a NUL-terminated string that outlives
/// the returned borrow.
unsafe fn c_str<'a>(value: *const c_char) -> FfiResult<&'a str> {
    if value.is_null() {
        return Err(HResult::E_POINTER);
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    unsafe { CStr::from_ptr(value) }
        .to_str()
        .map_err(|_| HResult::E_INVALIDARG)
}

/// Borrows `len` elements, allowing null only for an empty array.
///
/// # Safety
/// `items` must be null or valid for `len` reads.
unsafe fn c_slice<'a, T>(items: *const T, len: usize) -> FfiResult<&'a [T]> {
    match (items.is_null(), len) {
        (_, 0) => Ok(&[]),
        (true, _) => Err(HResult::E_POINTER),
        // SAFETY: non-null and valid for `len` reads per the caller's contract.
        (false, _) => Ok(unsafe { std::slice::from_raw_parts(items, len) }),
    }
}

fn write_out<T>(out: *mut T, value: T) -> FfiResult<()> {
    if out.is_null() {
        return Err(HResult::E_POINTER);
    }
    // SAFETY: caller-supplied, non-null slot.
    unsafe { out.write(value) };
    Ok(())
}

/// Core crate version as a static NUL-terminated string.
///
/// # FFI contract
/// - Never fails; the pointer stays valid for the life of the process.
#[no_mangle]
pub extern "C" fn winrt_interop_core_version() -> *const c_char {
    CORE_VERSION.as_ptr()
}

/// Starts file logging once per process.
///
/// # FFI contract
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling log files.
/// - Idempotent for identical arguments; other reconfiguration fails with
///   `E_FAIL`.
///
/// # Safety
/// Both arguments must be null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn winrt_interop_init_logging(
    level: *const c_char,
    log_dir: *const c_char,
) -> HResult {
    guarded("init_logging", || {
        // SAFETY: forwarded from the caller.
        let (level, log_dir) = unsafe { (c_str(level)?, c_str(log_dir)?) };
        init_logging(level, log_dir).map_err(|_| HResult::E_FAIL)
    })
}

/// Applies `WINRT_INTEROP_LOG_LEVEL` / `WINRT_INTEROP_LOG_DIR`.
///
/// # FFI contract
/// - `S_OK` also when no log directory is configured.
#[no_mangle]
pub extern "C" fn winrt_interop_init_from_env() -> HResult {
    guarded("init_from_env", || {
        RuntimeConfig::from_env()
            .apply()
            .map(|_| ())
            .map_err(|_| HResult::E_FAIL)
    })
}

macro_rules! export_new_iterable {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            /// Builds an `IIterable<T>` over a copy of `items[..len]`.
            ///
            /// # FFI contract
            /// - `item_signature` names the element type (e.g. `i4`).
            /// - `items` may be null only when `len` is zero.
            /// - `*out` receives a handle carrying one reference.
            ///
            /// # Safety
            /// `items` must be valid for `len` reads, `item_signature` must be
            /// a NUL-terminated string and `out` a writable slot.
            #[no_mangle]
            pub unsafe extern "C" fn $name(
                items: *const $ty,
                len: usize,
                item_signature: *const c_char,
                out: *mut *mut c_void,
            ) -> HResult {
                guarded(stringify!($name), || {
                    if out.is_null() {
                        return Err(HResult::E_POINTER);
                    }
                    // SAFETY: forwarded from the caller.
                    let (items, item_signature) =
                        unsafe { (c_slice(items, len)?, c_str(item_signature)?) };
                    let handle = new_array_iterable::<GlobalScope, $ty>(
                        items.iter().copied(),
                        item_signature,
                    );
                    write_out(out, handle.as_ptr())
                })
            }
        )*
    };
}

export_new_iterable! {
    winrt_interop_new_iterable_i8 => i8,
    winrt_interop_new_iterable_u8 => u8,
    winrt_interop_new_iterable_i16 => i16,
    winrt_interop_new_iterable_u16 => u16,
    winrt_interop_new_iterable_i32 => i32,
    winrt_interop_new_iterable_u32 => u32,
    winrt_interop_new_iterable_i64 => i64,
    winrt_interop_new_iterable_u64 => u64,
    winrt_interop_new_iterable_ptr => usize,
}

struct NativeCallback {
    callback: DelegateCallback,
    context: usize,
}

impl NativeCallback {
    fn call(&self, raw: &RawArgs) {
        // SAFETY: the creator promised `callback` accepts `context` and a
        // pointer to `raw.len()` words for as long as the delegate lives.
        unsafe { (self.callback)(self.context as *mut c_void, raw.as_ptr(), raw.len()) }
    }
}

/// Builds a delegate answering to `*iid` that forwards `Invoke` to
/// `callback(context, args, 9)`.
///
/// # FFI contract
/// - `callback` runs synchronously on the invoking thread.
/// - `context` is passed through untouched; the caller owns it and must keep
///   it valid until the delegate is released.
/// - `*out` receives a handle carrying one reference.
///
/// # Safety
/// `iid` must point at a GUID, `callback` must be safe to call from any
/// thread with `context`, and `out` must be a writable slot.
#[no_mangle]
pub unsafe extern "C" fn winrt_interop_new_delegate(
    iid: *const Guid,
    callback: Option<DelegateCallback>,
    context: *mut c_void,
    out: *mut *mut c_void,
) -> HResult {
    guarded("new_delegate", || {
        if iid.is_null() || out.is_null() {
            return Err(HResult::E_POINTER);
        }
        let callback = callback.ok_or(HResult::E_POINTER)?;
        // SAFETY: non-null per the check above.
        let iid = unsafe { iid.read_unaligned() };
        let native = NativeCallback {
            callback,
            context: context as usize,
        };
        let handle = new_raw_delegate::<GlobalScope>(iid, move |raw| native.call(raw));
        write_out(out, handle.as_ptr())
    })
}

/// Derives the id of generic `*base` instantiated with `signatures[..count]`.
///
/// # FFI contract
/// - `count` must be at least one (`E_INVALIDARG` otherwise).
/// - Each signature is a NUL-terminated UTF-8 string.
///
/// # Safety
/// `base` and `out_guid` must be valid GUID pointers and `signatures` valid
/// for `count` reads of string pointers.
#[no_mangle]
pub unsafe extern "C" fn winrt_interop_parameterized_guid(
    base: *const Guid,
    signatures: *const *const c_char,
    count: usize,
    out_guid: *mut Guid,
) -> HResult {
    guarded("parameterized_guid", || {
        if base.is_null() || out_guid.is_null() {
            return Err(HResult::E_POINTER);
        }
        if count == 0 {
            return Err(HResult::E_INVALIDARG);
        }
        // SAFETY: forwarded from the caller.
        let pointers = unsafe { c_slice(signatures, count)? };
        let args = pointers
            .iter()
            // SAFETY: each entry is a NUL-terminated string per the contract.
            .map(|&signature| unsafe { c_str(signature) })
            .collect::<FfiResult<Vec<_>>>()?;
        // SAFETY: non-null per the check above.
        let base = unsafe { base.read_unaligned() };
        let guid = parameterized_instance_guid(base, &args);
        // SAFETY: non-null per the check above; GUIDs may be unaligned in C.
        unsafe { out_guid.write_unaligned(guid) };
        Ok(())
    })
}

/// Number of live objects created through this library.
///
/// # FFI contract
/// - Never fails; intended for leak checks in host test suites.
#[no_mangle]
pub extern "C" fn winrt_interop_live_objects() -> usize {
    live_objects()
}
