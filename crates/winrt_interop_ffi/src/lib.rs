//! C-callable surface of the interop runtime.
//!
//! Every export is `extern "C"`, returns a status code where it can fail and
//! never lets a panic unwind into the caller.

pub mod api;
