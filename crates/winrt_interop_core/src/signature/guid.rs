//! Stable ids for parameterized interface instances.
//!
//! The id is a version-5 (SHA-1) name-based UUID over the UTF-8 bytes of the
//! `pinterface(...)` signature in a fixed namespace. It depends on nothing
//! but its inputs.

use super::SignatureError;
use crate::abi::Guid;
use log::trace;
use uuid::Uuid;

/// Namespace every parameterized instance id is derived in.
pub const PINTERFACE_NAMESPACE: Uuid = Uuid::from_u128(0x11f47ad5_7b73_42c0_abae_878b1e16adee);

/// `pinterface({base};arg1;arg2...)` with the base id in lowercase.
pub fn pinterface_signature(base: Guid, args: &[&str]) -> String {
    let mut signature = format!("pinterface({{{base}}}");
    for arg in args {
        signature.push(';');
        signature.push_str(arg);
    }
    signature.push(')');
    signature
}

/// Id of a generic interface or delegate instantiated with `args`.
pub fn parameterized_instance_guid(base: Guid, args: &[&str]) -> Guid {
    let signature = pinterface_signature(base, args);
    let guid = Guid::from(Uuid::new_v5(&PINTERFACE_NAMESPACE, signature.as_bytes()));
    trace!("event=guid_derive module=signature status=ok signature={signature} guid={guid}");
    guid
}

/// Text form of `parameterized_instance_guid`: `base` is GUID text in any
/// common form, the result is uppercase, braced and hyphenated.
pub fn parameterized_instance_guid_string(
    base: &str,
    args: &[&str],
) -> Result<String, SignatureError> {
    if args.is_empty() {
        return Err(SignatureError::MissingTypeArguments);
    }
    let base = Guid::parse(base).map_err(|_| SignatureError::InvalidGuid(base.to_string()))?;
    Ok(parameterized_instance_guid(base, args).to_braced_upper())
}
