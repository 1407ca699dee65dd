//! Signature strings and parameterized interface ids.
//!
//! # Responsibility
//! - Turn type shapes into the canonical signature grammar.
//! - Derive the stable id of a generic instantiation from its signature.
//!
//! # Invariants
//! - Derivation is pure: equal inputs always give equal ids.
//! - Validation failures are generation-time errors, never ABI statuses.
//!
//! # See also
//! - `collections` and `delegate` for the runtime consumers.

pub mod guid;
pub mod shape;

pub use guid::{
    parameterized_instance_guid, parameterized_instance_guid_string, pinterface_signature,
    PINTERFACE_NAMESPACE,
};
pub use shape::{Fundamental, TypeShape};

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Malformed input to signature generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    InvalidTypeName(String),
    InvalidGuid(String),
    EmptyStruct(String),
    StructField { name: String, kind: &'static str },
    EnumUnderlying { name: String, underlying: Fundamental },
    DefaultInterface { name: String, kind: &'static str },
    MissingTypeArguments,
    NoIdentity(&'static str),
}

impl Display for SignatureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTypeName(name) => write!(f, "invalid type name `{name}`"),
            Self::InvalidGuid(text) => write!(f, "invalid guid `{text}`"),
            Self::EmptyStruct(name) => write!(f, "struct `{name}` has no fields"),
            Self::StructField { name, kind } => {
                write!(f, "struct `{name}` has a field of kind `{kind}`")
            }
            Self::EnumUnderlying { name, underlying } => write!(
                f,
                "enum `{name}` has underlying type `{}`; expected i4 or u4",
                underlying.signature()
            ),
            Self::DefaultInterface { name, kind } => {
                write!(f, "default interface of `{name}` is a `{kind}`")
            }
            Self::MissingTypeArguments => f.write_str("parameterized type has no type arguments"),
            Self::NoIdentity(kind) => write!(f, "a `{kind}` shape has no interface id"),
        }
    }
}

impl Error for SignatureError {}
