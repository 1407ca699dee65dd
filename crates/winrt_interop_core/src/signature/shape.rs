//! Type shapes handed over by the metadata reader and their signatures.
//!
//! # Invariants
//! - `signature()` validates the whole shape before producing any text.
//! - Interface ids inside signatures are lowercase and braced.

use super::guid::{parameterized_instance_guid, pinterface_signature};
use super::SignatureError;
use crate::abi::Guid;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static TYPE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*(`[0-9]+)?$")
        .expect("valid regex")
});

/// Built-in element types with fixed signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fundamental {
    #[serde(rename = "i1")]
    I8,
    #[serde(rename = "u1")]
    U8,
    #[serde(rename = "i2")]
    I16,
    #[serde(rename = "u2")]
    U16,
    #[serde(rename = "i4")]
    I32,
    #[serde(rename = "u4")]
    U32,
    #[serde(rename = "i8")]
    I64,
    #[serde(rename = "u8")]
    U64,
    #[serde(rename = "f4")]
    F32,
    #[serde(rename = "f8")]
    F64,
    #[serde(rename = "b1")]
    Bool,
    #[serde(rename = "c2")]
    Char16,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "g16")]
    Guid,
    #[serde(rename = "object")]
    Object,
}

impl Fundamental {
    pub fn signature(self) -> &'static str {
        match self {
            Self::I8 => "i1",
            Self::U8 => "u1",
            Self::I16 => "i2",
            Self::U16 => "u2",
            Self::I32 => "i4",
            Self::U32 => "u4",
            Self::I64 => "i8",
            Self::U64 => "u8",
            Self::F32 => "f4",
            Self::F64 => "f8",
            Self::Bool => "b1",
            Self::Char16 => "c2",
            Self::String => "string",
            Self::Guid => "g16",
            Self::Object => "cinterface(IInspectable)",
        }
    }
}

/// Description of one type, enough to compute its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeShape {
    Fundamental {
        fundamental: Fundamental,
    },
    Interface {
        guid: Uuid,
    },
    Delegate {
        guid: Uuid,
    },
    Enum {
        name: String,
        underlying: Fundamental,
    },
    Struct {
        name: String,
        fields: Vec<TypeShape>,
    },
    RuntimeClass {
        name: String,
        default_interface: Box<TypeShape>,
    },
    InterfaceGroup {
        name: String,
        default_interface: Box<TypeShape>,
    },
    /// Generic interface or delegate `guid` instantiated with `args`.
    Parameterized {
        guid: Uuid,
        args: Vec<TypeShape>,
    },
}

impl TypeShape {
    pub fn fundamental(fundamental: Fundamental) -> Self {
        Self::Fundamental { fundamental }
    }

    pub fn interface(guid: Guid) -> Self {
        Self::Interface {
            guid: guid.to_uuid(),
        }
    }

    pub fn runtime_class(name: impl Into<String>, default_interface: TypeShape) -> Self {
        Self::RuntimeClass {
            name: name.into(),
            default_interface: Box::new(default_interface),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Fundamental { .. } => "fundamental",
            Self::Interface { .. } => "interface",
            Self::Delegate { .. } => "delegate",
            Self::Enum { .. } => "enum",
            Self::Struct { .. } => "struct",
            Self::RuntimeClass { .. } => "runtime_class",
            Self::InterfaceGroup { .. } => "interface_group",
            Self::Parameterized { .. } => "parameterized",
        }
    }

    /// Canonical signature string of this shape.
    pub fn signature(&self) -> Result<String, SignatureError> {
        match self {
            Self::Fundamental { fundamental } => Ok(fundamental.signature().to_string()),
            Self::Interface { guid } => Ok(format!("{{{}}}", guid.hyphenated())),
            Self::Delegate { guid } => Ok(format!("delegate({{{}}})", guid.hyphenated())),
            Self::Enum { name, underlying } => {
                check_name(name)?;
                if !matches!(underlying, Fundamental::I32 | Fundamental::U32) {
                    return Err(SignatureError::EnumUnderlying {
                        name: name.clone(),
                        underlying: *underlying,
                    });
                }
                Ok(format!("enum({name};{})", underlying.signature()))
            }
            Self::Struct { name, fields } => {
                check_name(name)?;
                if fields.is_empty() {
                    return Err(SignatureError::EmptyStruct(name.clone()));
                }
                let mut signature = format!("struct({name}");
                for field in fields {
                    if !matches!(
                        field,
                        Self::Fundamental { .. } | Self::Enum { .. } | Self::Struct { .. }
                    ) {
                        return Err(SignatureError::StructField {
                            name: name.clone(),
                            kind: field.kind_name(),
                        });
                    }
                    signature.push(';');
                    signature.push_str(&field.signature()?);
                }
                signature.push(')');
                Ok(signature)
            }
            Self::RuntimeClass {
                name,
                default_interface,
            } => Ok(format!(
                "rc({};{})",
                checked(name)?,
                default_interface_signature(name, default_interface)?
            )),
            Self::InterfaceGroup {
                name,
                default_interface,
            } => Ok(format!(
                "ig({};{})",
                checked(name)?,
                default_interface_signature(name, default_interface)?
            )),
            Self::Parameterized { guid, args } => {
                let args = parameterized_args(args)?;
                let args = args.iter().map(String::as_str).collect::<Vec<_>>();
                Ok(pinterface_signature(Guid::from(*guid), &args))
            }
        }
    }

    /// Interface id a caller would pass to QueryInterface for this shape.
    ///
    /// Runtime classes and interface groups answer with their default
    /// interface; value types have no id.
    pub fn identity(&self) -> Result<Guid, SignatureError> {
        match self {
            Self::Interface { guid } | Self::Delegate { guid } => Ok(Guid::from(*guid)),
            Self::Parameterized { guid, args } => {
                let args = parameterized_args(args)?;
                let args = args.iter().map(String::as_str).collect::<Vec<_>>();
                Ok(parameterized_instance_guid(Guid::from(*guid), &args))
            }
            Self::RuntimeClass {
                name,
                default_interface,
            }
            | Self::InterfaceGroup {
                name,
                default_interface,
            } => {
                check_name(name)?;
                default_interface.identity()
            }
            other => Err(SignatureError::NoIdentity(other.kind_name())),
        }
    }
}

fn check_name(name: &str) -> Result<(), SignatureError> {
    if TYPE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(SignatureError::InvalidTypeName(name.to_string()))
    }
}

fn checked(name: &str) -> Result<&str, SignatureError> {
    check_name(name).map(|()| name)
}

fn default_interface_signature(owner: &str, shape: &TypeShape) -> Result<String, SignatureError> {
    match shape {
        TypeShape::Interface { .. } | TypeShape::Parameterized { .. } => shape.signature(),
        other => Err(SignatureError::DefaultInterface {
            name: owner.to_string(),
            kind: other.kind_name(),
        }),
    }
}

fn parameterized_args(args: &[TypeShape]) -> Result<Vec<String>, SignatureError> {
    if args.is_empty() {
        return Err(SignatureError::MissingTypeArguments);
    }
    args.iter().map(TypeShape::signature).collect()
}
