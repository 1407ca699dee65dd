//! Logical objects behind native handles.
//!
//! # Responsibility
//! - Pair each fixed-address native block with the host state it fronts.
//! - Define the closed set of object kinds the runtime dispatches on.
//!
//! # Invariants
//! - A `LogicalObject` owns its native block; dropping the object frees it.
//! - Construction hands out exactly one reference (count starts at 1).
//!
//! # See also
//! - `object::registry` for lookup and lifetime.
//! - `object::factory` for dispatch table construction.

pub mod client;
pub mod factory;
pub mod refcount;
pub mod registry;

pub use client::ObjectRef;
pub use factory::{
    class_state, create_object, DispatchTable, IInspectableVtbl, IUnknownVtbl,
};
pub use refcount::RefCount;
pub use registry::{GlobalScope, InstanceRegistry, RegistryScope, Unknown};

use crate::abi::{Guid, Handle, IID_IINSPECTABLE, IID_IUNKNOWN};
use crate::collections::{ArrayIterable, ArrayIterator};
use crate::delegate::DelegateState;
use factory::NativeBlock;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Host-side state, one variant per object kind.
pub enum ObjectKind {
    ArrayIterable(ArrayIterable),
    ArrayIterator(ArrayIterator),
    Delegate(DelegateState),
    /// State of a generated class wrapper, recovered with `class_state`.
    Class(Arc<dyn Any + Send + Sync>),
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ArrayIterable(_) => "array_iterable",
            Self::ArrayIterator(_) => "array_iterator",
            Self::Delegate(_) => "delegate",
            Self::Class(_) => "class",
        }
    }
}

impl Debug for ObjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One live object: identity, count, kind state and its native block.
pub struct LogicalObject {
    iid: Guid,
    refs: RefCount,
    kind: ObjectKind,
    block: NativeBlock,
}

impl LogicalObject {
    fn new(iid: Guid, kind: ObjectKind, block: NativeBlock) -> Self {
        let object = Self {
            iid,
            refs: RefCount::new(),
            kind,
            block,
        };
        object.refs.add_ref();
        object
    }

    pub fn handle(&self) -> Handle {
        self.block.handle()
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn ref_count(&self) -> u32 {
        self.refs.count()
    }

    /// Whether QueryInterface for `iid` succeeds on this object.
    pub fn answers_to(&self, iid: &Guid) -> bool {
        *iid == self.iid || *iid == IID_IUNKNOWN || *iid == IID_IINSPECTABLE
    }
}

impl Unknown for LogicalObject {
    fn iid(&self) -> Guid {
        self.iid
    }

    fn add_ref(&self) -> u32 {
        self.refs.add_ref()
    }

    fn release(&self) -> u32 {
        self.refs.release()
    }
}

impl Debug for LogicalObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalObject")
            .field("handle", &self.handle())
            .field("iid", &self.iid)
            .field("refs", &self.refs.count())
            .field("kind", &self.kind)
            .finish()
    }
}
