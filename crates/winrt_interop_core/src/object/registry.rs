//! Process-wide map from native handle to logical object.
//!
//! # Responsibility
//! - Resolve the opaque address a native caller passes back into the object
//!   that owns it.
//! - Drive the reference-count lifecycle and drop the entry on the zero
//!   transition.
//!
//! # Invariants
//! - At most one entry exists per handle.
//! - An entry is removed exactly once, by the release that reaches zero.
//! - Every mutation is serialized by one lock; counts use per-object atomics.
//!
//! # See also
//! - `object::factory` for how entries are created.

use super::LogicalObject;
use crate::abi::{Guid, Handle};
use crate::error::{InteropError, InteropResult};
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Capabilities shared by every registered object: the three header slots.
pub trait Unknown: Send + Sync {
    fn iid(&self) -> Guid;
    fn add_ref(&self) -> u32;
    fn release(&self) -> u32;
}

/// Synchronized handle -> object map.
pub struct InstanceRegistry<T: ?Sized = LogicalObject> {
    entries: RwLock<HashMap<Handle, Arc<T>>>,
}

impl<T: ?Sized> Default for InstanceRegistry<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: ?Sized + Unknown> InstanceRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `object` under `handle`, returning any entry it replaced.
    pub fn register(&self, handle: Handle, object: Arc<T>) -> Option<Arc<T>> {
        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, object);
        if previous.is_some() {
            warn!("event=registry_register module=registry status=overwrite handle={handle}");
        } else {
            debug!("event=registry_register module=registry status=ok handle={handle}");
        }
        previous
    }

    pub fn lookup(&self, handle: Handle) -> InteropResult<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
            .ok_or(InteropError::NotFound(handle))
    }

    /// Removes the entry for `handle`; only the first caller gets it back.
    pub fn unregister(&self, handle: Handle) -> Option<Arc<T>> {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        if removed.is_some() {
            debug!("event=registry_unregister module=registry status=ok handle={handle}");
        }
        removed
    }

    pub fn add_ref(&self, handle: Handle) -> InteropResult<u32> {
        Ok(self.lookup(handle)?.add_ref())
    }

    /// Releases one reference; the zero transition unregisters the object.
    ///
    /// The backing allocation is freed once the last in-flight clone of the
    /// entry is dropped, which is never before it leaves the map.
    pub fn release(&self, handle: Handle) -> InteropResult<u32> {
        let object = self.lookup(handle)?;
        let remaining = object.release();
        if remaining == 0 {
            self.unregister(handle);
        }
        Ok(remaining)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compile-time choice of the registry trampolines resolve handles in.
pub trait RegistryScope: Send + Sync + 'static {
    fn registry() -> &'static InstanceRegistry;
}

static GLOBAL_REGISTRY: Lazy<InstanceRegistry> = Lazy::new(InstanceRegistry::new);

/// The process-wide registry used by exported constructors.
pub struct GlobalScope;

impl RegistryScope for GlobalScope {
    fn registry() -> &'static InstanceRegistry {
        &GLOBAL_REGISTRY
    }
}

/// Declares a unit type implementing `RegistryScope` over its own registry.
///
/// Objects created in different scopes never see each other, which keeps
/// tests independent of the process-wide registry.
#[macro_export]
macro_rules! registry_scope {
    ($(#[$meta:meta])* $vis:vis $name:ident) => {
        $(#[$meta])*
        $vis struct $name;

        impl $crate::object::RegistryScope for $name {
            fn registry() -> &'static $crate::object::InstanceRegistry {
                static REGISTRY: $crate::__private::Lazy<$crate::object::InstanceRegistry> =
                    $crate::__private::Lazy::new($crate::object::InstanceRegistry::new);
                &REGISTRY
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::{InstanceRegistry, Unknown};
    use crate::abi::{Guid, Handle};
    use crate::error::InteropError;
    use crate::object::RefCount;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    struct FakeObject {
        refs: RefCount,
        drops: Arc<AtomicUsize>,
    }

    impl FakeObject {
        fn new(drops: &Arc<AtomicUsize>) -> Arc<Self> {
            let object = Arc::new(Self {
                refs: RefCount::new(),
                drops: Arc::clone(drops),
            });
            object.refs.add_ref();
            object
        }
    }

    impl Drop for FakeObject {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Unknown for FakeObject {
        fn iid(&self) -> Guid {
            Guid::from_u128(0x1234)
        }

        fn add_ref(&self) -> u32 {
            self.refs.add_ref()
        }

        fn release(&self) -> u32 {
            self.refs.release()
        }
    }

    #[test]
    fn lookup_unknown_handle_is_not_found() {
        let registry = InstanceRegistry::<FakeObject>::new();
        let handle = Handle::from_addr(0xdead0);
        let err = registry.lookup(handle).err().expect("empty registry");
        assert_eq!(err, InteropError::NotFound(handle));
    }

    #[test]
    fn register_overwrites_and_returns_previous() {
        let drops = Arc::new(AtomicUsize::new(0));
        let registry = InstanceRegistry::new();
        let handle = Handle::from_addr(0x1000);

        assert!(registry.register(handle, FakeObject::new(&drops)).is_none());
        let previous = registry.register(handle, FakeObject::new(&drops));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn release_to_zero_unregisters_and_drops_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let registry = InstanceRegistry::new();
        let handle = Handle::from_addr(0x2000);
        registry.register(handle, FakeObject::new(&drops));

        assert_eq!(registry.add_ref(handle).expect("registered"), 2);
        assert_eq!(registry.release(handle).expect("registered"), 1);
        assert!(registry.contains(handle));
        assert_eq!(registry.release(handle).expect("registered"), 0);

        assert!(!registry.contains(handle));
        assert!(registry.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(matches!(
            registry.release(handle),
            Err(InteropError::NotFound(_))
        ));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_objects_do_not_interfere() {
        let drops = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(InstanceRegistry::new());

        let workers = (1..=16usize)
            .map(|n| {
                let registry = Arc::clone(&registry);
                let drops = Arc::clone(&drops);
                thread::spawn(move || {
                    let handle = Handle::from_addr(n * 0x100);
                    registry.register(handle, FakeObject::new(&drops));
                    for _ in 0..100 {
                        registry.add_ref(handle).expect("registered");
                    }
                    for _ in 0..101 {
                        registry.release(handle).expect("registered");
                    }
                    assert!(!registry.contains(handle));
                })
            })
            .collect::<Vec<_>>();
        for worker in workers {
            worker.join().expect("worker should not panic");
        }

        assert!(registry.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 16);
    }
}
