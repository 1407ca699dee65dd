use std::sync::{Arc, Mutex};
use winrt_interop_core::delegate::{
    AsyncCompleted, DelegateVtbl, TypedEvent, IID_ASYNC_ACTION_COMPLETED_HANDLER,
};
use winrt_interop_core::object::RegistryScope;
use winrt_interop_core::{
    new_async_action_completed_handler, new_typed_event_handler, registry_scope, AsyncStatus,
    DelegateRef, Guid, HResult, Handle, ObjectRef,
};

fn table(handle: Handle) -> DelegateVtbl {
    unsafe { **(handle.as_ptr() as *const *const DelegateVtbl) }
}

#[test]
fn async_action_handler_receives_info_and_status() {
    registry_scope!(Scope);
    let seen = Arc::new(Mutex::new(Vec::<AsyncCompleted>::new()));
    let sink = Arc::clone(&seen);
    let handle = new_async_action_completed_handler::<Scope>(move |args| {
        sink.lock().expect("sink lock").push(args);
    });

    let invoke = table(handle).invoke;
    let hr = unsafe { invoke(handle.as_ptr(), 0xabc0, 2, 0, 0, 0, 0, 0, 0, 0) };
    assert_eq!(hr, HResult::S_OK);
    let hr = unsafe { invoke(handle.as_ptr(), 0xabc0, 17, 0, 0, 0, 0, 0, 0, 0) };
    assert_eq!(hr, HResult::S_OK);

    let seen = seen.lock().expect("sink lock");
    assert_eq!(
        *seen,
        vec![
            AsyncCompleted {
                async_info: Handle::from_addr(0xabc0),
                status: AsyncStatus::Canceled,
            },
            AsyncCompleted {
                async_info: Handle::from_addr(0xabc0),
                status: AsyncStatus::Other(17),
            },
        ]
    );
}

#[test]
fn handler_answers_to_its_delegate_id_only() {
    registry_scope!(Scope);
    let handle = new_async_action_completed_handler::<Scope>(|_| {});
    let object = unsafe { ObjectRef::from_owned(handle) };
    let same = object
        .query_interface(&IID_ASYNC_ACTION_COMPLETED_HANDLER)
        .expect("handler answers its own id");
    assert_eq!(same.handle(), handle);
    assert_eq!(
        object.query_interface(&Guid::from_u128(5)).err(),
        Some(HResult::E_NOINTERFACE)
    );
}

#[test]
fn typed_event_handler_identity_matches_published_vector() {
    registry_scope!(Scope);
    let events = Arc::new(Mutex::new(Vec::<TypedEvent>::new()));
    let sink = Arc::clone(&events);
    let handle = new_typed_event_handler::<Scope>(
        "rc(Windows.Devices.Bluetooth.Advertisement.BluetoothLEAdvertisementWatcher;{a6ac336f-f3d3-4297-8d6c-c81ea6623f40})",
        "rc(Windows.Devices.Bluetooth.Advertisement.BluetoothLEAdvertisementReceivedEventArgs;{27987ddf-e596-41be-8d43-9e6731d4a913})",
        move |event| sink.lock().expect("sink lock").push(event),
    );
    let delegate = unsafe { DelegateRef::from_owned(handle) };

    let published = Guid::parse("{90EB4ECA-D465-5EA0-A61C-033C8C5ECEF2}").expect("valid guid");
    let viewed = delegate
        .object()
        .query_interface(&published)
        .expect("handler answers the derived id");
    drop(viewed);

    delegate
        .invoke([0x1000, 0x2000, 0, 0, 0, 0, 0, 0, 0])
        .expect("invoke should succeed");
    assert_eq!(
        *events.lock().expect("sink lock"),
        vec![TypedEvent {
            sender: Handle::from_addr(0x1000),
            args: Handle::from_addr(0x2000),
        }]
    );
}

#[test]
fn callback_may_release_its_own_delegate() {
    registry_scope!(Scope);
    let slot = Arc::new(Mutex::new(None::<DelegateRef>));
    let inner = Arc::clone(&slot);
    let handle = new_async_action_completed_handler::<Scope>(move |_| {
        inner.lock().expect("slot lock").take();
    });
    let invoke = table(handle).invoke;
    *slot.lock().expect("slot lock") = Some(unsafe { DelegateRef::from_owned(handle) });

    let hr = unsafe { invoke(handle.as_ptr(), 0, 1, 0, 0, 0, 0, 0, 0, 0) };
    assert_eq!(hr, HResult::S_OK);
    assert!(Scope::registry().is_empty());

    let hr = unsafe { invoke(handle.as_ptr(), 0, 1, 0, 0, 0, 0, 0, 0, 0) };
    assert_eq!(hr, HResult::E_FAIL);
}
