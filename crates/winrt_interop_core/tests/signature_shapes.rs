use winrt_interop_core::{
    parameterized_instance_guid, parameterized_instance_guid_string, Fundamental, Guid,
    SignatureError, TypeShape,
};

const TYPED_EVENT_HANDLER: &str = "9de1c534-6ae1-11e0-84e1-18a905bcc53f";

fn shape(json: &str) -> TypeShape {
    serde_json::from_str(json).expect("shape json should parse")
}

#[test]
fn json_shapes_produce_published_typed_event_id() {
    let handler = shape(
        r#"{
            "kind": "parameterized",
            "guid": "9de1c534-6ae1-11e0-84e1-18a905bcc53f",
            "args": [
                {
                    "kind": "runtime_class",
                    "name": "Windows.Devices.Bluetooth.Advertisement.BluetoothLEAdvertisementWatcher",
                    "default_interface": { "kind": "interface", "guid": "a6ac336f-f3d3-4297-8d6c-c81ea6623f40" }
                },
                {
                    "kind": "runtime_class",
                    "name": "Windows.Devices.Bluetooth.Advertisement.BluetoothLEAdvertisementReceivedEventArgs",
                    "default_interface": { "kind": "interface", "guid": "27987ddf-e596-41be-8d43-9e6731d4a913" }
                }
            ]
        }"#,
    );

    let id = handler.identity().expect("valid shape");
    assert_eq!(id.to_braced_upper(), "{90EB4ECA-D465-5EA0-A61C-033C8C5ECEF2}");
    assert!(handler
        .signature()
        .expect("valid shape")
        .starts_with("pinterface({9de1c534-6ae1-11e0-84e1-18a905bcc53f};rc("));
}

#[test]
fn nested_parameterized_arguments_use_their_instance_signature() {
    // IAsyncOperation<IIterable<i4>>
    let nested = shape(
        r#"{
            "kind": "parameterized",
            "guid": "9fc2b0bb-e446-44e2-aa61-9cab8f636af2",
            "args": [
                { "kind": "parameterized", "guid": "faa585ea-6214-4217-afda-7f46de5869b3",
                  "args": [ { "kind": "fundamental", "fundamental": "i4" } ] }
            ]
        }"#,
    );
    let inner = "pinterface({faa585ea-6214-4217-afda-7f46de5869b3};i4)";
    assert_eq!(
        nested.signature().expect("valid shape"),
        format!("pinterface({{9fc2b0bb-e446-44e2-aa61-9cab8f636af2}};{inner})")
    );
    assert_eq!(
        nested.identity().expect("valid shape"),
        parameterized_instance_guid(
            Guid::parse("9fc2b0bb-e446-44e2-aa61-9cab8f636af2").expect("valid guid"),
            &[inner]
        )
    );
}

#[test]
fn shapes_serialize_with_kind_tags() {
    let original = TypeShape::Enum {
        name: "Windows.Foundation.AsyncStatus".to_string(),
        underlying: Fundamental::I32,
    };
    let value = serde_json::to_value(&original).expect("shape should serialize");
    assert_eq!(value["kind"], "enum");
    assert_eq!(value["underlying"], "i4");
    assert_eq!(
        original.signature().expect("valid shape"),
        "enum(Windows.Foundation.AsyncStatus;i4)"
    );
}

#[test]
fn unknown_kind_is_rejected_by_the_parser() {
    let result = serde_json::from_str::<TypeShape>(r#"{"kind":"array","element":"i4"}"#);
    assert!(result.is_err());
}

#[test]
fn guid_strings_accept_any_common_form() {
    let forms = [
        TYPED_EVENT_HANDLER.to_string(),
        TYPED_EVENT_HANDLER.to_uppercase(),
        format!("{{{TYPED_EVENT_HANDLER}}}"),
    ];
    let args = ["cinterface(IInspectable)", "cinterface(IInspectable)"];
    let expected =
        parameterized_instance_guid_string(TYPED_EVENT_HANDLER, &args).expect("valid inputs");
    for form in &forms {
        assert_eq!(
            parameterized_instance_guid_string(form, &args).expect("valid inputs"),
            expected
        );
    }
    assert_eq!(expected, "{C7E65CE2-FAD5-5E3B-9C58-186CA8C1DD57}");
    assert!(matches!(
        parameterized_instance_guid_string("{9de1c534}", &args),
        Err(SignatureError::InvalidGuid(_))
    ));
}
