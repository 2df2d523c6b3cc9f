#![no_main]

use basalt_types::{AttributeValue, DataType};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, &str)| {
    let (selector, literal) = input;
    let data_type = DataType::ALL[usize::from(selector) % DataType::ALL.len()];

    let Ok(value) = AttributeValue::parse(data_type, literal) else {
        return;
    };
    assert_eq!(value.data_type(), data_type);

    // Canonical text must parse back to an equal value.
    let encoded = value.encode();
    let reparsed = AttributeValue::parse(data_type, &encoded)
        .unwrap_or_else(|e| panic!("canonical form {encoded:?} rejected: {e}"));
    if encoded != "NaN" {
        assert_eq!(reparsed, value, "round trip of {literal:?}");
    }
    assert_eq!(reparsed.encode(), encoded, "canonical form is stable");
});
