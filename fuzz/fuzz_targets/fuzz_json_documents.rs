#![no_main]

use basalt::{PolicyNode, Request};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = serde_json::from_slice::<Request>(data) {
        let json = serde_json::to_vec(&request).expect("parsed requests serialize");
        let again: Request = serde_json::from_slice(&json).expect("serialized requests parse");
        assert_eq!(again.attributes().len(), request.attributes().len());
    }
    let _ = serde_json::from_slice::<PolicyNode>(data);
});
