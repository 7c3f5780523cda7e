//! Fuzz target for cell typing and lenient timestamp parsing.
//!
//! This fuzzer tests that cell inference:
//! 1. Never panics on any input value
//! 2. Agrees with itself: a cell typed as temporal re-parses as a timestamp

#![no_main]

use assay::{Timestamp, Value};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10_000 {
        return;
    }

    if let Ok(content) = std::str::from_utf8(data) {
        let parsed = Timestamp::parse(content);
        let value = Value::infer(content);

        if let Value::Temporal(ts) = &value {
            assert_eq!(Some(ts), parsed.as_ref());
        }
        let _ = value.render();
    }
});
