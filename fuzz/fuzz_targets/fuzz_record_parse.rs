//! Fuzz target: `Record::parse`
//!
//! Any line classifies without panicking. Telemetry must have had exactly
//! eight fields and its observed state must decode to a principal state.
//!
//! cargo fuzz run fuzz_record_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use solarctl::link::record::TELEMETRY_FIELDS;
use solarctl::link::Record;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    match Record::parse(&line) {
        Record::Telemetry(frame) => {
            assert_eq!(line.split(':').count(), TELEMETRY_FIELDS);
            let observed = frame.observed_state();
            assert_eq!(observed.principal(), observed);
        }
        Record::Log(_) => assert!(line.starts_with("log:")),
        Record::Garbage(_) => {}
    }
});
