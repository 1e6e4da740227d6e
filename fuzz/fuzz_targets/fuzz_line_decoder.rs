//! Fuzz target: `LineDecoder::feed`
//!
//! Arbitrary bytes, fed whole and then one byte at a time, must yield the
//! same records, none empty and none longer than the reassembly buffer.
//!
//! cargo fuzz run fuzz_line_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use solarctl::link::LineDecoder;
use solarctl::link::codec::MAX_LINE;

fuzz_target!(|data: &[u8]| {
    let mut whole = LineDecoder::new();
    let lines = whole.feed(data);
    for line in &lines {
        assert!(!line.is_empty(), "decoder must not yield empty records");
        // Lossy UTF-8 may widen invalid bytes to U+FFFD.
        assert!(line.chars().count() <= MAX_LINE);
    }
    assert!(whole.pending() <= MAX_LINE);

    let mut bytewise = LineDecoder::new();
    let mut again = Vec::new();
    for b in data {
        again.extend(bytewise.feed(std::slice::from_ref(b)));
    }
    assert_eq!(lines, again);
    assert_eq!(whole.discarded(), bytewise.discarded());
});
