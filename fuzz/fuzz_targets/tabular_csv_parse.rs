//! Fuzz target for CSV/TSV parsing.
//!
//! Feeds arbitrary bytes to the delimited-text reader with both delimiters,
//! checking for panics, crashes, or hangs.

#![no_main]

use kaggleease::table::io_delimited::from_delimited_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(frame) = from_delimited_slice(data, b',') {
        assert!(frame.rows().iter().all(|row| row.len() == frame.column_count()));
    }
    let _ = from_delimited_slice(data, b'\t');
});
