//! Fuzz target for catalog listing payloads.

#![no_main]

use kaggleease::catalog::payload::fuzz_parse_listing;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    fuzz_parse_listing(data);
});
