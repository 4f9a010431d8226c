//! Fuzz target for handle and kaggle.com URL parsing.

#![no_main]

use kaggleease::catalog::handle::parse_handle;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(handle) = parse_handle(input) {
        assert!(!handle.slug().is_empty());
        assert!(!handle.as_str().contains(char::is_whitespace));
    }
});
