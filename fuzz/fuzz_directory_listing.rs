//! Fuzz target for the `ls -la` output parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_directory_listing

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        for item in dockhand_core::engine::parse_directory_items(s, "/fuzz") {
            assert!(item.path.starts_with("/fuzz/"));
        }
    }
});
