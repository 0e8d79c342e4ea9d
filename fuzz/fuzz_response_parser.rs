//! Fuzz target for HTTP/1.1 response framing.
//!
//! Run with: cargo +nightly fuzz run fuzz_response_parser
//!
//! Feeds arbitrary bytes to `read_response` as if they came from the engine
//! socket: status line, headers, chunked and content-length bodies.

#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use tokio::runtime::Runtime;

fn runtime() -> &'static Runtime {
    static RT: OnceLock<Runtime> = OnceLock::new();
    RT.get_or_init(|| {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("failed to build runtime")
    })
}

fuzz_target!(|data: &[u8]| {
    let mut input = data;
    let _ = runtime().block_on(dockhand_core::http::read_response(&mut input));
});
