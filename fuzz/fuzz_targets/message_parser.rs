//! Fuzz target for IRC line parsing
//!
//! Feeds arbitrary input to the parser and the passive session tracker and
//! ensures neither panics.

#![no_main]

use std::str;
use std::time::Instant;

use libfuzzer_sys::fuzz_target;
use slirc_client::{ParsedLine, Session};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        let line = ParsedLine::parse(input);
        assert_eq!(line.raw, input);

        let mut session = Session::new("fuzzer", "irc.example.com");
        let _ = session.feed(&line, Instant::now(), chrono::Utc::now());
        session.settle(&line);
    }
});
