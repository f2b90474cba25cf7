//! Fuzz target for the placeholder template engine.
//!
//! Run with: cargo +nightly fuzz run fuzz_template_render
//!
//! Renders arbitrary templates against a fixed clean and dirty revision.
//! Directive expansions never contain `{`, so the output may only hold as
//! many braces as the input.

#![no_main]

use chrono::DateTime;
use libfuzzer_sys::fuzz_target;
use revstamp_core::{CommitHash, RevisionInfo, render};

fuzz_target!(|data: &[u8]| {
    let Ok(template) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(hash) = "45d4e32f0a1b2c3d4e5f60718293a4b5c6d7e8f9".parse::<CommitHash>() else {
        return;
    };
    let Ok(timestamp) = DateTime::parse_from_rfc3339("2011-12-31T14:30:45+01:00") else {
        return;
    };

    let braces = template.matches('{').count();
    for dirty in [false, true] {
        let info = RevisionInfo::new(hash.clone(), timestamp, dirty);
        let out = render(template, &info);
        assert!(out.matches('{').count() <= braces);
    }
});
