//! Fuzz target for the upload parser and scoring.
//!
//! This fuzzer tests that ingestion and scoring:
//! 1. Never panic on malformed uploads
//! 2. Handle every delimiter and extension combination
//! 3. Always produce a report for a table that parsed

#![no_main]

use arbitrary::Arbitrary;
use assay::{Assay, Parser, Table};
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Extension {
    Csv,
    Tsv,
    Txt,
    Bare,
    Xlsx,
}

#[derive(Arbitrary, Debug)]
struct Upload<'a> {
    extension: Extension,
    score: bool,
    contents: &'a [u8],
}

fuzz_target!(|upload: Upload<'_>| {
    // Only process reasonable-sized inputs to avoid OOM
    if upload.contents.len() > 100_000 {
        return;
    }

    let name = match upload.extension {
        Extension::Csv => "upload.csv",
        Extension::Tsv => "upload.tsv",
        Extension::Txt => "upload.txt",
        Extension::Bare => "upload",
        Extension::Xlsx => "upload.xlsx",
    };

    let Ok((data, _meta)) = Parser::new().parse_bytes_named(name, upload.contents) else {
        return;
    };
    let Ok(table) = Table::from_data_table(&data) else {
        return;
    };

    if upload.score {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let report = Assay::default().with_now(now).report(&table);
        assert!(report.is_object());
    }
});
