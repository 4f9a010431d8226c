#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Kaggle-style slug: lowercase words joined by dashes.
pub fn arb_slug() -> BoxedStrategy<String> {
    "[a-z][a-z0-9]{0,7}(-[a-z0-9]{1,6}){0,3}".boxed()
}

/// Cell text including characters that need CSV quoting.
pub fn arb_cell() -> BoxedStrategy<String> {
    prop_oneof![
        4 => "[A-Za-z0-9 _.-]{0,12}",
        1 => "[A-Za-z ,\"]{1,8}",
        1 => Just(String::new()),
    ]
    .boxed()
}

/// A header of distinct names plus rows of exactly that width.
pub fn arb_table(max_cols: usize, max_rows: usize) -> BoxedStrategy<(Vec<String>, Vec<Vec<String>>)> {
    (1..=max_cols)
        .prop_flat_map(move |cols| {
            let header = (0..cols).map(|i| format!("col_{i}")).collect::<Vec<_>>();
            let rows = prop::collection::vec(prop::collection::vec(arb_cell(), cols), 0..=max_rows);
            (Just(header), rows)
        })
        .boxed()
}

/// Writes a table as CSV with every field quoted.
pub fn to_quoted_csv(header: &[String], rows: &[Vec<String>]) -> String {
    let quote = |cell: &String| format!("\"{}\"", cell.replace('"', "\"\""));
    let mut out = String::new();
    for line in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        out.push_str(&line.iter().map(quote).collect::<Vec<_>>().join(","));
        out.push('\n');
    }
    out
}
