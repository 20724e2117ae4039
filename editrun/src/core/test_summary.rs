//! Parse pass/fail counts from a pytest-style summary line.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::TestCounts;

static SUMMARY_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=+ .* in [0-9.]+s.* =+$").unwrap());
static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) (passed|failed|errors?|skipped)\b").unwrap());

/// Counts from the last summary line in `output`, if there is one.
///
/// `==== 1 failed, 3 passed, 1 skipped in 0.12s ====` yields
/// `passed=3 failed=1 skipped=1`.
pub fn parse_test_counts(output: &str) -> Option<TestCounts> {
    let line = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| SUMMARY_LINE_RE.is_match(line))?;

    let mut counts = TestCounts::default();
    for caps in COUNT_RE.captures_iter(line) {
        let n: u32 = caps[1].parse().unwrap_or(0);
        match &caps[2] {
            "passed" => counts.passed += n,
            "failed" => counts.failed += n,
            "skipped" => counts.skipped += n,
            _ => counts.errors += n,
        }
    }
    Some(counts)
}
