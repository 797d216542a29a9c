/// Splits a benchmark build log into per-iteration segments.
///
/// Every iteration starts with the TestCI banner line. Whatever precedes the
/// first banner (checkout, build setup) belongs to no iteration.
use regex::Regex;
use std::sync::LazyLock;

/// Banner text printed before each benchmark job.
pub const DELIMITER_BANNER: &str = "********** START OF NEW TESTCI BENCHMARK JOB **********";

// The banner plus the single line-break character that ends it.
static DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{}[\r\n]", regex::escape(DELIMITER_BANNER))).unwrap()
});

/// One benchmark iteration's raw output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSegment<'a> {
    /// 1-based position in the log.
    pub index: usize,
    pub text: &'a str,
}

/// True iff the log contains at least one iteration banner.
pub fn contains_delimiter(log: &str) -> bool {
    DELIMITER.is_match(log)
}

/// Split `log` at every banner, dropping the text before the first one.
///
/// Returns an empty vec when no banner occurs.
pub fn split(log: &str) -> Vec<LogSegment<'_>> {
    let bounds: Vec<(usize, usize)> = DELIMITER
        .find_iter(log)
        .map(|m| (m.start(), m.end()))
        .collect();

    bounds
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start))| {
            let body_end = bounds.get(i + 1).map_or(log.len(), |&(next, _)| next);
            LogSegment {
                index: i + 1,
                text: &log[body_start..body_end],
            }
        })
        .collect()
}
