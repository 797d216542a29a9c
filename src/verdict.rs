/// Build-level rollup of iteration statuses.
use crate::report::TestStatus;
use serde::Serialize;

/// Overall result of a parsed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum Verdict {
    Success,
    PartialSuccess,
    Failure,
}

impl Verdict {
    /// SUCCESS needs at least one pass and no failures; a mix is
    /// PARTIAL-SUCCESS; everything else (including no iterations) is FAILURE.
    pub fn from_counts(passed: u64, failed: u64) -> Self {
        match (passed > 0, failed > 0) {
            (true, false) => Verdict::Success,
            (true, true) => Verdict::PartialSuccess,
            (false, _) => Verdict::Failure,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Success => "SUCCESS",
            Verdict::PartialSuccess => "PARTIAL-SUCCESS",
            Verdict::Failure => "FAILURE",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combine per-iteration statuses into a verdict.
pub fn aggregate<I>(statuses: I) -> Verdict
where
    I: IntoIterator<Item = TestStatus>,
{
    let (passed, failed) = statuses
        .into_iter()
        .fold((0u64, 0u64), |(p, f), status| match status {
            TestStatus::Passed => (p + 1, f),
            TestStatus::Failed => (p, f + 1),
        });
    Verdict::from_counts(passed, failed)
}
