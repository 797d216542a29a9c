use super::{LogParser, ParseError};
use crate::metadata;
use crate::report::{BuildReport, ReportKind};
use crate::verdict::Verdict;

/// Parser for functional-test logs that end with a
/// `TOTAL: .. EXECUTED: .. PASSED: .. FAILED: ..` summary line.
///
/// These logs have no per-iteration output worth keeping; the report
/// carries the counters and a verdict derived from them.
pub struct TestSummaryParser;

impl TestSummaryParser {
    pub fn new() -> Self {
        TestSummaryParser
    }
}

impl Default for TestSummaryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogParser for TestSummaryParser {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn can_parse(&self, _build_name: &str, output: &str) -> bool {
        metadata::test_summary(output).is_some()
    }

    fn parse(&self, build_name: &str, output: &str) -> Result<BuildReport, ParseError> {
        let summary = metadata::test_summary(output).ok_or(ParseError::NotApplicable {
            parser: self.name(),
        })?;
        let build_result = Verdict::from_counts(summary.passed, summary.failed);

        tracing::info!(
            build_name,
            total = summary.total,
            failed = summary.failed,
            result = %build_result,
            "parsed test summary log"
        );

        Ok(BuildReport {
            build_name: build_name.to_string(),
            kind: ReportKind::Test,
            tests: Vec::new(),
            build_result,
            metadata: metadata::collect(output, build_name),
            summary: Some(summary),
        })
    }
}
