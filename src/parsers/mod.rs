pub mod benchmark;
pub mod summary;

use crate::registry::SchemaRegistry;
use crate::report::BuildReport;

pub use benchmark::BenchmarkParser;
pub use summary::TestSummaryParser;

/// Errors produced by parser operations.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// `parse` was called on a log the parser cannot handle.
    #[error("{parser} parser cannot handle this log")]
    NotApplicable { parser: &'static str },
    /// No registered parser accepted the log.
    #[error("no parser recognizes the log for build '{build_name}'")]
    NoParser { build_name: String },
}

/// One build-log dialect.
pub trait LogParser: Send + Sync {
    /// Human-readable parser name (e.g., "benchmark").
    fn name(&self) -> &'static str;

    /// Cheap applicability probe. Callers use it to pick a parser before
    /// invoking `parse`.
    fn can_parse(&self, build_name: &str, output: &str) -> bool;

    /// Turn the full log text into a report.
    fn parse(&self, build_name: &str, output: &str) -> Result<BuildReport, ParseError>;
}

/// Probes parsers in registration order and uses the first that applies.
pub struct Dispatcher {
    parsers: Vec<Box<dyn LogParser>>,
}

impl Dispatcher {
    /// Benchmark logs first, then functional-test summaries.
    pub fn new(registry: SchemaRegistry) -> Self {
        Self::with_parsers(vec![
            Box::new(BenchmarkParser::new(registry)),
            Box::new(TestSummaryParser::new()),
        ])
    }

    pub fn with_parsers(parsers: Vec<Box<dyn LogParser>>) -> Self {
        Self { parsers }
    }

    /// The first parser whose probe accepts the log.
    pub fn select(&self, build_name: &str, output: &str) -> Option<&dyn LogParser> {
        self.parsers
            .iter()
            .map(|p| p.as_ref())
            .find(|p| p.can_parse(build_name, output))
    }

    pub fn parse(&self, build_name: &str, output: &str) -> Result<BuildReport, ParseError> {
        let parser = self
            .select(build_name, output)
            .ok_or_else(|| ParseError::NoParser {
                build_name: build_name.to_string(),
            })?;
        tracing::debug!(parser = parser.name(), build_name, "selected parser");
        parser.parse(build_name, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportKind;
    use crate::segment::DELIMITER_BANNER;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(SchemaRegistry::builtin().unwrap())
    }

    #[test]
    fn selects_benchmark_parser_for_banner_logs() {
        let log = format!("{DELIMITER_BANNER}\nBenchmark Name: X Benchmark Variant: Y\n");
        assert_eq!(dispatcher().select("b", &log).unwrap().name(), "benchmark");
    }

    #[test]
    fn benchmark_parser_wins_over_summary() {
        let log = format!(
            "TOTAL: 1 EXECUTED: 1 PASSED: 1 FAILED: 0 DISABLED: 0 SKIPPED: 0\n{DELIMITER_BANNER}\n"
        );
        let report = dispatcher().parse("b", &log).unwrap();
        assert_eq!(report.kind, ReportKind::Perf);
    }

    #[test]
    fn selects_summary_parser() {
        let log = "TOTAL: 3 EXECUTED: 3 PASSED: 3 FAILED: 0 DISABLED: 0 SKIPPED: 0\n";
        assert_eq!(dispatcher().select("b", log).unwrap().name(), "summary");
    }

    #[test]
    fn no_parser_for_plain_log() {
        let d = dispatcher();
        assert!(d.select("b", "just some output\n").is_none());
        let err = d.parse("job-7", "just some output\n").unwrap_err();
        assert!(matches!(err, ParseError::NoParser { ref build_name } if build_name == "job-7"));
    }

    #[test]
    fn custom_parser_order() {
        let d = Dispatcher::with_parsers(vec![Box::new(TestSummaryParser::new())]);
        let log = format!("{DELIMITER_BANNER}\n");
        assert!(d.select("b", &log).is_none());
    }
}
