use super::{LogParser, ParseError};
use crate::classify::classify;
use crate::extract::extract;
use crate::metadata;
use crate::registry::SchemaRegistry;
use crate::report::{BuildReport, IterationRecord, ReportKind, TestData, TestStatus};
use crate::segment;
use crate::verdict;

/// Parser for TestCI performance logs.
///
/// Each iteration begins with the `START OF NEW TESTCI BENCHMARK JOB`
/// banner and carries a `Benchmark Name: .. Benchmark Variant: ..` header
/// that routes it to a metric schema. Iterations that cannot be routed are
/// reported as FAILED without metrics; they never abort the parse.
pub struct BenchmarkParser {
    registry: SchemaRegistry,
}

impl BenchmarkParser {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Classify and extract every iteration in `output`.
    pub fn iterations(&self, output: &str) -> Vec<IterationRecord> {
        segment::split(output)
            .into_iter()
            .map(|seg| {
                let c = classify(seg.text, &self.registry);
                let test_data = c.schema.map(|schema| TestData {
                    metrics: extract(seg.text, schema),
                });
                let status = if test_data.is_some() {
                    TestStatus::Passed
                } else {
                    TestStatus::Failed
                };
                tracing::debug!(
                    index = seg.index,
                    name = ?c.identity.name,
                    variant = ?c.identity.variant,
                    status = status.as_str(),
                    "classified iteration"
                );
                IterationRecord {
                    test_output: seg.text.to_string(),
                    test_result: status,
                    test_index: seg.index,
                    benchmark_name: c.identity.name,
                    benchmark_variant: c.identity.variant,
                    product_resource: c.product_resource,
                    test_data,
                }
            })
            .collect()
    }
}

impl LogParser for BenchmarkParser {
    fn name(&self) -> &'static str {
        "benchmark"
    }

    fn can_parse(&self, _build_name: &str, output: &str) -> bool {
        segment::contains_delimiter(output)
    }

    fn parse(&self, build_name: &str, output: &str) -> Result<BuildReport, ParseError> {
        if !self.can_parse(build_name, output) {
            return Err(ParseError::NotApplicable {
                parser: self.name(),
            });
        }

        let tests = self.iterations(output);
        let build_result = verdict::aggregate(tests.iter().map(|t| t.test_result));
        let report = BuildReport {
            build_name: build_name.to_string(),
            kind: ReportKind::Perf,
            tests,
            build_result,
            metadata: metadata::collect(output, build_name),
            summary: None,
        };

        tracing::info!(
            build_name,
            iterations = report.tests.len(),
            passed = report.passed(),
            result = %report.build_result,
            "parsed benchmark log"
        );
        Ok(report)
    }
}
