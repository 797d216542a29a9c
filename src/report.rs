/// Output model of a parsed build log.
///
/// Reports carry no wall-clock data, so parsing the same text twice gives
/// identical values (and identical JSON).
use crate::verdict::Verdict;
use serde::Serialize;

/// Pass/fail status of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Passed,
    Failed,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
        }
    }
}

/// Which log dialect produced the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportKind {
    Perf,
    Test,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Perf => "Perf",
            ReportKind::Test => "Test",
        }
    }
}

/// Values captured for one metric. `NaN` entries serialize as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricResult {
    pub name: String,
    pub value: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestData {
    pub metrics: Vec<MetricResult>,
}

/// One benchmark iteration.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub test_output: String,
    pub test_result: TestStatus,
    /// 1-based.
    pub test_index: usize,
    pub benchmark_name: Option<String>,
    pub benchmark_variant: Option<String>,
    pub product_resource: Option<String>,
    /// `None` for failed iterations.
    pub test_data: Option<TestData>,
}

/// Counters from a functional-test summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    pub total: u64,
    pub executed: u64,
    pub passed: u64,
    pub failed: u64,
    pub disabled: u64,
    pub skipped: u64,
}

/// Build-level fields found anywhere in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildMetadata {
    pub machine: Option<String>,
    pub started_by: Option<String>,
    pub artifactory: Option<String>,
    pub java_version: Option<String>,
    pub jdk_date: Option<String>,
    pub node_version: Option<String>,
    pub node_run_date: Option<String>,
}

/// Terminal output of a parser.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub build_name: String,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub tests: Vec<IterationRecord>,
    pub build_result: Verdict,
    #[serde(flatten)]
    pub metadata: BuildMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TestSummary>,
}

impl BuildReport {
    pub fn passed(&self) -> usize {
        self.tests
            .iter()
            .filter(|t| t.test_result == TestStatus::Passed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.tests.len() - self.passed()
    }

    /// Multi-line human-readable summary for terminal output.
    pub fn render_summary(&self) -> String {
        let mut out = format!(
            "{} [{}] {} ({} passed, {} failed)\n",
            self.build_name,
            self.kind.as_str(),
            self.build_result,
            self.passed(),
            self.failed()
        );
        if let Some(machine) = &self.metadata.machine {
            out.push_str(&format!("  machine: {machine}\n"));
        }
        if let Some(user) = &self.metadata.started_by {
            out.push_str(&format!("  started by: {user}\n"));
        }
        if let Some(s) = &self.summary {
            out.push_str(&format!(
                "  total {} executed {} passed {} failed {} disabled {} skipped {}\n",
                s.total, s.executed, s.passed, s.failed, s.disabled, s.skipped
            ));
        }
        for test in &self.tests {
            out.push_str(&format!(
                "  #{} {} {}/{}\n",
                test.test_index,
                test.test_result.as_str(),
                test.benchmark_name.as_deref().unwrap_or("?"),
                test.benchmark_variant.as_deref().unwrap_or("?")
            ));
            if let Some(data) = &test.test_data {
                for metric in &data.metrics {
                    let values: Vec<String> = metric.value.iter().map(|v| v.to_string()).collect();
                    out.push_str(&format!("      {}: [{}]\n", metric.name, values.join(", ")));
                }
            }
        }
        out
    }
}
