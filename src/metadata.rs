/// Build-level metadata pulled from Jenkins console output.
///
/// Every extractor is a single first-match search over the whole log and
/// returns `None` when its marker is absent.
use crate::pattern::capture_first;
use crate::report::{BuildMetadata, TestSummary};
use chrono::{NaiveDate, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

static JAVA_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"((?:openjdk|java) version[\s\S]*JCL.*\n|(?:openjdk|java) version[\s\S]*Server VM.*\n)",
    )
    .unwrap()
});
static NODE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Node Version[\s\S]*Rundate.*)").unwrap());
static BUILD_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(20[0-9][0-9][0-9][0-9][0-9][0-9])").unwrap());
static ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Deploying artifact: ?([^\r\n]*?)[\r\n]").unwrap());
static STARTED_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Started by ?([^\r\n]*?)[\r\n]").unwrap());
static TEST_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\S*\s*?TOTAL:\s*([0-9]*)\s*EXECUTED:\s*([0-9]*)\s*PASSED:\s*([0-9]*)\s*FAILED:\s*([0-9]*)\s*DISABLED:\s*([0-9]*)\s*SKIPPED:\s*([0-9]*)\s*",
    )
    .unwrap()
});
static YYYYMMDD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})(\d{2})(\d{2})").unwrap());

/// Full `java -version` banner, if printed.
pub fn java_version(output: &str) -> Option<String> {
    capture_first(&JAVA_VERSION, output).map(str::to_string)
}

/// Node version block (through the `Rundate` line), if printed.
pub fn node_version(output: &str) -> Option<String> {
    capture_first(&NODE_VERSION, output).map(str::to_string)
}

/// `YYYYMMDD` build date embedded in a version string as `-20YYMMDD`.
pub fn build_date(version: &str) -> Option<String> {
    capture_first(&BUILD_DATE, version).map(str::to_string)
}

/// Artifact path from a `Deploying artifact:` line, trimmed.
pub fn artifact(output: &str) -> Option<String> {
    capture_first(&ARTIFACT, output).map(|s| s.trim().to_string())
}

/// Node the job ran on, from `Running on <machine> in <workspace>/<build name>`.
pub fn machine(output: &str, build_name: &str) -> Option<String> {
    let re = Regex::new(&format!(r"Running on (.*?) in .*{}", regex::escape(build_name))).ok()?;
    capture_first(&re, output).map(str::to_string)
}

/// User or upstream cause from a `Started by` line.
pub fn started_by(output: &str) -> Option<String> {
    capture_first(&STARTED_BY, output).map(str::to_string)
}

/// `TOTAL: .. EXECUTED: .. PASSED: ..` counters, if a summary line exists.
///
/// Empty counters read as zero.
pub fn test_summary(output: &str) -> Option<TestSummary> {
    let caps = TEST_SUMMARY.captures(output)?;
    let n = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    Some(TestSummary {
        total: n(1),
        executed: n(2),
        passed: n(3),
        failed: n(4),
        disabled: n(5),
        skipped: n(6),
    })
}

/// UTC noon of a `YYYYMMDD` date, in milliseconds since the epoch.
pub fn build_date_to_unix_millis(date: &str) -> Option<i64> {
    let caps = YYYYMMDD.captures(date)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    let noon = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(12, 0, 0)?;
    Some(Utc.from_utc_datetime(&noon).timestamp_millis())
}

/// Run every metadata extractor over `output`.
pub fn collect(output: &str, build_name: &str) -> BuildMetadata {
    let java_version = java_version(output);
    let jdk_date = java_version.as_deref().and_then(build_date);
    let node_version = node_version(output);
    let node_run_date = node_version.as_deref().and_then(build_date);

    BuildMetadata {
        machine: machine(output, build_name),
        started_by: started_by(output),
        artifactory: artifact(output),
        java_version,
        jdk_date,
        node_version,
        node_run_date,
    }
}
