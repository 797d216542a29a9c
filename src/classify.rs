/// Iteration classification: read the benchmark header of a segment and
/// decide whether a usable metric schema exists for it.
use crate::pattern::capture_first;
use crate::registry::{MetricSchema, SchemaRegistry};
use regex::Regex;
use std::sync::LazyLock;

static BENCHMARK_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Benchmark Name: ([^\r\n]*) Benchmark Variant: [^\r\n]*[\r\n]").unwrap()
});
static BENCHMARK_VARIANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Benchmark Name: [^\r\n]* Benchmark Variant: ([^\r\n]*)[\r\n]").unwrap()
});
static PRODUCT_RESOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Product Resource: ([^\r\n]*)[\r\n]").unwrap());

/// The (name, variant) pair printed in an iteration header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkIdentity {
    pub name: Option<String>,
    pub variant: Option<String>,
}

/// Result of classifying one segment.
#[derive(Debug)]
pub struct Classification<'r> {
    pub identity: BenchmarkIdentity,
    pub product_resource: Option<String>,
    /// Set only when the identity resolved to a schema with metrics.
    pub schema: Option<&'r MetricSchema>,
}

impl Classification<'_> {
    pub fn is_valid(&self) -> bool {
        self.schema.is_some()
    }
}

/// Extract the header fields of `segment` and resolve its schema.
pub fn classify<'r>(segment: &str, registry: &'r SchemaRegistry) -> Classification<'r> {
    let identity = BenchmarkIdentity {
        name: capture_first(&BENCHMARK_NAME, segment).map(str::to_string),
        variant: capture_first(&BENCHMARK_VARIANT, segment).map(str::to_string),
    };
    let product_resource = capture_first(&PRODUCT_RESOURCE, segment).map(str::to_string);

    let schema = match (&identity.name, &identity.variant) {
        (Some(name), Some(variant)) => registry.lookup_usable(name, variant),
        _ => None,
    };

    Classification {
        identity,
        product_resource,
        schema,
    }
}
