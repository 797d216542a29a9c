/// Metric extraction for a classified iteration.
use crate::pattern::{capture_all, parse_float};
use crate::registry::MetricSchema;
use crate::report::MetricResult;

/// Text the metric patterns run against.
///
/// With an outer boundary that matches, this is its first capture group
/// (the warm-run portion); otherwise the whole segment.
pub fn search_region<'t>(segment: &'t str, schema: &MetricSchema) -> &'t str {
    let Some(outer) = &schema.outer else {
        return segment;
    };
    match outer.captures(segment).and_then(|caps| caps.get(1)) {
        Some(m) => m.as_str(),
        None => {
            tracing::debug!(schema = %schema.id, "outer boundary not found, searching full segment");
            segment
        }
    }
}

/// Extract every metric the schema declares, in declaration order.
///
/// Each metric yields all captured values, or a single aggregate when the
/// rule names one and at least one value was captured. Unparseable
/// captures become `NaN` and are kept.
pub fn extract(segment: &str, schema: &MetricSchema) -> Vec<MetricResult> {
    let region = search_region(segment, schema);

    schema
        .metrics
        .iter()
        .map(|rule| {
            let mut values: Vec<f64> = capture_all(&rule.pattern, region)
                .into_iter()
                .map(parse_float)
                .collect();
            if let Some(agg) = rule.aggregate {
                if !values.is_empty() {
                    values = vec![agg.apply(&values)];
                }
            }
            MetricResult {
                name: rule.name.clone(),
                value: values,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Aggregation;
    use regex::Regex;

    fn re(p: &str) -> Regex {
        Regex::new(p).unwrap()
    }

    #[test]
    fn sum_collapses_repeated_samples() {
        let schema = MetricSchema::new("S").with_metric("M", re(r"jit=(\d+)"), Some(Aggregation::Sum));
        let out = extract("jit=10\nx\njit=20\njit=30\n", &schema);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "M");
        assert_eq!(out[0].value, vec![60.0]);
    }

    #[test]
    fn no_aggregation_keeps_all_values_in_order() {
        let schema = MetricSchema::new("S").with_metric("N", re(r"n=(\d+)"), None);
        let out = extract("n=5\nn=7\n", &schema);
        assert_eq!(out[0].value, vec![5.0, 7.0]);
    }

    #[test]
    fn aggregation_skipped_when_nothing_captured() {
        let schema = MetricSchema::new("S").with_metric("M", re(r"jit=(\d+)"), Some(Aggregation::Sum));
        let out = extract("nothing\n", &schema);
        assert_eq!(out.len(), 1);
        assert!(out[0].value.is_empty());
    }

    #[test]
    fn every_declared_metric_is_reported_in_order() {
        let schema = MetricSchema::new("S")
            .with_metric("second", re(r"b=(\d+)"), None)
            .with_metric("first", re(r"a=(\d+)"), None)
            .with_metric("absent", re(r"z=(\d+)"), None);
        let out = extract("a=1 b=2\n", &schema);
        let names: Vec<_> = out.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["second", "first", "absent"]);
        assert_eq!(out[0].value, vec![2.0]);
        assert_eq!(out[1].value, vec![1.0]);
        assert!(out[2].value.is_empty());
    }

    #[test]
    fn outer_boundary_excludes_cold_runs() {
        let schema = MetricSchema::new("S")
            .with_outer(re(r"(?s)Warm run 0(.*)"))
            .with_metric("Startup", re(r"Startup time: (\d+)"), None);
        let seg = "Cold run 0\nStartup time: 999\nWarm run 0\nStartup time: 10\nStartup time: 12\n";
        let out = extract(seg, &schema);
        assert_eq!(out[0].value, vec![10.0, 12.0]);
    }

    #[test]
    fn outer_boundary_fails_open() {
        let schema = MetricSchema::new("S")
            .with_outer(re(r"(?s)Warm run 0(.*)"))
            .with_metric("Startup", re(r"Startup time: (\d+)"), None);
        let seg = "Startup time: 999\nStartup time: 5\n";
        assert_eq!(search_region(seg, &schema), seg);
        let out = extract(seg, &schema);
        assert_eq!(out[0].value, vec![999.0, 5.0]);
    }

    #[test]
    fn outer_without_group_searches_full_segment() {
        let schema = MetricSchema::new("S").with_outer(re(r"Warm"));
        let seg = "a\nWarm\nb\n";
        assert_eq!(search_region(seg, &schema), seg);
    }

    #[test]
    fn unparseable_capture_becomes_nan() {
        let schema = MetricSchema::new("S").with_metric("T", re(r"t=(\S*)"), None);
        let out = extract("t=12 t=oops t=3.5\n", &schema);
        assert_eq!(out[0].value.len(), 3);
        assert_eq!(out[0].value[0], 12.0);
        assert!(out[0].value[1].is_nan());
        assert_eq!(out[0].value[2], 3.5);
    }

    #[test]
    fn nan_survives_aggregation() {
        let schema = MetricSchema::new("S").with_metric("T", re(r"t=(\S*)"), Some(Aggregation::Sum));
        let out = extract("t=1 t=x\n", &schema);
        assert_eq!(out[0].value.len(), 1);
        assert!(out[0].value[0].is_nan());
    }

    #[test]
    fn geomean_aggregation() {
        let schema = MetricSchema::new("S").with_metric("G", re(r"g=(\d+)"), Some(Aggregation::Geomean));
        let out = extract("g=1 g=4 g=16\n", &schema);
        assert!((out[0].value[0] - 4.0).abs() < 1e-9);
    }
}
