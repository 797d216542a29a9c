/// Metric schema registry: routes a (benchmark name, variant) pair to the
/// ordered metric rules used to pull numbers out of an iteration.
///
/// The registry is read-only once built. It is loaded from TOML (the
/// built-in table lives in `schemas/default.toml`) or assembled in code
/// with the `with_*` builders.
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const BUILTIN_SCHEMAS: &str = include_str!("../schemas/default.toml");

/// Reduction applied to every value captured for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
    Geomean,
    Min,
    Max,
}

impl Aggregation {
    /// Fold `values` into one number. Callers only invoke this with a
    /// non-empty slice.
    pub fn apply(self, values: &[f64]) -> f64 {
        let n = values.len() as f64;
        match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Mean => values.iter().sum::<f64>() / n,
            Aggregation::Geomean => (values.iter().map(|v| v.ln()).sum::<f64>() / n).exp(),
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Geomean => "geomean",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }
}

/// One named metric and how to extract it.
#[derive(Debug, Clone)]
pub struct MetricRule {
    pub name: String,
    pub pattern: Regex,
    pub aggregate: Option<Aggregation>,
}

/// Ordered metric rules plus an optional warm-run boundary.
#[derive(Debug, Clone)]
pub struct MetricSchema {
    pub id: String,
    /// When this matches, only its first capture group is searched.
    pub outer: Option<Regex>,
    pub metrics: Vec<MetricRule>,
}

impl MetricSchema {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outer: None,
            metrics: Vec::new(),
        }
    }

    pub fn with_outer(mut self, outer: Regex) -> Self {
        self.outer = Some(outer);
        self
    }

    pub fn with_metric(
        mut self,
        name: impl Into<String>,
        pattern: Regex,
        aggregate: Option<Aggregation>,
    ) -> Self {
        self.metrics.push(MetricRule {
            name: name.into(),
            pattern,
            aggregate,
        });
        self
    }

    /// A schema with no metrics cannot produce a passing iteration.
    pub fn is_usable(&self) -> bool {
        !self.metrics.is_empty()
    }
}

/// Errors produced while loading a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid schema file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("schema '{schema}' metric '{metric}' has an invalid pattern: {source}")]
    Pattern {
        schema: String,
        metric: String,
        source: regex::Error,
    },
    #[error("schema '{schema}' has an invalid outer pattern: {source}")]
    OuterPattern {
        schema: String,
        source: regex::Error,
    },
    #[error("route {benchmark}/{variant} points to undefined schema '{schema}'")]
    UnknownSchema {
        benchmark: String,
        variant: String,
        schema: String,
    },
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    route: Vec<RouteEntry>,
    #[serde(default)]
    schema: BTreeMap<String, SchemaEntry>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    benchmark: String,
    variant: String,
    schema: String,
}

#[derive(Debug, Deserialize)]
struct SchemaEntry {
    outer: Option<String>,
    #[serde(default)]
    metric: Vec<MetricEntry>,
}

#[derive(Debug, Deserialize)]
struct MetricEntry {
    name: String,
    pattern: String,
    aggregate: Option<Aggregation>,
}

/// Lookup table from benchmark identity to metric schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    // benchmark name -> variant -> schema id
    routes: BTreeMap<String, BTreeMap<String, String>>,
    schemas: BTreeMap<String, MetricSchema>,
}

impl SchemaRegistry {
    /// An empty registry; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// The schema table shipped with the binary.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml_str(BUILTIN_SCHEMAS)
    }

    /// Load a registry from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let registry = Self::from_toml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            schemas = registry.schemas.len(),
            "loaded schema registry"
        );
        Ok(registry)
    }

    /// Parse and compile a registry from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = toml::from_str(contents)?;
        let mut registry = SchemaRegistry::new();

        for (id, entry) in file.schema {
            let mut schema = MetricSchema::new(id.clone());
            if let Some(outer) = entry.outer {
                let re = Regex::new(&outer).map_err(|e| RegistryError::OuterPattern {
                    schema: id.clone(),
                    source: e,
                })?;
                schema = schema.with_outer(re);
            }
            for metric in entry.metric {
                let re = Regex::new(&metric.pattern).map_err(|e| RegistryError::Pattern {
                    schema: id.clone(),
                    metric: metric.name.clone(),
                    source: e,
                })?;
                schema = schema.with_metric(metric.name, re, metric.aggregate);
            }
            registry = registry.with_schema(schema);
        }

        for route in file.route {
            if !registry.schemas.contains_key(&route.schema) {
                return Err(RegistryError::UnknownSchema {
                    benchmark: route.benchmark,
                    variant: route.variant,
                    schema: route.schema,
                });
            }
            registry = registry.with_route(route.benchmark, route.variant, route.schema);
        }

        Ok(registry)
    }

    pub fn with_schema(mut self, schema: MetricSchema) -> Self {
        self.schemas.insert(schema.id.clone(), schema);
        self
    }

    pub fn with_route(
        mut self,
        benchmark: impl Into<String>,
        variant: impl Into<String>,
        schema_id: impl Into<String>,
    ) -> Self {
        self.routes
            .entry(benchmark.into())
            .or_default()
            .insert(variant.into(), schema_id.into());
        self
    }

    /// Resolve a benchmark identity to its schema, if routed and defined.
    pub fn lookup(&self, name: &str, variant: &str) -> Option<&MetricSchema> {
        let id = self.routes.get(name)?.get(variant)?;
        self.schemas.get(id)
    }

    /// Like `lookup`, but treats a schema without metrics as absent.
    pub fn lookup_usable(&self, name: &str, variant: &str) -> Option<&MetricSchema> {
        self.lookup(name, variant).filter(|s| s.is_usable())
    }

    pub fn schema(&self, id: &str) -> Option<&MetricSchema> {
        self.schemas.get(id)
    }

    /// All routes as (benchmark, variant, schema id), sorted.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.routes.iter().flat_map(|(name, variants)| {
            variants
                .iter()
                .map(move |(variant, id)| (name.as_str(), variant.as_str(), id.as_str()))
        })
    }
}
