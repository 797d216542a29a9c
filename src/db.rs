use crate::metadata::build_date_to_unix_millis;
use crate::report::BuildReport;
use rusqlite::{params, Connection, Result};
use std::path::Path;

/// Opens (or creates) the benchlog SQLite database at the given path.
///
/// Creates the builds, iterations and metrics tables if they don't already
/// exist. Returns an open connection ready for use.
pub fn open_or_create(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;

    // Enable WAL mode for better concurrent read performance
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS builds (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            parsed_at     TEXT NOT NULL,
            source        TEXT NOT NULL,
            build_name    TEXT NOT NULL,
            kind          TEXT NOT NULL,
            build_result  TEXT NOT NULL,
            machine       TEXT,
            started_by    TEXT,
            artifactory   TEXT,
            java_version  TEXT,
            jdk_date      TEXT,
            jdk_date_ms   INTEGER,
            node_version  TEXT,
            node_run_date TEXT
        );

        CREATE TABLE IF NOT EXISTS iterations (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            build_id          INTEGER NOT NULL REFERENCES builds(id) ON DELETE CASCADE,
            test_index        INTEGER NOT NULL,
            test_result       TEXT NOT NULL,
            benchmark_name    TEXT,
            benchmark_variant TEXT,
            product_resource  TEXT
        );

        CREATE TABLE IF NOT EXISTS metrics (
            iteration_id INTEGER NOT NULL REFERENCES iterations(id) ON DELETE CASCADE,
            name         TEXT NOT NULL,
            position     INTEGER NOT NULL,
            value        REAL
        );

        CREATE INDEX IF NOT EXISTS idx_builds_name ON builds(build_name);
        CREATE INDEX IF NOT EXISTS idx_iterations_build ON iterations(build_id);
        CREATE INDEX IF NOT EXISTS idx_metrics_iteration ON metrics(iteration_id);",
    )?;

    Ok(conn)
}

/// Store a report and all its iterations in one transaction.
/// Returns the new build id. `NaN` metric values are stored as NULL.
pub fn store_report(conn: &mut Connection, source: &str, report: &BuildReport) -> Result<i64> {
    let parsed_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let jdk_date_ms = report
        .metadata
        .jdk_date
        .as_deref()
        .and_then(build_date_to_unix_millis);
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO builds (parsed_at, source, build_name, kind, build_result, machine,
                             started_by, artifactory, java_version, jdk_date, jdk_date_ms,
                             node_version, node_run_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            parsed_at,
            source,
            report.build_name,
            report.kind.as_str(),
            report.build_result.as_str(),
            report.metadata.machine,
            report.metadata.started_by,
            report.metadata.artifactory,
            report.metadata.java_version,
            report.metadata.jdk_date,
            jdk_date_ms,
            report.metadata.node_version,
            report.metadata.node_run_date,
        ],
    )?;
    let build_id = tx.last_insert_rowid();

    for test in &report.tests {
        tx.execute(
            "INSERT INTO iterations (build_id, test_index, test_result, benchmark_name,
                                     benchmark_variant, product_resource)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                build_id,
                test.test_index as i64,
                test.test_result.as_str(),
                test.benchmark_name,
                test.benchmark_variant,
                test.product_resource,
            ],
        )?;
        let iteration_id = tx.last_insert_rowid();

        let Some(data) = &test.test_data else {
            continue;
        };
        for metric in &data.metrics {
            for (position, value) in metric.value.iter().enumerate() {
                let value = (!value.is_nan()).then_some(*value);
                tx.execute(
                    "INSERT INTO metrics (iteration_id, name, position, value) VALUES (?1, ?2, ?3, ?4)",
                    params![iteration_id, metric.name, position as i64, value],
                )?;
            }
        }
    }

    tx.commit()?;
    tracing::debug!(build_id, build_name = %report.build_name, "stored report");
    Ok(build_id)
}

/// A row from the builds table.
#[derive(Debug)]
pub struct BuildRow {
    pub id: i64,
    pub parsed_at: String,
    pub source: String,
    pub build_name: String,
    pub kind: String,
    pub build_result: String,
    pub machine: Option<String>,
    pub iterations: i64,
    pub passed: i64,
}

/// Most recent builds first, with iteration counts.
pub fn list_builds(conn: &Connection, limit: u32) -> Result<Vec<BuildRow>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.parsed_at, b.source, b.build_name, b.kind, b.build_result, b.machine,
                COUNT(i.id),
                COALESCE(SUM(CASE WHEN i.test_result = 'PASSED' THEN 1 ELSE 0 END), 0)
         FROM builds b
         LEFT JOIN iterations i ON i.build_id = b.id
         GROUP BY b.id
         ORDER BY b.id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], map_build)?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

fn map_build(row: &rusqlite::Row) -> Result<BuildRow> {
    Ok(BuildRow {
        id: row.get(0)?,
        parsed_at: row.get(1)?,
        source: row.get(2)?,
        build_name: row.get(3)?,
        kind: row.get(4)?,
        build_result: row.get(5)?,
        machine: row.get(6)?,
        iterations: row.get(7)?,
        passed: row.get(8)?,
    })
}

/// One stored metric value.
#[derive(Debug, PartialEq)]
pub struct MetricRow {
    pub test_index: i64,
    pub name: String,
    pub position: i64,
    pub value: Option<f64>,
}

/// All metric values of a build, ordered by iteration then insertion.
pub fn load_metrics(conn: &Connection, build_id: i64) -> Result<Vec<MetricRow>> {
    let mut stmt = conn.prepare(
        "SELECT i.test_index, m.name, m.position, m.value
         FROM metrics m
         JOIN iterations i ON i.id = m.iteration_id
         WHERE i.build_id = ?1
         ORDER BY i.test_index ASC, m.rowid ASC",
    )?;
    let rows = stmt.query_map(params![build_id], |row| {
        Ok(MetricRow {
            test_index: row.get(0)?,
            name: row.get(1)?,
            position: row.get(2)?,
            value: row.get(3)?,
        })
    })?
    .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{
        BuildMetadata, IterationRecord, MetricResult, ReportKind, TestData, TestStatus,
    };
    use crate::verdict::Verdict;
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Connection) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("benchlog.db");
        let conn = open_or_create(&path).unwrap();
        (dir, conn)
    }

    fn sample_report() -> BuildReport {
        BuildReport {
            build_name: "PerfNext-42".into(),
            kind: ReportKind::Perf,
            tests: vec![
                IterationRecord {
                    test_output: "...".into(),
                    test_result: TestStatus::Passed,
                    test_index: 1,
                    benchmark_name: Some("LibertyThroughputDT".into()),
                    benchmark_variant: Some("qs".into()),
                    product_resource: None,
                    test_data: Some(TestData {
                        metrics: vec![
                            MetricResult {
                                name: "Throughput".into(),
                                value: vec![1200.5, f64::NAN],
                            },
                            MetricResult {
                                name: "JIT CPU total".into(),
                                value: vec![520.0],
                            },
                        ],
                    }),
                },
                IterationRecord {
                    test_output: "...".into(),
                    test_result: TestStatus::Failed,
                    test_index: 2,
                    benchmark_name: None,
                    benchmark_variant: None,
                    product_resource: None,
                    test_data: None,
                },
            ],
            build_result: Verdict::PartialSuccess,
            metadata: BuildMetadata {
                machine: Some("perf-x86-2".into()),
                jdk_date: Some("20231019".into()),
                ..Default::default()
            },
            summary: None,
        }
    }

    #[test]
    fn creates_database_and_tables() {
        let (_dir, conn) = test_db();

        for table in ["builds", "iterations", "metrics"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "{table}");
        }
    }

    #[test]
    fn reopen_keeps_stored_builds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("benchlog.db");

        let mut conn = open_or_create(&path).unwrap();
        let id = store_report(&mut conn, "logs/perf.log", &sample_report()).unwrap();
        drop(conn);

        // Schema creation on an existing file leaves rows in place
        let conn = open_or_create(&path).unwrap();
        let builds = list_builds(&conn, 10).unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].id, id);
        assert!(!load_metrics(&conn, id).unwrap().is_empty());
        for table in ["builds", "iterations", "metrics"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert!(count > 0, "{table}");
        }
    }

    #[test]
    fn store_and_list_report() {
        let (_dir, mut conn) = test_db();
        let id = store_report(&mut conn, "logs/perf.log", &sample_report()).unwrap();

        let builds = list_builds(&conn, 10).unwrap();
        assert_eq!(builds.len(), 1);
        let b = &builds[0];
        assert_eq!(b.id, id);
        assert_eq!(b.source, "logs/perf.log");
        assert_eq!(b.build_name, "PerfNext-42");
        assert_eq!(b.kind, "Perf");
        assert_eq!(b.build_result, "PARTIAL-SUCCESS");
        assert_eq!(b.machine.as_deref(), Some("perf-x86-2"));
        assert_eq!(b.iterations, 2);
        assert_eq!(b.passed, 1);
        assert!(b.parsed_at.ends_with('Z'));
    }

    #[test]
    fn metrics_round_trip_with_nan_as_null() {
        let (_dir, mut conn) = test_db();
        let id = store_report(&mut conn, "x", &sample_report()).unwrap();

        let metrics = load_metrics(&conn, id).unwrap();
        assert_eq!(
            metrics,
            vec![
                MetricRow {
                    test_index: 1,
                    name: "Throughput".into(),
                    position: 0,
                    value: Some(1200.5),
                },
                MetricRow {
                    test_index: 1,
                    name: "Throughput".into(),
                    position: 1,
                    value: None,
                },
                MetricRow {
                    test_index: 1,
                    name: "JIT CPU total".into(),
                    position: 0,
                    value: Some(520.0),
                },
            ]
        );
    }

    #[test]
    fn jdk_date_stored_as_unix_millis() {
        let (_dir, mut conn) = test_db();
        let id = store_report(&mut conn, "x", &sample_report()).unwrap();
        let ms: Option<i64> = conn
            .query_row("SELECT jdk_date_ms FROM builds WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(ms, Some(1_697_716_800_000));
    }

    #[test]
    fn list_builds_newest_first_and_limited() {
        let (_dir, mut conn) = test_db();
        let first = store_report(&mut conn, "a", &sample_report()).unwrap();
        let second = store_report(&mut conn, "b", &sample_report()).unwrap();
        let third = store_report(&mut conn, "c", &sample_report()).unwrap();
        assert!(first < second && second < third);

        let builds = list_builds(&conn, 2).unwrap();
        let ids: Vec<_> = builds.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![third, second]);
    }

    #[test]
    fn build_without_iterations_listed() {
        let (_dir, mut conn) = test_db();
        let mut report = sample_report();
        report.tests.clear();
        store_report(&mut conn, "empty", &report).unwrap();
        let builds = list_builds(&conn, 10).unwrap();
        assert_eq!(builds[0].iterations, 0);
        assert_eq!(builds[0].passed, 0);
    }

    #[test]
    fn opens_existing_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("benchlog.db");

        {
            let mut conn = open_or_create(&path).unwrap();
            store_report(&mut conn, "persisted", &sample_report()).unwrap();
        }

        {
            let conn = open_or_create(&path).unwrap();
            let builds = list_builds(&conn, 10).unwrap();
            assert_eq!(builds.len(), 1);
            assert_eq!(builds[0].source, "persisted");
        }
    }
}
