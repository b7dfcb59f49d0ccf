//! DIC master company seeding from CSV.
//!
//! Source files come from several district offices and disagree on header
//! names, so every field is looked up through a list of aliases. Seeding
//! reports one outcome per data row; the policy decides whether a batch with
//! failed rows is committed.

use crate::db::now_rfc3339;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Commit every row that succeeded.
    BestEffort,
    /// Commit only when no row failed.
    Atomic,
    /// Classify rows without writing anything.
    DryRun,
}

impl BatchPolicy {
    pub fn parse(s: &str) -> Option<BatchPolicy> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_effort" => Some(BatchPolicy::BestEffort),
            "atomic" => Some(BatchPolicy::Atomic),
            "dry_run" => Some(BatchPolicy::DryRun),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchPolicy::BestEffort => "best_effort",
            BatchPolicy::Atomic => "atomic",
            BatchPolicy::DryRun => "dry_run",
        }
    }
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("required column missing; expected one of: {0}")]
    MissingColumn(String),
    #[error("failed to read CSV header: {0}")]
    Header(#[source] csv::Error),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl SeedError {
    pub fn code(&self) -> &'static str {
        match self {
            SeedError::MissingColumn(_) | SeedError::Header(_) => "bad_params",
            SeedError::Db(_) => "db_insert_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    CompanyName,
    District,
    Taluk,
    Sector,
    CompanyType,
    ContactPerson,
    Email,
    Phone,
    EmployeeCount,
}

const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::CompanyName,
        &["company_name", "name_of_the_unit", "unit_name", "company", "name"],
    ),
    (Field::District, &["district", "district_name"]),
    (Field::Taluk, &["taluk", "taluka", "block"]),
    (
        Field::Sector,
        &["sector", "industry", "industry_type", "activity"],
    ),
    (
        Field::CompanyType,
        &["company_type", "type", "category", "enterprise_type", "msme_category"],
    ),
    (
        Field::ContactPerson,
        &["contact_person", "proprietor", "owner_name", "contact_name"],
    ),
    (Field::Email, &["email", "email_id", "contact_email", "mail"]),
    (
        Field::Phone,
        &["phone", "mobile", "mobile_no", "phone_number", "contact_number"],
    ),
    (
        Field::EmployeeCount,
        &["employee_count", "employees", "no_of_employees", "total_employees", "employment"],
    ),
];

/// `"No. of Employees"` -> `"no_of_employees"`.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::new();
    let mut pending = false;
    for ch in raw.trim_matches('\u{feff}').chars() {
        if ch.is_alphanumeric() {
            if pending && !out.is_empty() {
                out.push('_');
            }
            pending = false;
            out.extend(ch.to_lowercase());
        } else {
            pending = true;
        }
    }
    out
}

#[derive(Debug, Clone)]
struct HeaderMap {
    columns: Vec<(Field, Option<usize>)>,
}

impl HeaderMap {
    fn resolve(headers: &csv::StringRecord) -> Result<HeaderMap, SeedError> {
        let normalized = headers.iter().map(normalize_header).collect::<Vec<_>>();
        let columns = FIELD_ALIASES
            .iter()
            .map(|(field, aliases)| {
                let idx = aliases
                    .iter()
                    .find_map(|alias| normalized.iter().position(|h| h.as_str() == *alias));
                (*field, idx)
            })
            .collect::<Vec<_>>();
        let map = HeaderMap { columns };
        if map.index(Field::CompanyName).is_none() {
            let aliases = FIELD_ALIASES
                .iter()
                .find(|(f, _)| *f == Field::CompanyName)
                .map(|(_, a)| a.join(", "))
                .unwrap_or_default();
            return Err(SeedError::MissingColumn(aliases));
        }
        Ok(map)
    }

    fn index(&self, field: Field) -> Option<usize> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, idx)| *idx)
    }

    fn get(&self, record: &csv::StringRecord, field: Field) -> Option<String> {
        self.index(field)
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRow {
    pub company_name: String,
    pub district: String,
    pub taluk: Option<String>,
    pub sector: Option<String>,
    pub company_type: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub employee_count: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Inserted,
    Updated,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResult {
    pub line: usize,
    pub company_name: Option<String>,
    pub status: RowStatus,
    pub id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub run_id: String,
    pub source: String,
    pub source_sha256: String,
    pub policy: BatchPolicy,
    pub committed: bool,
    pub rows_total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub rows: Vec<RowResult>,
}

impl BatchReport {
    fn count(&self, status: RowStatus) -> usize {
        self.rows.iter().filter(|r| r.status == status).count()
    }
}

fn parse_record(
    map: &HeaderMap,
    record: &csv::StringRecord,
    default_district: Option<&str>,
) -> Result<CompanyRow, String> {
    let company_name = map
        .get(record, Field::CompanyName)
        .ok_or_else(|| "missing company name".to_string())?;
    let district = map
        .get(record, Field::District)
        .or_else(|| default_district.map(str::to_string))
        .unwrap_or_default();
    let employee_count = match map.get(record, Field::EmployeeCount) {
        None => None,
        Some(raw) => Some(
            raw.replace(',', "")
                .parse::<i64>()
                .map_err(|_| format!("invalid employee count: {raw}"))?,
        ),
    };
    Ok(CompanyRow {
        company_name,
        district,
        taluk: map.get(record, Field::Taluk),
        sector: map.get(record, Field::Sector),
        company_type: map.get(record, Field::CompanyType),
        contact_person: map.get(record, Field::ContactPerson),
        email: map.get(record, Field::Email),
        phone: map.get(record, Field::Phone),
        employee_count,
    })
}

fn existing_company_id(
    conn: &Connection,
    row: &CompanyRow,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT id FROM dic_master_companies WHERE company_name = ? AND district = ?",
        (&row.company_name, &row.district),
        |r| r.get(0),
    )
    .optional()
}

fn write_company(
    conn: &Connection,
    row: &CompanyRow,
    existing: Option<&str>,
    run_id: &str,
    now: &str,
) -> rusqlite::Result<String> {
    if let Some(id) = existing {
        conn.execute(
            "UPDATE dic_master_companies
             SET taluk = ?, sector = ?, company_type = ?, contact_person = ?, email = ?, phone = ?,
                 employee_count = ?, seed_run_id = ?, updated_at = ?
             WHERE id = ?",
            rusqlite::params![
                row.taluk,
                row.sector,
                row.company_type,
                row.contact_person,
                row.email,
                row.phone,
                row.employee_count,
                run_id,
                now,
                id,
            ],
        )?;
        return Ok(id.to_string());
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO dic_master_companies(id, company_name, district, taluk, sector, company_type,
             contact_person, email, phone, employee_count, seed_run_id, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            row.company_name,
            row.district,
            row.taluk,
            row.sector,
            row.company_type,
            row.contact_person,
            row.email,
            row.phone,
            row.employee_count,
            run_id,
            now,
        ],
    )?;
    Ok(id)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn seed_companies(
    conn: &Connection,
    source: &str,
    bytes: &[u8],
    policy: BatchPolicy,
    default_district: Option<&str>,
) -> Result<BatchReport, SeedError> {
    let run_id = Uuid::new_v4().to_string();
    let now = now_rfc3339();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers = reader.headers().map_err(SeedError::Header)?.clone();
    let map = HeaderMap::resolve(&headers)?;

    let tx = conn.unchecked_transaction()?;
    let mut rows = Vec::new();
    // A dry run never writes, so repeats within the file are tracked here.
    let mut previewed: HashSet<(String, String)> = HashSet::new();
    for (i, record) in reader.records().enumerate() {
        // Header is line 1; fall back to the ordinal when the reader has no position.
        let fallback_line = i + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line);
                tracing::warn!(line, error = %e, "seed row unreadable");
                rows.push(RowResult {
                    line,
                    company_name: None,
                    status: RowStatus::Failed,
                    id: None,
                    message: Some(e.to_string()),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let row = match parse_record(&map, &record, default_district) {
            Ok(r) => r,
            Err(reason) => {
                tracing::debug!(line, reason = %reason, "seed row skipped");
                rows.push(RowResult {
                    line,
                    company_name: map.get(&record, Field::CompanyName),
                    status: RowStatus::Skipped,
                    id: None,
                    message: Some(reason),
                });
                continue;
            }
        };

        let outcome = existing_company_id(&tx, &row).and_then(|existing| {
            if policy == BatchPolicy::DryRun {
                let first_in_file =
                    previewed.insert((row.company_name.clone(), row.district.clone()));
                let status = if existing.is_none() && first_in_file {
                    RowStatus::Inserted
                } else {
                    RowStatus::Updated
                };
                return Ok((status, existing));
            }
            let status = if existing.is_some() {
                RowStatus::Updated
            } else {
                RowStatus::Inserted
            };
            write_company(&tx, &row, existing.as_deref(), &run_id, &now)
                .map(|id| (status, Some(id)))
        });
        match outcome {
            Ok((status, id)) => rows.push(RowResult {
                line,
                company_name: Some(row.company_name),
                status,
                id,
                message: None,
            }),
            Err(e) => {
                tracing::warn!(line, error = %e, "seed row failed");
                rows.push(RowResult {
                    line,
                    company_name: Some(row.company_name),
                    status: RowStatus::Failed,
                    id: None,
                    message: Some(e.to_string()),
                });
            }
        }
    }

    let mut report = BatchReport {
        run_id,
        source: source.to_string(),
        source_sha256: sha256_hex(bytes),
        policy,
        committed: false,
        rows_total: rows.len(),
        inserted: 0,
        updated: 0,
        skipped: 0,
        failed: 0,
        rows,
    };
    report.inserted = report.count(RowStatus::Inserted);
    report.updated = report.count(RowStatus::Updated);
    report.skipped = report.count(RowStatus::Skipped);
    report.failed = report.count(RowStatus::Failed);

    report.committed = match policy {
        BatchPolicy::DryRun => false,
        BatchPolicy::Atomic => report.failed == 0,
        BatchPolicy::BestEffort => true,
    };
    if report.committed {
        tx.commit()?;
    } else {
        tx.rollback()?;
        if policy == BatchPolicy::Atomic {
            // Rolled back: nothing from this batch was written.
            for r in report.rows.iter_mut().filter(|r| r.status != RowStatus::Failed) {
                r.id = None;
            }
        }
    }

    if policy != BatchPolicy::DryRun {
        conn.execute(
            "INSERT INTO seed_runs(id, source, source_sha256, policy, rows_total, inserted, updated, skipped, failed, committed, started_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                report.run_id,
                report.source,
                report.source_sha256,
                policy.as_str(),
                report.rows_total as i64,
                report.inserted as i64,
                report.updated as i64,
                report.skipped as i64,
                report.failed as i64,
                if report.committed { 1 } else { 0 },
                now,
            ],
        )?;
    }

    tracing::info!(
        source = %report.source,
        policy = policy.as_str(),
        inserted = report.inserted,
        updated = report.updated,
        skipped = report.skipped,
        failed = report.failed,
        committed = report.committed,
        "seed run finished"
    );
    Ok(report)
}

/// Whether a file with this digest was already committed by an earlier run.
pub fn previously_seeded(conn: &Connection, sha256: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT started_at FROM seed_runs WHERE source_sha256 = ? AND committed = 1
         ORDER BY started_at DESC LIMIT 1",
        [sha256],
        |r| r.get(0),
    )
    .optional()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRun {
    pub id: String,
    pub source: String,
    pub source_sha256: String,
    pub policy: String,
    pub rows_total: i64,
    pub inserted: i64,
    pub updated: i64,
    pub skipped: i64,
    pub failed: i64,
    pub committed: bool,
    pub started_at: String,
}

pub fn list_seed_runs(conn: &Connection) -> rusqlite::Result<Vec<SeedRun>> {
    let mut stmt = conn.prepare(
        "SELECT id, source, source_sha256, policy, rows_total, inserted, updated, skipped, failed, committed, started_at
         FROM seed_runs
         ORDER BY started_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map([], |r| {
            let committed: i64 = r.get(9)?;
            Ok(SeedRun {
                id: r.get(0)?,
                source: r.get(1)?,
                source_sha256: r.get(2)?,
                policy: r.get(3)?,
                rows_total: r.get(4)?,
                inserted: r.get(5)?,
                updated: r.get(6)?,
                skipped: r.get(7)?,
                failed: r.get(8)?,
                committed: committed != 0,
                started_at: r.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn open(prefix: &str) -> (std::path::PathBuf, Connection) {
        let ws = std::env::temp_dir().join(format!("{}-{}", prefix, Uuid::new_v4()));
        let conn = db::open_db(&ws).expect("open");
        (ws, conn)
    }

    fn company_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM dic_master_companies", [], |r| r.get(0))
            .expect("count")
    }

    #[test]
    fn header_variants_normalize() {
        assert_eq!(normalize_header("\u{feff}No. of Employees"), "no_of_employees");
        assert_eq!(normalize_header(" Name of the Unit "), "name_of_the_unit");
        assert_eq!(normalize_header("E-mail ID"), "e_mail_id");
    }

    #[test]
    fn alias_order_wins_over_column_order() {
        let headers = csv::StringRecord::from(vec!["Name", "Unit Name", "Industry", "Mobile No"]);
        let map = HeaderMap::resolve(&headers).expect("resolve");
        assert_eq!(map.index(Field::CompanyName), Some(1));
        assert_eq!(map.index(Field::Sector), Some(2));
        assert_eq!(map.index(Field::Phone), Some(3));
        assert_eq!(map.index(Field::Email), None);
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let (ws, conn) = open("districtd-seed-nocol");
        let csv = b"District,Sector\nUdupi,Textiles\n";
        let res = seed_companies(&conn, "x.csv", csv, BatchPolicy::BestEffort, None);
        assert!(matches!(res, Err(SeedError::MissingColumn(_))));
        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn best_effort_skips_bad_rows_and_keeps_good_ones() {
        let (ws, conn) = open("districtd-seed-best");
        let csv = b"Name of the Unit,District,Sector,No. of Employees\n\
Coastal Cashews,Udupi,Food Processing,\"1,200\"\n\
,Udupi,Textiles,10\n\
Karavali Boats,Udupi,Marine,many\n\
\n\
Sea Foods Ltd,,Marine,40\n";
        let report = seed_companies(&conn, "dic.csv", csv, BatchPolicy::BestEffort, Some("Udupi"))
            .expect("seed");
        assert!(report.committed);
        assert_eq!(report.rows_total, 4);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.rows[0].line, 2);
        assert_eq!(report.rows[1].message.as_deref(), Some("missing company name"));
        assert_eq!(company_count(&conn), 2);

        let employees: i64 = conn
            .query_row(
                "SELECT employee_count FROM dic_master_companies WHERE company_name = 'Coastal Cashews'",
                [],
                |r| r.get(0),
            )
            .expect("employees");
        assert_eq!(employees, 1200);
        let district: String = conn
            .query_row(
                "SELECT district FROM dic_master_companies WHERE company_name = 'Sea Foods Ltd'",
                [],
                |r| r.get(0),
            )
            .expect("district");
        assert_eq!(district, "Udupi");
        assert!(previously_seeded(&conn, &report.source_sha256)
            .expect("lookup")
            .is_some());
        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn reseeding_updates_instead_of_duplicating() {
        let (ws, conn) = open("districtd-seed-again");
        let csv = b"Company Name,District,Sector\nCoastal Cashews,Udupi,Food\n";
        seed_companies(&conn, "a.csv", csv, BatchPolicy::BestEffort, None).expect("first");
        let csv2 = b"Company Name,District,Sector\nCoastal Cashews,Udupi,Agro\n";
        let report = seed_companies(&conn, "b.csv", csv2, BatchPolicy::BestEffort, None).expect("second");
        assert_eq!(report.updated, 1);
        assert_eq!(company_count(&conn), 1);
        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn atomic_rolls_back_when_a_row_fails() {
        let (ws, conn) = open("districtd-seed-atomic");
        let mut csv = b"Company Name,District\nCoastal Cashews,Udupi\n".to_vec();
        csv.extend_from_slice(b"Bad \xff Bytes,Udupi\n");
        let report =
            seed_companies(&conn, "bad.csv", &csv, BatchPolicy::Atomic, None).expect("seed");
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 1);
        assert!(!report.committed);
        assert!(report.rows[0].id.is_none());
        assert_eq!(company_count(&conn), 0);
        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (ws, conn) = open("districtd-seed-dry");
        let csv = b"Company Name,District\nCoastal Cashews,Udupi\n";
        let report = seed_companies(&conn, "a.csv", csv, BatchPolicy::DryRun, None).expect("seed");
        assert_eq!(report.inserted, 1);
        assert!(!report.committed);
        assert_eq!(company_count(&conn), 0);
        let runs: i64 = conn
            .query_row("SELECT COUNT(*) FROM seed_runs", [], |r| r.get(0))
            .expect("runs");
        assert_eq!(runs, 0);
        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn dry_run_counts_match_the_real_run_for_repeated_rows() {
        let (ws, conn) = open("districtd-seed-dry-repeat");
        let csv = b"Company Name,District\nCoastal Cashews,Udupi\nCoastal Cashews,Udupi\nCoastal Cashews,Mysuru\n";
        let dry = seed_companies(&conn, "a.csv", csv, BatchPolicy::DryRun, None).expect("dry");
        let real = seed_companies(&conn, "a.csv", csv, BatchPolicy::BestEffort, None).expect("real");
        assert_eq!((dry.inserted, dry.updated), (2, 1));
        assert_eq!((real.inserted, real.updated), (dry.inserted, dry.updated));
        let statuses = |r: &BatchReport| r.rows.iter().map(|row| row.status).collect::<Vec<_>>();
        assert_eq!(statuses(&dry), statuses(&real));
        assert_eq!(company_count(&conn), 2);
        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }
}
