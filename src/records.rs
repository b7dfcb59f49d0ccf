use crate::db::{now_rfc3339, RECORD_TABLES};
use crate::nav::slugify;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub const AUTOFILL_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("unknown record table: {0}")]
    UnknownTable(String),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RecordsError {
    pub fn code(&self) -> &'static str {
        match self {
            RecordsError::NotFound(_) => "not_found",
            RecordsError::UnknownTable(_) | RecordsError::Invalid(_) => "bad_params",
            RecordsError::Conflict(_) => "conflict",
            RecordsError::Db(_) | RecordsError::Json(_) => "db_query_failed",
        }
    }
}

fn json_object(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::Object(Default::default()))
}

fn require_object(v: &Value, what: &str) -> Result<(), RecordsError> {
    if v.is_object() {
        Ok(())
    } else {
        Err(RecordsError::Invalid(format!("{what} must be an object")))
    }
}

// ---------------------------------------------------------------------------
// District plans

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Submitted,
    Approved,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Submitted => "submitted",
            PlanStatus::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Option<PlanStatus> {
        match s {
            "draft" => Some(PlanStatus::Draft),
            "submitted" => Some(PlanStatus::Submitted),
            "approved" => Some(PlanStatus::Approved),
            _ => None,
        }
    }

    /// Submitted plans may be sent back to draft; approval is final.
    pub fn can_become(self, next: PlanStatus) -> bool {
        matches!(
            (self, next),
            (PlanStatus::Draft, PlanStatus::Draft)
                | (PlanStatus::Draft, PlanStatus::Submitted)
                | (PlanStatus::Submitted, PlanStatus::Submitted)
                | (PlanStatus::Submitted, PlanStatus::Draft)
                | (PlanStatus::Submitted, PlanStatus::Approved)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub district: String,
    pub title: String,
    pub fiscal_year: Option<String>,
    pub status: PlanStatus,
    pub body: Value,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPatch {
    pub title: Option<String>,
    pub fiscal_year: Option<String>,
    pub status: Option<PlanStatus>,
    pub body: Option<Value>,
}

const PLAN_COLUMNS: &str =
    "id, district, title, fiscal_year, status, body, created_by, created_at, updated_at";

fn plan_from_row(row: &Row<'_>) -> rusqlite::Result<Plan> {
    let status: String = row.get(4)?;
    let body: String = row.get(5)?;
    Ok(Plan {
        id: row.get(0)?,
        district: row.get(1)?,
        title: row.get(2)?,
        fiscal_year: row.get(3)?,
        status: PlanStatus::parse(&status).unwrap_or(PlanStatus::Draft),
        body: json_object(&body),
        created_by: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn list_plans(conn: &Connection, district: Option<&str>) -> Result<Vec<Plan>, RecordsError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAN_COLUMNS} FROM district_plans
         WHERE (?1 IS NULL OR district = ?1)
         ORDER BY updated_at DESC, rowid"
    ))?;
    let rows = stmt
        .query_map([district], plan_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_plan(conn: &Connection, id: &str) -> Result<Plan, RecordsError> {
    conn.query_row(
        &format!("SELECT {PLAN_COLUMNS} FROM district_plans WHERE id = ?"),
        [id],
        plan_from_row,
    )
    .optional()?
    .ok_or_else(|| RecordsError::NotFound(format!("plan {id}")))
}

pub fn create_plan(
    conn: &Connection,
    district: &str,
    title: &str,
    fiscal_year: Option<&str>,
    body: Option<Value>,
    created_by: Option<&str>,
) -> Result<Plan, RecordsError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(RecordsError::Invalid("title must not be empty".to_string()));
    }
    if district.trim().is_empty() {
        return Err(RecordsError::Invalid("district must not be empty".to_string()));
    }
    let body = body.unwrap_or_else(|| Value::Object(Default::default()));
    require_object(&body, "body")?;

    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO district_plans(id, district, title, fiscal_year, status, body, created_by, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            district.trim(),
            title,
            fiscal_year,
            PlanStatus::Draft.as_str(),
            serde_json::to_string(&body)?,
            created_by,
            now,
            now,
        ],
    )?;
    get_plan(conn, &id)
}

pub fn update_plan(conn: &Connection, id: &str, patch: PlanPatch) -> Result<Plan, RecordsError> {
    let current = get_plan(conn, id)?;
    if current.status == PlanStatus::Approved {
        return Err(RecordsError::Conflict(format!("plan {id} is approved")));
    }
    let status = patch.status.unwrap_or(current.status);
    if !current.status.can_become(status) {
        return Err(RecordsError::Conflict(format!(
            "plan cannot move from {} to {}",
            current.status.as_str(),
            status.as_str()
        )));
    }
    let title = match patch.title {
        Some(t) if t.trim().is_empty() => {
            return Err(RecordsError::Invalid("title must not be empty".to_string()))
        }
        Some(t) => t.trim().to_string(),
        None => current.title,
    };
    let body = patch.body.unwrap_or(current.body);
    require_object(&body, "body")?;
    let fiscal_year = patch.fiscal_year.or(current.fiscal_year);

    conn.execute(
        "UPDATE district_plans
         SET title = ?, fiscal_year = ?, status = ?, body = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![
            title,
            fiscal_year,
            status.as_str(),
            serde_json::to_string(&body)?,
            now_rfc3339(),
            id,
        ],
    )?;
    get_plan(conn, id)
}

pub fn delete_plan(conn: &Connection, id: &str) -> Result<bool, RecordsError> {
    Ok(conn.execute("DELETE FROM district_plans WHERE id = ?", [id])? > 0)
}

// ---------------------------------------------------------------------------
// Schemes, training centres, ITI statistics

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRow {
    pub id: String,
    pub district: String,
    pub name: String,
    pub data: Value,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    pub id: Option<String>,
    #[serde(default)]
    pub district: String,
    pub name: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Maps a caller-supplied table name onto the fixed list so it can be
/// spliced into SQL.
pub fn record_table(name: &str) -> Result<&'static str, RecordsError> {
    RECORD_TABLES
        .iter()
        .copied()
        .find(|t| *t == name)
        .ok_or_else(|| RecordsError::UnknownTable(name.to_string()))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    let data: String = row.get(3)?;
    Ok(RecordRow {
        id: row.get(0)?,
        district: row.get(1)?,
        name: row.get(2)?,
        data: json_object(&data),
        updated_at: row.get(4)?,
    })
}

pub fn list_records(
    conn: &Connection,
    table: &str,
    district: Option<&str>,
) -> Result<Vec<RecordRow>, RecordsError> {
    let table = record_table(table)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT id, district, name, data, updated_at FROM {table}
         WHERE (?1 IS NULL OR district = ?1)
         ORDER BY name, rowid"
    ))?;
    let rows = stmt
        .query_map([district], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_record(conn: &Connection, table: &str, id: &str) -> Result<RecordRow, RecordsError> {
    let table = record_table(table)?;
    conn.query_row(
        &format!("SELECT id, district, name, data, updated_at FROM {table} WHERE id = ?"),
        [id],
        record_from_row,
    )
    .optional()?
    .ok_or_else(|| RecordsError::NotFound(format!("{table} {id}")))
}

pub fn upsert_record(
    conn: &Connection,
    table: &str,
    input: RecordInput,
) -> Result<RecordRow, RecordsError> {
    let table = record_table(table)?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(RecordsError::Invalid("name must not be empty".to_string()));
    }
    let data = input
        .data
        .unwrap_or_else(|| Value::Object(Default::default()));
    require_object(&data, "data")?;
    let id = input
        .id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        &format!(
            "INSERT INTO {table}(id, district, name, data, updated_at)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               district = excluded.district,
               name = excluded.name,
               data = excluded.data,
               updated_at = excluded.updated_at"
        ),
        rusqlite::params![
            id,
            input.district.trim(),
            name,
            serde_json::to_string(&data)?,
            now_rfc3339(),
        ],
    )?;
    get_record(conn, table, &id)
}

pub fn delete_record(conn: &Connection, table: &str, id: &str) -> Result<bool, RecordsError> {
    let table = record_table(table)?;
    Ok(conn.execute(&format!("DELETE FROM {table} WHERE id = ?"), [id])? > 0)
}

// ---------------------------------------------------------------------------
// Employer survey

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySubmission {
    pub id: String,
    pub company_name: String,
    pub company_slug: String,
    pub district: Option<String>,
    pub respondent_email: Option<String>,
    pub responses: Value,
    pub submitted_at: String,
}

pub fn submit_survey(
    conn: &Connection,
    company_name: &str,
    district: Option<&str>,
    respondent_email: Option<&str>,
    responses: Value,
) -> Result<SurveySubmission, RecordsError> {
    let company_name = company_name.trim();
    let company_slug = slugify(company_name);
    if company_slug.is_empty() {
        return Err(RecordsError::Invalid(
            "companyName must contain letters or digits".to_string(),
        ));
    }
    require_object(&responses, "responses")?;
    let sub = SurveySubmission {
        id: Uuid::new_v4().to_string(),
        company_name: company_name.to_string(),
        company_slug,
        district: district.map(str::to_string),
        respondent_email: respondent_email.map(str::to_string),
        responses,
        submitted_at: now_rfc3339(),
    };
    conn.execute(
        "INSERT INTO ad_survey_employer(id, company_name, company_slug, district, respondent_email, responses, submitted_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            sub.id,
            sub.company_name,
            sub.company_slug,
            sub.district,
            sub.respondent_email,
            serde_json::to_string(&sub.responses)?,
            sub.submitted_at,
        ],
    )?;
    Ok(sub)
}

pub fn list_surveys(
    conn: &Connection,
    company_slug: Option<&str>,
    district: Option<&str>,
) -> Result<Vec<SurveySubmission>, RecordsError> {
    let mut stmt = conn.prepare(
        "SELECT id, company_name, company_slug, district, respondent_email, responses, submitted_at
         FROM ad_survey_employer
         WHERE (?1 IS NULL OR company_slug = ?1) AND (?2 IS NULL OR district = ?2)
         ORDER BY submitted_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![company_slug, district], |row| {
            let responses: String = row.get(5)?;
            Ok(SurveySubmission {
                id: row.get(0)?,
                company_name: row.get(1)?,
                company_slug: row.get(2)?,
                district: row.get(3)?,
                respondent_email: row.get(4)?,
                responses: json_object(&responses),
                submitted_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// DIC master companies

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
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

const COMPANY_COLUMNS: &str = "id, company_name, district, taluk, sector, company_type, contact_person, email, phone, employee_count";

fn company_from_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        company_name: row.get(1)?,
        district: row.get(2)?,
        taluk: row.get(3)?,
        sector: row.get(4)?,
        company_type: row.get(5)?,
        contact_person: row.get(6)?,
        email: row.get(7)?,
        phone: row.get(8)?,
        employee_count: row.get(9)?,
    })
}

fn like_prefix(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

pub fn list_companies(conn: &Connection, district: Option<&str>) -> Result<Vec<Company>, RecordsError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPANY_COLUMNS} FROM dic_master_companies
         WHERE (?1 IS NULL OR district = ?1)
         ORDER BY company_name COLLATE NOCASE, rowid"
    ))?;
    let rows = stmt
        .query_map([district], company_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Case-insensitive name prefix lookup for survey and form autofill.
pub fn autofill_companies(
    conn: &Connection,
    prefix: &str,
    district: Option<&str>,
) -> Result<Vec<Company>, RecordsError> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPANY_COLUMNS} FROM dic_master_companies
         WHERE company_name LIKE ?1 ESCAPE '\\' AND (?2 IS NULL OR district = ?2)
         ORDER BY company_name COLLATE NOCASE, rowid
         LIMIT ?3"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![like_prefix(prefix), district, AUTOFILL_LIMIT as i64],
            company_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
