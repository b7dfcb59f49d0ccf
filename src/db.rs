use crate::model::{join_skills, split_skills, IndustryDemand, Institution, Location};
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

pub const DB_FILE: &str = "districtd.sqlite3";

/// Tables behind the generic record handlers. Each has the same shape:
/// id, district, name, data (JSON object), updated_at.
pub const RECORD_TABLES: &[&str] = &[
    "district_schemes",
    "district_training_centers",
    "district_iti_stats",
    "state_iti_stats",
];

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS institutions(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            area TEXT NOT NULL DEFAULT '',
            lat REAL NOT NULL DEFAULT 0,
            lng REAL NOT NULL DEFAULT 0,
            domains TEXT NOT NULL DEFAULT '[]',
            tools TEXT NOT NULL DEFAULT '[]',
            degrees TEXT NOT NULL DEFAULT '[]',
            coe INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    // Workspaces created before the supply panels lack the seat counts.
    ensure_institutions_capacity(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS industry_demand(
            id TEXT PRIMARY KEY,
            company_name TEXT NOT NULL,
            sector TEXT NOT NULL DEFAULT '',
            company_type TEXT NOT NULL DEFAULT '',
            skills_required TEXT NOT NULL DEFAULT '',
            demand_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_industry_demand_company ON industry_demand(company_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            district TEXT,
            institution_id TEXT,
            company_name TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS district_plans(
            id TEXT PRIMARY KEY,
            district TEXT NOT NULL,
            title TEXT NOT NULL,
            fiscal_year TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            body TEXT NOT NULL DEFAULT '{}',
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_district_plans_district ON district_plans(district)",
        [],
    )?;

    for table in RECORD_TABLES {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table}(
                    id TEXT PRIMARY KEY,
                    district TEXT NOT NULL DEFAULT '',
                    name TEXT NOT NULL,
                    data TEXT NOT NULL DEFAULT '{{}}',
                    updated_at TEXT NOT NULL
                )"
            ),
            [],
        )?;
        conn.execute(
            &format!("CREATE INDEX IF NOT EXISTS idx_{table}_district ON {table}(district)"),
            [],
        )?;
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS dic_master_companies(
            id TEXT PRIMARY KEY,
            company_name TEXT NOT NULL,
            district TEXT NOT NULL DEFAULT '',
            taluk TEXT,
            sector TEXT,
            company_type TEXT,
            contact_person TEXT,
            email TEXT,
            phone TEXT,
            employee_count INTEGER,
            seed_run_id TEXT,
            updated_at TEXT NOT NULL,
            UNIQUE(company_name, district)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS seed_runs(
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            source_sha256 TEXT NOT NULL,
            policy TEXT NOT NULL,
            rows_total INTEGER NOT NULL,
            inserted INTEGER NOT NULL,
            updated INTEGER NOT NULL,
            skipped INTEGER NOT NULL,
            failed INTEGER NOT NULL,
            committed INTEGER NOT NULL,
            started_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ad_survey_employer(
            id TEXT PRIMARY KEY,
            company_name TEXT NOT NULL,
            company_slug TEXT NOT NULL,
            district TEXT,
            respondent_email TEXT,
            responses TEXT NOT NULL,
            submitted_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ad_survey_employer_slug ON ad_survey_employer(company_slug)",
        [],
    )?;

    Ok(conn)
}

fn ensure_institutions_capacity(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "institutions", "intake")? {
        conn.execute(
            "ALTER TABLE institutions ADD COLUMN intake INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    if !table_has_column(conn, "institutions", "placed")? {
        conn.execute(
            "ALTER TABLE institutions ADD COLUMN placed INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn json_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn institution_from_row(row: &Row<'_>) -> rusqlite::Result<Institution> {
    let domains: String = row.get(6)?;
    let tools: String = row.get(7)?;
    let degrees: String = row.get(8)?;
    let coe: i64 = row.get(9)?;
    let intake: i64 = row.get(10)?;
    let placed: i64 = row.get(11)?;
    Ok(Institution {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        location: Location {
            area: row.get(3)?,
            lat: row.get(4)?,
            lng: row.get(5)?,
        },
        domains: json_list(&domains),
        tools: json_list(&tools),
        degrees: json_list(&degrees),
        coe: coe != 0,
        intake: intake.max(0) as u32,
        placed: placed.max(0) as u32,
    })
}

const INSTITUTION_COLUMNS: &str =
    "id, name, category, area, lat, lng, domains, tools, degrees, coe, intake, placed";

pub fn list_institutions(conn: &Connection) -> anyhow::Result<Vec<Institution>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INSTITUTION_COLUMNS} FROM institutions ORDER BY rowid"
    ))?;
    let rows = stmt
        .query_map([], institution_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_institution(conn: &Connection, id: &str) -> anyhow::Result<Option<Institution>> {
    let inst = conn
        .query_row(
            &format!("SELECT {INSTITUTION_COLUMNS} FROM institutions WHERE id = ?"),
            [id],
            institution_from_row,
        )
        .optional()?;
    Ok(inst)
}

/// Insert or update in place; an update keeps the row's position in listings.
pub fn upsert_institution(conn: &Connection, inst: &Institution) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO institutions(id, name, category, area, lat, lng, domains, tools, degrees, coe, intake, placed)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           category = excluded.category,
           area = excluded.area,
           lat = excluded.lat,
           lng = excluded.lng,
           domains = excluded.domains,
           tools = excluded.tools,
           degrees = excluded.degrees,
           coe = excluded.coe,
           intake = excluded.intake,
           placed = excluded.placed",
        rusqlite::params![
            inst.id,
            inst.name,
            inst.category,
            inst.location.area,
            inst.location.lat,
            inst.location.lng,
            serde_json::to_string(&inst.domains)?,
            serde_json::to_string(&inst.tools)?,
            serde_json::to_string(&inst.degrees)?,
            if inst.coe { 1 } else { 0 },
            inst.intake as i64,
            inst.placed as i64,
        ],
    )?;
    Ok(())
}

pub fn delete_institution(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM institutions WHERE id = ?", [id])?;
    Ok(n > 0)
}

fn demand_from_row(row: &Row<'_>) -> rusqlite::Result<IndustryDemand> {
    let skills: String = row.get(4)?;
    Ok(IndustryDemand {
        id: row.get(0)?,
        company_name: row.get(1)?,
        sector: row.get(2)?,
        company_type: row.get(3)?,
        skills_required: split_skills(&skills),
        demand_count: row.get(5)?,
    })
}

pub fn list_demand(conn: &Connection) -> anyhow::Result<Vec<IndustryDemand>> {
    let mut stmt = conn.prepare(
        "SELECT id, company_name, sector, company_type, skills_required, demand_count
         FROM industry_demand
         ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([], demand_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn upsert_demand(conn: &Connection, d: &IndustryDemand) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO industry_demand(id, company_name, sector, company_type, skills_required, demand_count)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           company_name = excluded.company_name,
           sector = excluded.sector,
           company_type = excluded.company_type,
           skills_required = excluded.skills_required,
           demand_count = excluded.demand_count",
        rusqlite::params![
            d.id,
            d.company_name,
            d.sector,
            d.company_type,
            join_skills(&d.skills_required),
            d.demand_count,
        ],
    )?;
    Ok(())
}

pub fn delete_demand(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM industry_demand WHERE id = ?", [id])?;
    Ok(n > 0)
}
