use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, district_visible, param, require_mode, required_str, scoped_district,
};
use crate::ipc::types::{AppState, Request};
use crate::nav::{AdminMode, Role};
use crate::records::{self, RecordInput, RecordsError};
use crate::session::AuthContext;
use serde_json::{json, Value};

fn records_error(req: &Request, e: &RecordsError) -> Value {
    err(&req.id, e.code(), e.to_string(), None)
}

/// Admin screen that owns each record table.
fn table_mode(table: &str) -> AdminMode {
    match table {
        "district_schemes" => AdminMode::Schemes,
        "district_training_centers" => AdminMode::TrainingCenter,
        _ => AdminMode::ItiTrade,
    }
}

fn table_and_user(state: &AppState, req: &Request) -> Result<(&'static str, AuthContext), Value> {
    let raw = required_str(req, "table")?;
    let table = records::record_table(&raw).map_err(|e| records_error(req, &e))?;
    let auth = require_mode(state, req, table_mode(table))?;
    Ok((table, auth))
}

/// Like `table_and_user`, plus the rule that state statistics are written
/// by the super admin only.
fn writable_table_and_user(
    state: &AppState,
    req: &Request,
) -> Result<(&'static str, AuthContext), Value> {
    let (table, auth) = table_and_user(state, req)?;
    if table == "state_iti_stats" && auth.role != Role::SuperAdmin {
        return Err(err(
            &req.id,
            "forbidden",
            "only super_admin may edit state statistics",
            None,
        ));
    }
    Ok((table, auth))
}

fn handle_list(state: &mut AppState, req: &Request) -> Value {
    let (table, auth) = match table_and_user(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // State-level statistics are shared across districts.
    let district = if table == "state_iti_stats" {
        None
    } else {
        match scoped_district(req, &auth) {
            Ok(d) => d,
            Err(e) => return e,
        }
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match records::list_records(conn, table, district.as_deref()) {
        Ok(rows) => ok(&req.id, json!({ "table": table, "records": rows })),
        Err(e) => records_error(req, &e),
    }
}

fn handle_upsert(state: &mut AppState, req: &Request) -> Value {
    let (table, auth) = match writable_table_and_user(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut input: RecordInput = match param(req, "record") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if auth.role != Role::SuperAdmin {
        input.district = auth.district.clone().unwrap_or_default();
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    if let Some(id) = input.id.as_deref() {
        match records::get_record(conn, table, id) {
            Ok(existing) if !district_visible(&auth, &existing.district) => {
                return records_error(req, &RecordsError::NotFound(format!("{table} {id}")))
            }
            Ok(_) | Err(RecordsError::NotFound(_)) => {}
            Err(e) => return records_error(req, &e),
        }
    }
    match records::upsert_record(conn, table, input) {
        Ok(row) => ok(&req.id, json!({ "table": table, "record": row })),
        Err(e) => records_error(req, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> Value {
    let (table, auth) = match writable_table_and_user(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match records::get_record(conn, table, &id) {
        Ok(existing) if district_visible(&auth, &existing.district) => {}
        Ok(_) => return records_error(req, &RecordsError::NotFound(format!("{table} {id}"))),
        Err(e) => return records_error(req, &e),
    }
    match records::delete_record(conn, table, &id) {
        Ok(true) => ok(&req.id, json!({ "deleted": id })),
        Ok(false) => records_error(req, &RecordsError::NotFound(format!("{table} {id}"))),
        Err(e) => records_error(req, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "records.list" => Some(handle_list(state, req)),
        "records.upsert" => Some(handle_upsert(state, req)),
        "records.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
