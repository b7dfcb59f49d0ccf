use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{dashboard_user, db_conn, optional_str, scoped_district};
use crate::ipc::types::{AppState, Request};
use crate::records;
use serde_json::{json, Value};

/// Open to the survey form as well, so no sign-in is required.
fn handle_autofill(state: &mut AppState, req: &Request) -> Value {
    let prefix = req
        .params
        .get("prefix")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let district = optional_str(req, "district");
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match records::autofill_companies(conn, prefix, district.as_deref()) {
        Ok(rows) => ok(&req.id, json!({ "companies": rows })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> Value {
    let auth = match dashboard_user(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let district = match scoped_district(req, &auth) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match records::list_companies(conn, district.as_deref()) {
        Ok(rows) => ok(&req.id, json!({ "district": district, "companies": rows })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "companies.autofill" => Some(handle_autofill(state, req)),
        "companies.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
