use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, district_visible, optional_str, param_or_default, require_mode, required_str,
    scoped_district,
};
use crate::ipc::types::{AppState, Request};
use crate::nav::AdminMode;
use crate::records::{self, Plan, PlanPatch, RecordsError};
use crate::session::AuthContext;
use rusqlite::Connection;
use serde_json::{json, Value};

fn records_error(req: &Request, e: &RecordsError) -> Value {
    err(&req.id, e.code(), e.to_string(), None)
}

/// Loads a plan, hiding plans from other districts behind `not_found`.
fn visible_plan(
    conn: &Connection,
    req: &Request,
    auth: &AuthContext,
    id: &str,
) -> Result<Plan, Value> {
    let plan = records::get_plan(conn, id).map_err(|e| records_error(req, &e))?;
    if !district_visible(auth, &plan.district) {
        return Err(records_error(
            req,
            &RecordsError::NotFound(format!("plan {id}")),
        ));
    }
    Ok(plan)
}

fn handle_plans_list(state: &mut AppState, req: &Request) -> Value {
    let auth = match require_mode(state, req, AdminMode::PlanList) {
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
    match records::list_plans(conn, district.as_deref()) {
        Ok(plans) => ok(&req.id, json!({ "district": district, "plans": plans })),
        Err(e) => records_error(req, &e),
    }
}

fn handle_plans_get(state: &mut AppState, req: &Request) -> Value {
    let auth = match require_mode(state, req, AdminMode::Plan) {
        Ok(a) => a,
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
    match visible_plan(conn, req, &auth, &id) {
        Ok(plan) => ok(&req.id, json!({ "plan": plan })),
        Err(e) => e,
    }
}

fn handle_plans_create(state: &mut AppState, req: &Request) -> Value {
    let auth = match require_mode(state, req, AdminMode::Plan) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let district = match scoped_district(req, &auth) {
        Ok(Some(d)) => d,
        Ok(None) => return err(&req.id, "bad_params", "missing district", None),
        Err(e) => return e,
    };
    let title = match required_str(req, "title") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let body = req.params.get("body").cloned().filter(|v| !v.is_null());
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match records::create_plan(
        conn,
        &district,
        &title,
        optional_str(req, "fiscalYear").as_deref(),
        body,
        Some(&auth.user_id),
    ) {
        Ok(plan) => {
            tracing::info!(plan = %plan.id, district = %plan.district, "plan created");
            ok(&req.id, json!({ "plan": plan }))
        }
        Err(e) => records_error(req, &e),
    }
}

fn handle_plans_update(state: &mut AppState, req: &Request) -> Value {
    let auth = match require_mode(state, req, AdminMode::PlanEdit) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch: PlanPatch = match param_or_default(req, "patch") {
        Ok(p) => p,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    if let Err(e) = visible_plan(conn, req, &auth, &id) {
        return e;
    }
    match records::update_plan(conn, &id, patch) {
        Ok(plan) => ok(&req.id, json!({ "plan": plan })),
        Err(e) => records_error(req, &e),
    }
}

fn handle_plans_delete(state: &mut AppState, req: &Request) -> Value {
    let auth = match require_mode(state, req, AdminMode::PlanList) {
        Ok(a) => a,
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
    if let Err(e) = visible_plan(conn, req, &auth, &id) {
        return e;
    }
    match records::delete_plan(conn, &id) {
        Ok(true) => ok(&req.id, json!({ "deleted": id })),
        Ok(false) => records_error(req, &RecordsError::NotFound(format!("plan {id}"))),
        Err(e) => records_error(req, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "plans.list" => Some(handle_plans_list(state, req)),
        "plans.get" => Some(handle_plans_get(state, req)),
        "plans.create" => Some(handle_plans_create(state, req)),
        "plans.update" => Some(handle_plans_update(state, req)),
        "plans.delete" => Some(handle_plans_delete(state, req)),
        _ => None,
    }
}
