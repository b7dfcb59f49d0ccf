use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, optional_str, require_mode, scoped_district};
use crate::ipc::types::{AppState, Request};
use crate::nav::{slugify, AdminMode, Role};
use crate::records;
use serde_json::{json, Value};

/// Company accounts answer for their own company; the public survey link
/// names the company in `companyName`.
fn handle_submit(state: &mut AppState, req: &Request) -> Value {
    let auth = state.session.auth().cloned();
    let company_name = match &auth {
        Some(a) if a.role == Role::Company => a.company_name.clone(),
        _ => optional_str(req, "companyName"),
    };
    let Some(company_name) = company_name else {
        return err(&req.id, "bad_params", "missing companyName", None);
    };
    let Some(responses) = req.params.get("responses").cloned() else {
        return err(&req.id, "bad_params", "missing responses", None);
    };
    let district = optional_str(req, "district")
        .or_else(|| auth.as_ref().and_then(|a| a.district.clone()));
    let email = optional_str(req, "email").or_else(|| auth.as_ref().map(|a| a.email.clone()));

    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match records::submit_survey(
        conn,
        &company_name,
        district.as_deref(),
        email.as_deref(),
        responses,
    ) {
        Ok(sub) => {
            tracing::info!(company = %sub.company_slug, "employer survey submitted");
            ok(&req.id, json!({ "submission": sub }))
        }
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> Value {
    let auth = match require_mode(state, req, AdminMode::AggregateDemand) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let district = match scoped_district(req, &auth) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let slug = optional_str(req, "companySlug")
        .or_else(|| optional_str(req, "companyName").map(|n| slugify(&n)));
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match records::list_surveys(conn, slug.as_deref(), district.as_deref()) {
        Ok(rows) => ok(&req.id, json!({ "submissions": rows })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "survey.submit" => Some(handle_submit(state, req)),
        "survey.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
