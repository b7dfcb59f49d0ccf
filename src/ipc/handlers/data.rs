use crate::db;
use crate::filters::apply_filters;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    dashboard_user, db_conn, filters_param, optional_str, param, required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{split_skills, IndustryDemand, Institution};
use crate::nav::Role;
use crate::session::AuthContext;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

fn may_edit_institution(auth: &AuthContext, id: &str) -> bool {
    match auth.role {
        Role::SuperAdmin | Role::DistrictAdmin => true,
        Role::Institution => auth.institution_id.as_deref() == Some(id),
        Role::Trainee | Role::Company => false,
    }
}

fn may_edit_demand(auth: &AuthContext) -> bool {
    matches!(auth.role, Role::SuperAdmin | Role::DistrictAdmin)
}

fn forbidden(req: &Request, auth: &AuthContext, what: &str) -> Value {
    err(
        &req.id,
        "forbidden",
        format!("{} may not edit {}", auth.role.as_str(), what),
        None,
    )
}

fn reload(state: &mut AppState, req: &Request) -> Result<(), Value> {
    state
        .reload_data()
        .map_err(|e| err(&req.id, "db_query_failed", format!("{e:#}"), None))
}

fn handle_institutions_list(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = dashboard_user(state, req) {
        return e;
    }
    let filters = match filters_param(req) {
        Ok(f) => f,
        Err(e) => return e,
    };
    let all = state.session.data().institutions();
    let institutions = apply_filters(all, &filters);
    ok(
        &req.id,
        json!({ "total": all.len(), "institutions": institutions }),
    )
}

fn handle_institutions_get(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = dashboard_user(state, req) {
        return e;
    }
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.session.data().institution(&id) {
        Some(inst) => ok(&req.id, json!({ "institution": inst })),
        None => err(&req.id, "not_found", format!("institution {id} not found"), None),
    }
}

fn handle_institutions_upsert(state: &mut AppState, req: &Request) -> Value {
    let auth = match dashboard_user(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let mut inst: Institution = match param(req, "institution") {
        Ok(v) => v,
        Err(e) => return e,
    };
    inst.name = inst.name.trim().to_string();
    inst.category = inst.category.trim().to_string();
    if inst.name.is_empty() || inst.category.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "institution needs a name and a category",
            None,
        );
    }
    if inst.placed > inst.intake {
        return err(
            &req.id,
            "bad_params",
            "placed cannot exceed intake",
            Some(json!({ "intake": inst.intake, "placed": inst.placed })),
        );
    }
    if inst.id.trim().is_empty() {
        inst.id = Uuid::new_v4().to_string();
    }
    if !may_edit_institution(&auth, &inst.id) {
        return forbidden(req, &auth, "this institution");
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    if let Err(e) = db::upsert_institution(conn, &inst) {
        return err(&req.id, "db_update_failed", format!("{e:#}"), None);
    }
    if let Err(e) = reload(state, req) {
        return e;
    }
    ok(&req.id, json!({ "institution": inst }))
}

fn handle_institutions_delete(state: &mut AppState, req: &Request) -> Value {
    let auth = match dashboard_user(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    if !matches!(auth.role, Role::SuperAdmin | Role::DistrictAdmin) {
        return forbidden(req, &auth, "institutions");
    }
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match db::delete_institution(conn, &id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", format!("institution {id} not found"), None),
        Err(e) => return err(&req.id, "db_delete_failed", format!("{e:#}"), None),
    }
    if let Err(e) = reload(state, req) {
        return e;
    }
    ok(&req.id, json!({ "deleted": id }))
}

/// Skills arrive either as a list or as the comma-joined column text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SkillsInput {
    List(Vec<String>),
    Joined(String),
}

impl SkillsInput {
    fn into_list(self) -> Vec<String> {
        match self {
            SkillsInput::List(v) => v
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            SkillsInput::Joined(s) => split_skills(&s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemandInput {
    #[serde(default)]
    id: String,
    company_name: String,
    #[serde(default)]
    sector: String,
    #[serde(default)]
    company_type: String,
    skills_required: SkillsInput,
    #[serde(default)]
    demand_count: i64,
}

fn handle_demand_list(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = dashboard_user(state, req) {
        return e;
    }
    let sector = optional_str(req, "sector");
    let demand = state
        .session
        .data()
        .demand()
        .iter()
        .filter(|d| {
            sector
                .as_deref()
                .map_or(true, |s| d.sector.trim().eq_ignore_ascii_case(s))
        })
        .collect::<Vec<_>>();
    ok(&req.id, json!({ "demand": demand }))
}

fn handle_demand_upsert(state: &mut AppState, req: &Request) -> Value {
    let auth = match dashboard_user(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    if !may_edit_demand(&auth) {
        return forbidden(req, &auth, "industry demand");
    }
    let input: DemandInput = match param(req, "demand") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let company_name = input.company_name.trim().to_string();
    if company_name.is_empty() {
        return err(&req.id, "bad_params", "demand needs a companyName", None);
    }
    if input.demand_count < 0 {
        return err(&req.id, "bad_params", "demandCount cannot be negative", None);
    }
    let demand = IndustryDemand {
        id: if input.id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            input.id.trim().to_string()
        },
        company_name,
        sector: input.sector.trim().to_string(),
        company_type: input.company_type.trim().to_string(),
        skills_required: input.skills_required.into_list(),
        demand_count: input.demand_count,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    if let Err(e) = db::upsert_demand(conn, &demand) {
        return err(&req.id, "db_update_failed", format!("{e:#}"), None);
    }
    if let Err(e) = reload(state, req) {
        return e;
    }
    ok(&req.id, json!({ "demand": demand }))
}

fn handle_demand_delete(state: &mut AppState, req: &Request) -> Value {
    let auth = match dashboard_user(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    if !may_edit_demand(&auth) {
        return forbidden(req, &auth, "industry demand");
    }
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match db::delete_demand(conn, &id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", format!("demand {id} not found"), None),
        Err(e) => return err(&req.id, "db_delete_failed", format!("{e:#}"), None),
    }
    if let Err(e) = reload(state, req) {
        return e;
    }
    ok(&req.id, json!({ "deleted": id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "institutions.list" => Some(handle_institutions_list(state, req)),
        "institutions.get" => Some(handle_institutions_get(state, req)),
        "institutions.upsert" => Some(handle_institutions_upsert(state, req)),
        "institutions.delete" => Some(handle_institutions_delete(state, req)),
        "demand.list" => Some(handle_demand_list(state, req)),
        "demand.upsert" => Some(handle_demand_upsert(state, req)),
        "demand.delete" => Some(handle_demand_delete(state, req)),
        _ => None,
    }
}
