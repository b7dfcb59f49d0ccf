use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::filters::FilterState;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::nav::{AdminMode, NavError, Role};
use crate::session::AuthContext;

pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Present, a string, and not blank.
pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn optional_bool(req: &Request, key: &str) -> bool {
    req.params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn param<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, Value> {
    let raw = req
        .params
        .get(key)
        .cloned()
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))?;
    serde_json::from_value(raw)
        .map_err(|e| err(&req.id, "bad_params", format!("invalid {}: {}", key, e), None))
}

pub fn param_or_default<T: DeserializeOwned + Default>(req: &Request, key: &str) -> Result<T, Value> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(_) => param(req, key),
    }
}

/// `params.filters`, checked against the fixed vocabularies.
pub fn filters_param(req: &Request) -> Result<FilterState, Value> {
    let filters: FilterState = param_or_default(req, "filters")?;
    filters.validate().map_err(|e| {
        err(
            &req.id,
            "bad_params",
            e.to_string(),
            Some(json!({ "filters": req.params.get("filters") })),
        )
    })?;
    Ok(filters)
}

pub fn nav_error(req: &Request, e: &NavError) -> Value {
    let code = match e {
        NavError::NotAuthenticated => "unauthenticated",
        NavError::DistrictRequired | NavError::Forbidden { .. } => "forbidden",
        NavError::PlanIdRequired => "bad_params",
    };
    err(&req.id, code, e.to_string(), None)
}

pub fn signed_in(state: &AppState, req: &Request) -> Result<AuthContext, Value> {
    state
        .session
        .auth()
        .cloned()
        .ok_or_else(|| err(&req.id, "unauthenticated", "sign in first", None))
}

/// Any signed-in role that can see the dashboard; company accounts only
/// reach the survey.
pub fn dashboard_user(state: &AppState, req: &Request) -> Result<AuthContext, Value> {
    let auth = signed_in(state, req)?;
    if auth.role == Role::Company {
        return Err(err(
            &req.id,
            "forbidden",
            "company accounts may only use the survey",
            None,
        ));
    }
    Ok(auth)
}

pub fn require_mode(state: &AppState, req: &Request, mode: AdminMode) -> Result<AuthContext, Value> {
    let auth = signed_in(state, req)?;
    if !auth.role.allows_mode(mode) {
        return Err(nav_error(
            req,
            &NavError::Forbidden {
                role: auth.role.as_str(),
                target: format!("mode {}", mode.slug()),
            },
        ));
    }
    Ok(auth)
}

pub fn require_super_admin(state: &AppState, req: &Request) -> Result<AuthContext, Value> {
    let auth = signed_in(state, req)?;
    if auth.role != Role::SuperAdmin {
        return Err(err(
            &req.id,
            "forbidden",
            format!("{} may not manage credentials", auth.role.as_str()),
            None,
        ));
    }
    Ok(auth)
}

/// District a read or write is scoped to. Super admins may name any
/// district (or none, meaning all); everyone else is pinned to their own.
pub fn scoped_district(req: &Request, auth: &AuthContext) -> Result<Option<String>, Value> {
    let requested = optional_str(req, "district");
    if auth.role == Role::SuperAdmin {
        return Ok(requested.or_else(|| auth.district.clone()));
    }
    match (requested, auth.district.as_deref()) {
        (Some(r), Some(own)) if r != own => Err(err(
            &req.id,
            "forbidden",
            format!("{} may only access {}", auth.role.as_str(), own),
            None,
        )),
        (_, own) => Ok(own.map(str::to_string)),
    }
}

/// Whether a stored row's district is visible to this user.
pub fn district_visible(auth: &AuthContext, district: &str) -> bool {
    auth.role == Role::SuperAdmin || auth.district.as_deref() == Some(district)
}

pub fn to_value<T: serde::Serialize>(req: &Request, v: &T) -> Result<Value, Value> {
    serde_json::to_value(v).map_err(|e| err(&req.id, "internal", e.to_string(), None))
}
