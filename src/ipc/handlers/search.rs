use crate::filters::{apply_filters, filter_options};
use crate::ipc::error::ok;
use crate::ipc::helpers::{dashboard_user, filters_param, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::search::{get_search_suggestions, highlight_match};
use serde_json::{json, Value};

fn handle_filters_apply(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = dashboard_user(state, req) {
        return e;
    }
    let filters = match filters_param(req) {
        Ok(f) => f,
        Err(e) => return e,
    };
    let all = state.session.data().institutions();
    let matched = apply_filters(all, &filters);
    ok(
        &req.id,
        json!({
            "total": all.len(),
            "matched": matched.len(),
            "active": !filters.is_empty(),
            "institutions": matched,
        }),
    )
}

fn handle_filters_options(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = dashboard_user(state, req) {
        return e;
    }
    ok(
        &req.id,
        json!({ "options": filter_options(state.session.data().institutions()) }),
    )
}

fn handle_suggest(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = dashboard_user(state, req) {
        return e;
    }
    let query = req
        .params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let filters = match filters_param(req) {
        Ok(f) => f,
        Err(e) => return e,
    };
    let sector = optional_str(req, "sector");
    let data = state.session.data();
    let suggestions = get_search_suggestions(
        query,
        data.institutions(),
        data.demand(),
        &filters,
        sector.as_deref(),
    );
    let rows = suggestions
        .iter()
        .map(|s| {
            json!({
                "suggestion": s,
                "highlight": highlight_match(&s.label, query),
            })
        })
        .collect::<Vec<_>>();
    ok(&req.id, json!({ "query": query.trim(), "suggestions": rows }))
}

fn handle_highlight(_state: &mut AppState, req: &Request) -> Value {
    let label = match required_str(req, "label") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let query = match required_str(req, "query") {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!({ "highlight": highlight_match(&label, &query) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "filters.apply" => Some(handle_filters_apply(state, req)),
        "filters.options" => Some(handle_filters_options(state, req)),
        "search.suggest" => Some(handle_suggest(state, req)),
        "search.highlight" => Some(handle_highlight(state, req)),
        _ => None,
    }
}
