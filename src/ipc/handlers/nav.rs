use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{nav_error, optional_str, param, required_str};
use crate::ipc::types::{AppState, Request};
use crate::nav::{NavTarget, Route};
use serde_json::{json, Value};

fn current(state: &AppState) -> Value {
    let screen = state.session.screen();
    json!({
        "nav": state.session.nav(),
        "route": Route::for_screen(&screen).path(),
        "screen": screen,
    })
}

fn handle_resolve(state: &mut AppState, req: &Request) -> Value {
    ok(&req.id, current(state))
}

/// Accepts either `target` (a tagged nav target) or `path` (a URL path).
/// Paths without a nav target (home, login, survey) just re-resolve.
fn handle_navigate(state: &mut AppState, req: &Request) -> Value {
    let target = if let Some(path) = optional_str(req, "path") {
        match Route::parse(&path) {
            Ok(route) => route.target(),
            Err(e) => return err(&req.id, "not_found", e.to_string(), None),
        }
    } else {
        match param::<NavTarget>(req, "target") {
            Ok(t) => Some(t),
            Err(e) => return e,
        }
    };
    if let Some(target) = target {
        if let Err(e) = state.session.navigate(target) {
            return nav_error(req, &e);
        }
    }
    ok(&req.id, current(state))
}

fn handle_route(_state: &mut AppState, req: &Request) -> Value {
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match Route::parse(&path) {
        Ok(route) => ok(
            &req.id,
            json!({
                "path": route.path(),
                "target": route.target(),
                "route": route,
            }),
        ),
        Err(e) => err(&req.id, "not_found", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "nav.resolve" => Some(handle_resolve(state, req)),
        "nav.navigate" => Some(handle_navigate(state, req)),
        "nav.route" => Some(handle_route(state, req)),
        _ => None,
    }
}
