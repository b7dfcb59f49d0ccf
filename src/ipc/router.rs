use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type Handler = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const HANDLERS: &[Handler] = &[
    handlers::core::try_handle,
    handlers::auth::try_handle,
    handlers::data::try_handle,
    handlers::search::try_handle,
    handlers::nav::try_handle,
    handlers::analytics::try_handle,
    handlers::seed::try_handle,
    handlers::export::try_handle,
    handlers::plans::try_handle,
    handlers::records::try_handle,
    handlers::survey::try_handle,
    handlers::companies::try_handle,
];

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    for handler in HANDLERS {
        if let Some(resp) = handler(state, req) {
            return resp;
        }
    }
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let span = tracing::info_span!("request", id = %req.id, method = %req.method);
    let _enter = span.enter();

    let resp = dispatch(state, &req);
    if resp.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        tracing::warn!(
            code = resp
                .pointer("/error/code")
                .and_then(|v| v.as_str())
                .unwrap_or(""),
            message = resp
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .unwrap_or(""),
            "request failed"
        );
    } else {
        tracing::debug!("request ok");
    }
    resp
}
