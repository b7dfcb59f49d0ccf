use crate::auth::{self, AuthError, NewUser};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, nav_error, optional_str, required_str, require_super_admin, signed_in,
};
use crate::ipc::types::{AppState, Request};
use crate::nav::{Role, Route};
use serde_json::{json, Value};

fn auth_error(req: &Request, e: &AuthError) -> Value {
    err(&req.id, e.code(), e.to_string(), None)
}

fn session_view(state: &AppState) -> Value {
    let screen = state.session.screen();
    json!({
        "user": state.session.auth(),
        "nav": state.session.nav(),
        "route": Route::for_screen(&screen).path(),
        "screen": screen,
        "menu": state.session.auth().map(|a| a.role.menu()),
    })
}

fn handle_login(state: &mut AppState, req: &Request) -> Value {
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user = match auth::authenticate(conn, &email, &password) {
        Ok(u) => u,
        Err(e) => return auth_error(req, &e),
    };
    let mut ctx = user.into_context();
    if ctx.role == Role::SuperAdmin && ctx.district.is_none() {
        ctx.district = state.config.auth.default_district.clone();
    }
    tracing::info!(user = %ctx.email, role = ctx.role.as_str(), "signed in");
    state.session.sign_in(ctx);
    ok(&req.id, session_view(state))
}

fn handle_logout(state: &mut AppState, req: &Request) -> Value {
    if let Some(a) = state.session.auth() {
        tracing::info!(user = %a.email, "signed out");
    }
    state.session.sign_out();
    ok(&req.id, session_view(state))
}

fn handle_session(state: &mut AppState, req: &Request) -> Value {
    ok(&req.id, session_view(state))
}

fn handle_select_district(state: &mut AppState, req: &Request) -> Value {
    let district = match required_str(req, "district") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = state.session.select_district(&district) {
        return nav_error(req, &e);
    }
    ok(&req.id, session_view(state))
}

fn handle_users_create(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let role_raw = match required_str(req, "role") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(role) = Role::parse(&role_raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown role: {role_raw}"),
            Some(json!({ "role": role_raw })),
        );
    };

    // An empty workspace accepts one unauthenticated call to create the
    // first super admin.
    let existing = match auth::count_users(conn) {
        Ok(n) => n,
        Err(e) => return auth_error(req, &e),
    };
    if existing == 0 {
        if role != Role::SuperAdmin {
            return err(
                &req.id,
                "bad_params",
                "the first account must be a super_admin",
                None,
            );
        }
    } else if let Err(e) = require_super_admin(state, req) {
        return e;
    }

    let new_user = NewUser {
        email: match required_str(req, "email") {
            Ok(v) => v,
            Err(e) => return e,
        },
        password: match required_str(req, "password") {
            Ok(v) => v,
            Err(e) => return e,
        },
        role,
        district: optional_str(req, "district"),
        institution_id: optional_str(req, "institutionId"),
        company_name: optional_str(req, "companyName"),
    };
    match auth::create_user(conn, &new_user) {
        Ok(user) => {
            tracing::info!(user = %user.email, role = user.role.as_str(), "account created");
            ok(&req.id, json!({ "user": user, "bootstrap": existing == 0 }))
        }
        Err(e) => auth_error(req, &e),
    }
}

fn handle_users_list(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = require_super_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::list_users(conn) {
        Ok(users) => ok(&req.id, json!({ "users": users })),
        Err(e) => auth_error(req, &e),
    }
}

fn handle_users_delete(state: &mut AppState, req: &Request) -> Value {
    let me = match require_super_admin(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if id == me.user_id {
        return err(&req.id, "conflict", "cannot delete the signed-in account", None);
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::delete_user(conn, &id) {
        Ok(true) => ok(&req.id, json!({ "deleted": id })),
        Ok(false) => err(&req.id, "not_found", format!("user {id} not found"), None),
        Err(e) => auth_error(req, &e),
    }
}

fn handle_users_reset_password(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = require_super_admin(state, req) {
        return e;
    }
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::reset_password(conn, &id, &password) {
        Ok(true) => ok(&req.id, json!({ "id": id })),
        Ok(false) => err(&req.id, "not_found", format!("user {id} not found"), None),
        Err(e) => auth_error(req, &e),
    }
}

fn handle_whoami(state: &mut AppState, req: &Request) -> Value {
    match signed_in(state, req) {
        Ok(a) => ok(&req.id, json!({ "user": a })),
        Err(e) => e,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        "auth.whoami" => Some(handle_whoami(state, req)),
        "auth.selectDistrict" => Some(handle_select_district(state, req)),
        "users.create" => Some(handle_users_create(state, req)),
        "users.list" => Some(handle_users_list(state, req)),
        "users.delete" => Some(handle_users_delete(state, req)),
        "users.resetPassword" => Some(handle_users_reset_password(state, req)),
        _ => None,
    }
}
