mod test_support;

use serde_json::json;
use test_support::{spawn_sidecar, temp_dir, ADMIN_EMAIL, ADMIN_PASSWORD};

#[test]
fn router_follows_sign_in_state_and_role() {
    let workspace = temp_dir("districtd-auth-nav");
    let mut s = spawn_sidecar();
    s.request_ok("workspace.select", json!({ "path": workspace.to_string_lossy() }));

    let anon = s.request_ok("nav.resolve", json!({}));
    assert_eq!(anon["screen"], json!({ "screen": "login" }));
    assert_eq!(anon["route"], "/login");
    assert_eq!(
        s.request_err("nav.navigate", json!({ "target": { "kind": "view", "value": "map" } })),
        "unauthenticated"
    );
    assert_eq!(s.request_err("institutions.list", json!({})), "unauthenticated");

    // The first account must be a super admin.
    assert_eq!(
        s.request_err(
            "users.create",
            json!({ "email": "x@y.in", "password": "long-enough", "role": "trainee", "district": "Udupi" })
        ),
        "bad_params"
    );
    s.request_ok(
        "users.create",
        json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD, "role": "super_admin" }),
    );
    assert_eq!(
        s.request_err(
            "users.create",
            json!({ "email": "x@y.in", "password": "long-enough", "role": "super_admin" })
        ),
        "unauthenticated"
    );
    assert_eq!(
        s.request_err("auth.login", json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
        "unauthenticated"
    );

    let admin = s.request_ok(
        "auth.login",
        json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
    );
    assert_eq!(admin["screen"], json!({ "screen": "districtPicker" }));
    assert_eq!(
        s.request_err("nav.navigate", json!({ "path": "/dashboard" })),
        "forbidden"
    );
    let picked = s.request_ok("auth.selectDistrict", json!({ "district": "Udupi" }));
    assert_eq!(picked["screen"], json!({ "screen": "admin", "mode": "lobby", "planId": null }));
    assert_eq!(picked["route"], "/admin/lobby");

    for (email, role, extra) in [
        ("trainee@udupi.in", "trainee", json!({ "district": "Udupi" })),
        ("hr@acme.in", "company", json!({ "companyName": "Acme Tools & Dies" })),
        ("dc@udupi.in", "district_admin", json!({ "district": "Udupi" })),
    ] {
        let mut params = json!({ "email": email, "password": "password-123", "role": role });
        for (k, v) in extra.as_object().expect("object") {
            params[k] = v.clone();
        }
        s.request_ok("users.create", params);
    }
    let users = s.request_ok("users.list", json!({}));
    assert_eq!(users["users"].as_array().expect("users").len(), 4);

    // Trainee: a narrow set of views, no seeder.
    s.request_ok("auth.logout", json!({}));
    let trainee = s.request_ok(
        "auth.login",
        json!({ "email": "trainee@udupi.in", "password": "password-123" }),
    );
    assert_eq!(
        trainee["menu"]["adminModes"],
        json!(["lobby", "dashboard", "portal", "trainee-details"])
    );
    assert!(!trainee["menu"]["views"]
        .as_array()
        .expect("views")
        .contains(&json!("credential-manager")));
    assert_eq!(
        s.request_err("nav.navigate", json!({ "target": { "kind": "admin", "value": "dic-seeder" } })),
        "forbidden"
    );
    let coe = s.request_ok("nav.navigate", json!({ "path": "/coe" }));
    assert_eq!(coe["screen"], json!({ "screen": "view", "view": "coe" }));
    assert_eq!(coe["route"], "/coe");
    assert_eq!(
        s.request_err("nav.navigate", json!({ "path": "/credential-manager" })),
        "forbidden"
    );
    // A rejected transition leaves the screen where it was.
    let still = s.request_ok("nav.resolve", json!({}));
    assert_eq!(still["route"], "/coe");
    assert_eq!(s.request_err("seed.run", json!({})), "forbidden");
    assert_eq!(s.request_err("auth.selectDistrict", json!({ "district": "Mysuru" })), "forbidden");

    // Company: always the survey, nothing else.
    s.request_ok("auth.logout", json!({}));
    let company = s.request_ok(
        "auth.login",
        json!({ "email": "hr@acme.in", "password": "password-123" }),
    );
    assert_eq!(
        company["screen"],
        json!({ "screen": "companySurvey", "companySlug": "acme-tools-dies" })
    );
    assert_eq!(company["route"], "/company-survey/acme-tools-dies");
    assert_eq!(s.request_err("institutions.list", json!({})), "forbidden");
    assert_eq!(
        s.request_err("nav.navigate", json!({ "path": "/map" })),
        "forbidden"
    );
    let sub = s.request_ok(
        "survey.submit",
        json!({ "companyName": "Someone Else", "responses": { "hiring": true, "roles": ["Fitter"] } }),
    );
    assert_eq!(sub["submission"]["companySlug"], "acme-tools-dies");

    // District admin: full dashboard, no credential manager, pinned district.
    s.request_ok("auth.logout", json!({}));
    s.request_ok(
        "auth.login",
        json!({ "email": "dc@udupi.in", "password": "password-123" }),
    );
    let plan_list = s.request_ok("nav.navigate", json!({ "path": "/admin/plan-list" }));
    assert_eq!(plan_list["route"], "/admin/plan-list");
    assert_eq!(s.request_err("users.list", json!({})), "forbidden");
    assert_eq!(
        s.request_err("nav.navigate", json!({ "target": { "kind": "admin", "value": "plan-edit" } })),
        "bad_params"
    );
    let surveys = s.request_ok("survey.list", json!({}));
    assert_eq!(surveys["submissions"].as_array().expect("list").len(), 0);
    assert_eq!(s.request_err("plans.list", json!({ "district": "Mysuru" })), "forbidden");

    let out = s.request_ok("auth.logout", json!({}));
    assert_eq!(out["route"], "/login");
    assert!(out["menu"].is_null());

    s.finish();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn routes_parse_and_print() {
    let workspace = temp_dir("districtd-routes");
    let mut s = spawn_sidecar();

    let plan = s.request_ok("nav.route", json!({ "path": "/admin/plan/p-42" }));
    assert_eq!(plan["path"], "/admin/plan/p-42");
    assert_eq!(plan["target"], json!({ "kind": "editPlan", "value": "p-42" }));

    let survey = s.request_ok("nav.route", json!({ "path": "/company-survey/acme?ref=mail" }));
    assert_eq!(survey["path"], "/company-survey/acme");
    assert!(survey["target"].is_null());

    let view = s.request_ok("nav.route", json!({ "path": "/skills-intel/" }));
    assert_eq!(view["path"], "/skills-intel");
    assert_eq!(view["target"], json!({ "kind": "view", "value": "skills-intel" }));

    assert_eq!(s.request_err("nav.route", json!({ "path": "/admin/unknown-mode" })), "not_found");
    assert_eq!(s.request_err("nav.route", json!({ "path": "/a/b/c/d" })), "not_found");

    s.finish();
    let _ = std::fs::remove_dir_all(workspace);
}
