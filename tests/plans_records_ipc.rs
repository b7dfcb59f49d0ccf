mod test_support;

use serde_json::json;
use test_support::{spawn_sidecar, temp_dir};

#[test]
fn plan_lifecycle_over_ipc() {
    let workspace = temp_dir("districtd-plans-ipc");
    let mut s = spawn_sidecar();
    s.bootstrap(&workspace, "Udupi");

    let created = s.request_ok(
        "plans.create",
        json!({ "title": "District Skill Plan", "fiscalYear": "2025-26", "body": { "sections": [] } }),
    );
    let plan_id = created["plan"]["id"].as_str().expect("plan id").to_string();
    assert_eq!(created["plan"]["district"], "Udupi");
    assert_eq!(created["plan"]["status"], "draft");

    let opened = s.request_ok("nav.navigate", json!({ "path": format!("/admin/plan/{}", plan_id) }));
    assert_eq!(opened["screen"]["mode"], "plan-edit");
    assert_eq!(opened["screen"]["planId"], plan_id.as_str());
    assert_eq!(opened["route"], format!("/admin/plan/{}", plan_id));

    let edited = s.request_ok(
        "plans.update",
        json!({ "id": plan_id, "patch": { "body": { "sections": ["ITI seats"] }, "status": "submitted" } }),
    );
    assert_eq!(edited["plan"]["status"], "submitted");
    assert_eq!(edited["plan"]["body"]["sections"][0], "ITI seats");

    s.request_ok(
        "plans.update",
        json!({ "id": plan_id, "patch": { "status": "approved" } }),
    );
    assert_eq!(
        s.request_err("plans.update", json!({ "id": plan_id, "patch": { "title": "Late edit" } })),
        "conflict"
    );

    let other = s.request_ok(
        "plans.create",
        json!({ "title": "Mysuru plan", "district": "Mysuru" }),
    );
    let udupi = s.request_ok("plans.list", json!({}));
    assert_eq!(udupi["plans"].as_array().expect("plans").len(), 1);
    let mysuru = s.request_ok("plans.list", json!({ "district": "Mysuru" }));
    assert_eq!(mysuru["plans"].as_array().expect("plans").len(), 1);

    // A district admin cannot see another district's plan.
    s.request_ok(
        "users.create",
        json!({ "email": "dc@udupi.in", "password": "password-123", "role": "district_admin", "district": "Udupi" }),
    );
    s.request_ok("auth.logout", json!({}));
    s.request_ok("auth.login", json!({ "email": "dc@udupi.in", "password": "password-123" }));
    let other_id = other["plan"]["id"].as_str().expect("id");
    assert_eq!(s.request_err("plans.get", json!({ "id": other_id })), "not_found");
    assert_eq!(s.request_err("plans.delete", json!({ "id": other_id })), "not_found");
    s.request_ok("plans.get", json!({ "id": plan_id }));
    s.request_ok("plans.delete", json!({ "id": plan_id }));
    assert_eq!(s.request_err("plans.get", json!({ "id": plan_id })), "not_found");

    s.finish();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn record_tables_are_scoped_and_whitelisted() {
    let workspace = temp_dir("districtd-records-ipc");
    let mut s = spawn_sidecar();
    s.bootstrap(&workspace, "Udupi");

    assert_eq!(
        s.request_err("records.list", json!({ "table": "users" })),
        "bad_params"
    );
    let scheme = s.request_ok(
        "records.upsert",
        json!({ "table": "district_schemes", "record": { "district": "Udupi", "name": "PMKVY 4.0", "data": { "targets": 500 } } }),
    );
    let scheme_id = scheme["record"]["id"].as_str().expect("id").to_string();
    let state_row = s.request_ok(
        "records.upsert",
        json!({ "table": "state_iti_stats", "record": { "district": "Udupi", "name": "Karnataka 2024", "data": { "itis": 1400 } } }),
    );
    let state_id = state_row["record"]["id"].as_str().expect("id").to_string();
    s.request_ok(
        "records.upsert",
        json!({ "table": "district_training_centers", "record": { "district": "Mysuru", "name": "GTTC Mysuru" } }),
    );

    s.request_ok(
        "users.create",
        json!({ "email": "dc@udupi.in", "password": "password-123", "role": "district_admin", "district": "Udupi" }),
    );
    s.request_ok("auth.logout", json!({}));
    s.request_ok("auth.login", json!({ "email": "dc@udupi.in", "password": "password-123" }));

    let centers = s.request_ok("records.list", json!({ "table": "district_training_centers" }));
    assert!(centers["records"].as_array().expect("records").is_empty());
    let state_stats = s.request_ok("records.list", json!({ "table": "state_iti_stats" }));
    assert_eq!(state_stats["records"].as_array().expect("records").len(), 1);
    assert_eq!(
        s.request_err(
            "records.upsert",
            json!({ "table": "state_iti_stats", "record": { "name": "edit" } })
        ),
        "forbidden"
    );
    // Deleting is an edit too, even when the row carries the admin's district.
    assert_eq!(
        s.request_err(
            "records.delete",
            json!({ "table": "state_iti_stats", "id": state_id })
        ),
        "forbidden"
    );
    let state_stats = s.request_ok("records.list", json!({ "table": "state_iti_stats" }));
    assert_eq!(state_stats["records"].as_array().expect("records").len(), 1);

    // The district on the record is forced to the admin's own.
    let pinned = s.request_ok(
        "records.upsert",
        json!({ "table": "district_iti_stats", "record": { "district": "Mysuru", "name": "Govt ITI Udupi", "data": { "seats": 320 } } }),
    );
    assert_eq!(pinned["record"]["district"], "Udupi");

    let updated = s.request_ok(
        "records.upsert",
        json!({ "table": "district_schemes", "record": { "id": scheme_id, "name": "PMKVY 4.0", "data": { "targets": 650 } } }),
    );
    assert_eq!(updated["record"]["data"]["targets"], 650);
    s.request_ok("records.delete", json!({ "table": "district_schemes", "id": scheme_id }));
    assert_eq!(
        s.request_err("records.delete", json!({ "table": "district_schemes", "id": scheme_id })),
        "not_found"
    );

    s.finish();
    let _ = std::fs::remove_dir_all(workspace);
}
