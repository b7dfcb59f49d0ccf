mod test_support;

use serde_json::json;
use test_support::{spawn_sidecar, temp_dir};

const DIC_CSV: &str = "\
Name of the Unit,Taluk,Industry,Mobile No,No. of Employees
Mangalore Chemicals,Mangaluru,Fertilisers,9800000001,\"1,200\"
,Puttur,Food Processing,9800000002,12
Karavali Foods,Puttur,Food Processing,9800000003,many
MRPL,Mangaluru,Petrochemicals,9800000004,2000
";

fn statuses(report: &serde_json::Value) -> Vec<String> {
    report["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .map(|r| r["status"].as_str().expect("status").to_string())
        .collect()
}

#[test]
fn seeding_reports_each_row_and_reseeds_as_updates() {
    let workspace = temp_dir("districtd-seed");
    std::fs::write(workspace.join("dic_master_seed_data.csv"), DIC_CSV).expect("write csv");
    let mut s = spawn_sidecar();
    s.bootstrap(&workspace, "Dakshina Kannada");

    let first = s.request_ok("seed.run", json!({}));
    assert_eq!(first["policy"], "best_effort");
    assert_eq!(first["committed"], true);
    assert_eq!(first["inserted"], 2);
    assert_eq!(first["skipped"], 2);
    assert_eq!(first["failed"], 0);
    assert_eq!(statuses(&first), vec!["inserted", "skipped", "skipped", "inserted"]);
    assert_eq!(first["rows"][0]["line"], 2);
    assert!(first["previouslySeededAt"].is_null());

    let companies = s.request_ok("companies.list", json!({}));
    let listed = companies["companies"].as_array().expect("companies");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["companyName"], "Mangalore Chemicals");
    assert_eq!(listed[0]["employeeCount"], 1200);
    assert_eq!(listed[0]["district"], "Dakshina Kannada");

    let again = s.request_ok("seed.run", json!({}));
    assert_eq!(again["inserted"], 0);
    assert_eq!(again["updated"], 2);
    assert!(again["previouslySeededAt"].is_string());
    let companies = s.request_ok("companies.list", json!({}));
    assert_eq!(companies["companies"].as_array().expect("companies").len(), 2);

    let hits = s.request_ok("companies.autofill", json!({ "prefix": "man" }));
    assert_eq!(hits["companies"][0]["companyName"], "Mangalore Chemicals");

    let runs = s.request_ok("seed.runs", json!({}));
    assert_eq!(runs["runs"].as_array().expect("runs").len(), 2);

    s.finish();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn dry_run_and_atomic_leave_the_registry_alone() {
    let workspace = temp_dir("districtd-seed-policies");
    std::fs::write(
        workspace.join("new.csv"),
        "company_name,district\nUdupi Cashews,Udupi\n",
    )
    .expect("write csv");
    let mut bad = b"company_name,district\nCoastal Boats,Udupi\n".to_vec();
    bad.extend_from_slice(b"\xff\xfe broken,Udupi\n");
    std::fs::write(workspace.join("bad.csv"), bad).expect("write bad csv");
    std::fs::write(workspace.join("headless.csv"), "foo,bar\n1,2\n").expect("write headless csv");

    let mut s = spawn_sidecar();
    s.bootstrap(&workspace, "Udupi");

    let dry = s.request_ok("seed.run", json!({ "path": "new.csv", "policy": "dry_run" }));
    assert_eq!(dry["committed"], false);
    assert_eq!(dry["inserted"], 1);
    let atomic = s.request_ok("seed.run", json!({ "path": "bad.csv", "policy": "atomic" }));
    assert_eq!(atomic["committed"], false);
    assert_eq!(atomic["failed"], 1);

    let companies = s.request_ok("companies.list", json!({}));
    assert!(companies["companies"].as_array().expect("companies").is_empty());

    // Dry runs are not recorded; the rolled-back atomic run is.
    let runs = s.request_ok("seed.runs", json!({}));
    assert_eq!(runs["runs"].as_array().expect("runs").len(), 1);
    assert_eq!(runs["runs"][0]["committed"], false);

    assert_eq!(
        s.request_err("seed.run", json!({ "path": "headless.csv" })),
        "bad_params"
    );
    assert_eq!(
        s.request_err("seed.run", json!({ "path": "missing.csv" })),
        "io_failed"
    );
    assert_eq!(
        s.request_err("seed.run", json!({ "path": "new.csv", "policy": "sometimes" })),
        "bad_params"
    );

    s.finish();
    let _ = std::fs::remove_dir_all(workspace);
}
