use crate::analytics::gap_rows;
use crate::export::{self, ReportKind};
use crate::filters::{apply_filters, FilterState};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{dashboard_user, filters_param, optional_str, required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::seed::sha256_hex;
use serde_json::{json, Value};
use std::path::PathBuf;

const EXPORT_DIR: &str = "exports";

fn report_bytes(
    state: &AppState,
    kind: ReportKind,
    filters: &FilterState,
    sector: Option<&str>,
) -> anyhow::Result<Vec<u8>> {
    let data = state.session.data();
    let scoped = apply_filters(data.institutions(), filters);
    let demand = data
        .demand()
        .iter()
        .filter(|d| sector.map_or(true, |s| d.sector.trim().eq_ignore_ascii_case(s)))
        .cloned()
        .collect::<Vec<_>>();
    match kind {
        ReportKind::Institutions => export::institutions_csv(&scoped),
        ReportKind::Demand => export::demand_csv(&demand),
        ReportKind::Gap => export::gap_csv(&gap_rows(&scoped, &demand)),
    }
}

/// `params.path`, or a file under the workspace's export directory.
fn out_path(state: &AppState, req: &Request, default_name: &str) -> Result<PathBuf, Value> {
    if let Some(p) = optional_str(req, "path") {
        return Ok(PathBuf::from(p));
    }
    state
        .workspace
        .as_ref()
        .map(|ws| ws.join(EXPORT_DIR).join(default_name))
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = dashboard_user(state, req) {
        return e;
    }
    let kind_raw = match required_str(req, "kind") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(kind) = ReportKind::parse(&kind_raw) else {
        return err(
            &req.id,
            "bad_params",
            "kind must be one of: institutions, demand, gap",
            Some(json!({ "kind": kind_raw })),
        );
    };
    let filters = match filters_param(req) {
        Ok(f) => f,
        Err(e) => return e,
    };
    let sector = optional_str(req, "sector");
    let path = match out_path(state, req, kind.file_name()) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let bytes = match report_bytes(state, kind, &filters, sector.as_deref()) {
        Ok(b) => b,
        Err(e) => return err(&req.id, "io_failed", format!("{e:#}"), None),
    };
    if let Err(e) = export::write_file(&path, &bytes) {
        return err(&req.id, "io_failed", format!("{e:#}"), None);
    }
    tracing::info!(path = %path.to_string_lossy(), bytes = bytes.len(), "csv exported");
    ok(
        &req.id,
        json!({
            "path": path.to_string_lossy(),
            "bytes": bytes.len(),
            "sha256": sha256_hex(&bytes),
        }),
    )
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> Value {
    let auth = match dashboard_user(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let filters = match filters_param(req) {
        Ok(f) => f,
        Err(e) => return e,
    };
    let sector = optional_str(req, "sector");
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let path = match out_path(state, req, &format!("districtd-report-{stamp}.zip")) {
        Ok(p) => p,
        Err(e) => return e,
    };

    let mut entries = Vec::new();
    for kind in ReportKind::ALL {
        match report_bytes(state, kind, &filters, sector.as_deref()) {
            Ok(bytes) => entries.push((kind.file_name().to_string(), bytes)),
            Err(e) => return err(&req.id, "io_failed", format!("{e:#}"), None),
        }
    }
    match serde_json::to_vec_pretty(&filters) {
        Ok(bytes) => entries.push(("filters.json".to_string(), bytes)),
        Err(e) => return err(&req.id, "internal", e.to_string(), None),
    }

    match export::export_report_bundle(&path, auth.district.as_deref(), &entries) {
        Ok(summary) => {
            tracing::info!(
                path = %path.to_string_lossy(),
                entries = summary.entries.len(),
                "report bundle exported"
            );
            match to_value(req, &summary) {
                Ok(mut v) => {
                    v["path"] = json!(path.to_string_lossy());
                    ok(&req.id, v)
                }
                Err(e) => e,
            }
        }
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

fn handle_export_verify(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = dashboard_user(state, req) {
        return e;
    }
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    match export::verify_report_bundle(&path) {
        Ok(check) => match to_value(req, &check) {
            Ok(v) => ok(&req.id, v),
            Err(e) => e,
        },
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "export.csv" => Some(handle_export_csv(state, req)),
        "export.bundle" => Some(handle_export_bundle(state, req)),
        "export.verify" => Some(handle_export_verify(state, req)),
        _ => None,
    }
}
