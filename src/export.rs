use crate::analytics::GapRow;
use crate::model::{join_skills, IndustryDemand, Institution};
use crate::seed::sha256_hex;
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
pub const REPORT_BUNDLE_FORMAT: &str = "districtd-report-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Institutions,
    Demand,
    Gap,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Institutions, ReportKind::Demand, ReportKind::Gap];

    pub fn parse(s: &str) -> Option<ReportKind> {
        match s {
            "institutions" => Some(ReportKind::Institutions),
            "demand" => Some(ReportKind::Demand),
            "gap" => Some(ReportKind::Gap),
            _ => None,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ReportKind::Institutions => "institutions.csv",
            ReportKind::Demand => "industry_demand.csv",
            ReportKind::Gap => "skill_gap.csv",
        }
    }
}

fn finish_csv(w: csv::Writer<Vec<u8>>) -> anyhow::Result<Vec<u8>> {
    w.into_inner()
        .map_err(|e| anyhow!("failed to flush csv: {}", e.error()))
}

/// List columns are joined with `;` so a cell never needs quoting for commas.
pub fn institutions_csv(rows: &[Institution]) -> anyhow::Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record([
        "id", "name", "category", "area", "lat", "lng", "domains", "tools", "degrees", "coe",
        "intake", "placed",
    ])?;
    for i in rows {
        w.write_record([
            i.id.clone(),
            i.name.clone(),
            i.category.clone(),
            i.location.area.clone(),
            i.location.lat.to_string(),
            i.location.lng.to_string(),
            i.domains.join("; "),
            i.tools.join("; "),
            i.degrees.join("; "),
            if i.coe { "yes" } else { "no" }.to_string(),
            i.intake.to_string(),
            i.placed.to_string(),
        ])?;
    }
    finish_csv(w)
}

pub fn demand_csv(rows: &[IndustryDemand]) -> anyhow::Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record([
        "id",
        "company_name",
        "sector",
        "company_type",
        "skills_required",
        "demand_count",
    ])?;
    for d in rows {
        w.write_record([
            d.id.clone(),
            d.company_name.clone(),
            d.sector.clone(),
            d.company_type.clone(),
            join_skills(&d.skills_required),
            d.demand_count.to_string(),
        ])?;
    }
    finish_csv(w)
}

pub fn gap_csv(rows: &[GapRow]) -> anyhow::Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["skill", "demand", "supply", "gap"])?;
    for g in rows {
        w.write_record([
            g.skill.clone(),
            g.demand.to_string(),
            g.supply.to_string(),
            g.gap.to_string(),
        ])?;
    }
    finish_csv(w)
}

pub fn write_file(out_path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(out_path, bytes)
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub path: String,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSummary {
    pub bundle_format: String,
    pub exported_at: String,
    pub entries: Vec<ManifestEntry>,
}

/// Writes each entry into a zip with a `manifest.json` listing sizes and
/// SHA-256 digests.
pub fn export_report_bundle(
    out_path: &Path,
    district: Option<&str>,
    entries: &[(String, Vec<u8>)],
) -> anyhow::Result<BundleSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let listed = entries
        .iter()
        .map(|(path, bytes)| ManifestEntry {
            path: path.clone(),
            bytes: bytes.len() as u64,
            sha256: sha256_hex(bytes),
        })
        .collect::<Vec<_>>();
    let exported_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let manifest = json!({
        "format": REPORT_BUNDLE_FORMAT,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "district": district,
        "entries": listed,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (path, bytes) in entries {
        zip.start_file(path.as_str(), opts)
            .with_context(|| format!("failed to start entry {path}"))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write entry {path}"))?;
    }
    zip.finish().context("failed to finalize zip bundle")?;

    Ok(BundleSummary {
        bundle_format: REPORT_BUNDLE_FORMAT.to_string(),
        exported_at,
        entries: listed,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleCheck {
    pub bundle_format: String,
    pub verified: usize,
    pub mismatched: Vec<String>,
}

/// Re-reads a bundle and recomputes every listed digest.
pub fn verify_report_bundle(in_path: &Path) -> anyhow::Result<BundleCheck> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != REPORT_BUNDLE_FORMAT {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }
    let listed: Vec<ManifestEntry> = serde_json::from_value(
        manifest.get("entries").cloned().unwrap_or_else(|| json!([])),
    )
    .context("manifest entries are malformed")?;

    let mut verified = 0;
    let mut mismatched = Vec::new();
    for entry in listed {
        let mut bytes = Vec::new();
        match archive.by_name(&entry.path) {
            Ok(mut f) => {
                f.read_to_end(&mut bytes)
                    .with_context(|| format!("failed to read entry {}", entry.path))?;
            }
            Err(_) => {
                mismatched.push(entry.path);
                continue;
            }
        }
        if sha256_hex(&bytes) == entry.sha256 {
            verified += 1;
        } else {
            mismatched.push(entry.path);
        }
    }
    Ok(BundleCheck {
        bundle_format: format.to_string(),
        verified,
        mismatched,
    })
}
