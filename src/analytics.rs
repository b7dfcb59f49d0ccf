use crate::filters::{apply_filters, FilterState};
use crate::model::{IndustryDemand, Institution};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub key: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandPanel {
    pub total_demand: i64,
    pub companies: usize,
    pub by_sector: Vec<Bucket>,
    pub by_company_type: Vec<Bucket>,
    pub by_skill: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyBucket {
    pub key: String,
    pub institutions: usize,
    pub intake: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyPanel {
    pub institutions: usize,
    pub total_intake: i64,
    pub by_category: Vec<SupplyBucket>,
    pub by_domain: Vec<SupplyBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapRow {
    pub skill: String,
    pub demand: i64,
    pub supply: i64,
    /// Positive when demand outstrips supply.
    pub gap: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRow {
    pub category: String,
    pub intake: i64,
    pub placed: i64,
    pub rate_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementPanel {
    pub overall: PlacementRow,
    pub by_category: Vec<PlacementRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoeCentre {
    pub id: String,
    pub name: String,
    pub area: String,
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoePanel {
    pub total: usize,
    pub by_area: Vec<Bucket>,
    pub centres: Vec<CoeCentre>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardModel {
    pub filters: FilterState,
    pub demand: DemandPanel,
    pub supply: SupplyPanel,
    pub gap: Vec<GapRow>,
    pub placement: PlacementPanel,
    pub coe: CoePanel,
}

fn round_1_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Counts are unbounded user input; totals clamp at `i64::MAX`.
fn saturating_total(values: impl IntoIterator<Item = i64>) -> i64 {
    values.into_iter().fold(0i64, i64::saturating_add)
}

fn sorted_buckets(map: BTreeMap<String, i64>) -> Vec<Bucket> {
    let mut out = map
        .into_iter()
        .map(|(key, value)| Bucket { key, value })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    out
}

fn label_or_unknown(s: &str) -> String {
    let t = s.trim();
    if t.is_empty() {
        "Unspecified".to_string()
    } else {
        t.to_string()
    }
}

/// Demand per skill, keyed case-insensitively; the first spelling seen is
/// the display label. A skill listed twice on one record counts once.
fn skill_demand(demand: &[IndustryDemand]) -> Vec<(String, i64)> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, (String, i64)> = HashMap::new();
    for d in demand {
        let mut on_record = HashSet::new();
        for skill in &d.skills_required {
            let key = skill.trim().to_lowercase();
            if key.is_empty() || !on_record.insert(key.clone()) {
                continue;
            }
            let entry = totals.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (skill.trim().to_string(), 0)
            });
            entry.1 = entry.1.saturating_add(d.demand_count);
        }
    }
    order
        .into_iter()
        .filter_map(|k| totals.remove(&k))
        .collect()
}

pub fn demand_panel(demand: &[IndustryDemand], sector: Option<&str>) -> DemandPanel {
    let rows = demand
        .iter()
        .filter(|d| sector.map_or(true, |s| d.sector.trim().eq_ignore_ascii_case(s.trim())))
        .cloned()
        .collect::<Vec<_>>();

    let mut by_sector = BTreeMap::new();
    let mut by_type = BTreeMap::new();
    let mut companies = HashSet::new();
    for d in &rows {
        let sector_total = by_sector.entry(label_or_unknown(&d.sector)).or_insert(0i64);
        *sector_total = sector_total.saturating_add(d.demand_count);
        let type_total = by_type.entry(label_or_unknown(&d.company_type)).or_insert(0i64);
        *type_total = type_total.saturating_add(d.demand_count);
        companies.insert(d.company_name.as_str());
    }
    let mut by_skill = skill_demand(&rows)
        .into_iter()
        .map(|(key, value)| Bucket { key, value })
        .collect::<Vec<_>>();
    by_skill.sort_by(|a, b| b.value.cmp(&a.value));

    DemandPanel {
        total_demand: saturating_total(rows.iter().map(|d| d.demand_count)),
        companies: companies.len(),
        by_sector: sorted_buckets(by_sector),
        by_company_type: sorted_buckets(by_type),
        by_skill,
    }
}

fn supply_buckets<'a, F>(institutions: &'a [Institution], keys: F) -> Vec<SupplyBucket>
where
    F: Fn(&'a Institution) -> Vec<String>,
{
    let mut map: BTreeMap<String, (usize, i64)> = BTreeMap::new();
    for inst in institutions {
        for key in keys(inst) {
            let e = map.entry(key).or_insert((0, 0));
            e.0 += 1;
            e.1 = e.1.saturating_add(i64::from(inst.intake));
        }
    }
    let mut out = map
        .into_iter()
        .map(|(key, (institutions, intake))| SupplyBucket {
            key,
            institutions,
            intake,
        })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| b.intake.cmp(&a.intake).then_with(|| a.key.cmp(&b.key)));
    out
}

pub fn supply_panel(institutions: &[Institution]) -> SupplyPanel {
    SupplyPanel {
        institutions: institutions.len(),
        total_intake: saturating_total(institutions.iter().map(|i| i64::from(i.intake))),
        by_category: supply_buckets(institutions, |i| vec![label_or_unknown(&i.category)]),
        by_domain: supply_buckets(institutions, |i| i.domains.clone()),
    }
}

/// Supply for a skill is the intake of institutions teaching it, either as a
/// domain or as a tool.
pub fn gap_rows(institutions: &[Institution], demand: &[IndustryDemand]) -> Vec<GapRow> {
    let mut rows = skill_demand(demand)
        .into_iter()
        .map(|(skill, demand)| {
            let key = skill.to_lowercase();
            let teaching = institutions.iter().filter(|i| {
                i.domains
                    .iter()
                    .chain(i.tools.iter())
                    .any(|v| v.trim().to_lowercase() == key)
            });
            let supply = saturating_total(teaching.map(|i| i64::from(i.intake)));
            GapRow {
                skill,
                demand,
                supply,
                gap: demand.saturating_sub(supply),
            }
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| b.gap.cmp(&a.gap));
    rows
}

fn placement_row(category: String, intake: i64, placed: i64) -> PlacementRow {
    let rate_percent = if intake > 0 {
        round_1_decimal(100.0 * placed as f64 / intake as f64)
    } else {
        0.0
    };
    PlacementRow {
        category,
        intake,
        placed,
        rate_percent,
    }
}

pub fn placement_panel(institutions: &[Institution]) -> PlacementPanel {
    let mut map: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for inst in institutions {
        let e = map.entry(label_or_unknown(&inst.category)).or_insert((0, 0));
        e.0 = e.0.saturating_add(i64::from(inst.intake));
        e.1 = e.1.saturating_add(i64::from(inst.placed));
    }
    let overall = placement_row(
        "All".to_string(),
        saturating_total(map.values().map(|v| v.0)),
        saturating_total(map.values().map(|v| v.1)),
    );
    PlacementPanel {
        overall,
        by_category: map
            .into_iter()
            .map(|(category, (intake, placed))| placement_row(category, intake, placed))
            .collect(),
    }
}

pub fn coe_panel(institutions: &[Institution]) -> CoePanel {
    let centres = institutions
        .iter()
        .filter(|i| i.coe)
        .map(|i| CoeCentre {
            id: i.id.clone(),
            name: i.name.clone(),
            area: i.location.area.clone(),
            domains: i.domains.clone(),
        })
        .collect::<Vec<_>>();
    let mut by_area = BTreeMap::new();
    for c in &centres {
        *by_area.entry(label_or_unknown(&c.area)).or_insert(0) += 1;
    }
    CoePanel {
        total: centres.len(),
        by_area: sorted_buckets(by_area),
        centres,
    }
}

pub fn dashboard_model(
    institutions: &[Institution],
    demand: &[IndustryDemand],
    filters: &FilterState,
    sector: Option<&str>,
) -> DashboardModel {
    let scoped = apply_filters(institutions, filters);
    let demand_scoped = demand
        .iter()
        .filter(|d| sector.map_or(true, |s| d.sector.trim().eq_ignore_ascii_case(s.trim())))
        .cloned()
        .collect::<Vec<_>>();
    DashboardModel {
        filters: filters.clone(),
        demand: demand_panel(demand, sector),
        supply: supply_panel(&scoped),
        gap: gap_rows(&scoped, &demand_scoped),
        placement: placement_panel(&scoped),
        coe: coe_panel(&scoped),
    }
}
