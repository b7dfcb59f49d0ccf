use crate::analytics::{
    coe_panel, dashboard_model, demand_panel, gap_rows, placement_panel, supply_panel,
};
use crate::filters::apply_filters;
use crate::ipc::error::ok;
use crate::ipc::helpers::{dashboard_user, filters_param, optional_str, to_value};
use crate::ipc::types::{AppState, Request};
use serde_json::Value;

#[derive(Debug, Clone, Copy)]
enum Panel {
    Dashboard,
    Demand,
    Supply,
    Gap,
    Placement,
    Coe,
}

fn handle_panel(state: &mut AppState, req: &Request, panel: Panel) -> Value {
    if let Err(e) = dashboard_user(state, req) {
        return e;
    }
    let filters = match filters_param(req) {
        Ok(f) => f,
        Err(e) => return e,
    };
    let sector = optional_str(req, "sector");
    let data = state.session.data();
    let scoped = apply_filters(data.institutions(), &filters);

    let result = match panel {
        Panel::Dashboard => to_value(
            req,
            &dashboard_model(data.institutions(), data.demand(), &filters, sector.as_deref()),
        ),
        Panel::Demand => to_value(req, &demand_panel(data.demand(), sector.as_deref())),
        Panel::Supply => to_value(req, &supply_panel(&scoped)),
        Panel::Gap => {
            let demand = data
                .demand()
                .iter()
                .filter(|d| {
                    sector
                        .as_deref()
                        .map_or(true, |s| d.sector.trim().eq_ignore_ascii_case(s))
                })
                .cloned()
                .collect::<Vec<_>>();
            to_value(req, &serde_json::json!({ "rows": gap_rows(&scoped, &demand) }))
        }
        Panel::Placement => to_value(req, &placement_panel(&scoped)),
        Panel::Coe => to_value(req, &coe_panel(&scoped)),
    };
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let panel = match req.method.as_str() {
        "analytics.dashboard" => Panel::Dashboard,
        "analytics.demand" => Panel::Demand,
        "analytics.supply" => Panel::Supply,
        "analytics.gap" => Panel::Gap,
        "analytics.placement" => Panel::Placement,
        "analytics.coe" => Panel::Coe,
        _ => return None,
    };
    Some(handle_panel(state, req, panel))
}
