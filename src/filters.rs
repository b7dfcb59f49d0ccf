use crate::model::{Institution, DEGREES, DOMAINS, TOOLS};
use crate::search::find_ignore_case;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub search: String,
    pub categories: BTreeSet<String>,
    pub domains: BTreeSet<String>,
    pub tools: BTreeSet<String>,
    pub degrees: BTreeSet<String>,
    pub coe: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown {dimension} value: {value}")]
    UnknownValue {
        dimension: &'static str,
        value: String,
    },
}

impl FilterState {
    /// Rejects domain/tool/degree selections outside the fixed vocabularies.
    pub fn validate(&self) -> Result<(), FilterError> {
        check_vocabulary("domains", &self.domains, DOMAINS)?;
        check_vocabulary("tools", &self.tools, TOOLS)?;
        check_vocabulary("degrees", &self.degrees, DEGREES)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.categories.is_empty()
            && self.domains.is_empty()
            && self.tools.is_empty()
            && self.degrees.is_empty()
            && !self.coe
    }
}

fn check_vocabulary(
    dimension: &'static str,
    selected: &BTreeSet<String>,
    vocabulary: &[&str],
) -> Result<(), FilterError> {
    match selected.iter().find(|v| !vocabulary.contains(&v.as_str())) {
        Some(value) => Err(FilterError::UnknownValue {
            dimension,
            value: value.clone(),
        }),
        None => Ok(()),
    }
}

fn intersects(selected: &BTreeSet<String>, values: &[String]) -> bool {
    selected.is_empty() || values.iter().any(|v| selected.contains(v))
}

pub fn matches(inst: &Institution, filters: &FilterState) -> bool {
    let search = filters.search.trim();
    if !search.is_empty() && find_ignore_case(&inst.name, search).is_none() {
        return false;
    }
    if !filters.categories.is_empty() && !filters.categories.contains(&inst.category) {
        return false;
    }
    if filters.coe && !inst.coe {
        return false;
    }
    intersects(&filters.domains, &inst.domains)
        && intersects(&filters.tools, &inst.tools)
        && intersects(&filters.degrees, &inst.degrees)
}

pub fn apply_filters(institutions: &[Institution], filters: &FilterState) -> Vec<Institution> {
    institutions
        .iter()
        .filter(|inst| matches(inst, filters))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub areas: Vec<String>,
    pub domains: Vec<&'static str>,
    pub tools: Vec<&'static str>,
    pub degrees: Vec<&'static str>,
}

pub fn filter_options(institutions: &[Institution]) -> FilterOptions {
    let categories = institutions
        .iter()
        .map(|i| i.category.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>();
    let areas = institutions
        .iter()
        .map(|i| i.location.area.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>();
    FilterOptions {
        categories: categories.into_iter().collect(),
        areas: areas.into_iter().collect(),
        domains: DOMAINS.to_vec(),
        tools: TOOLS.to_vec(),
        degrees: DEGREES.to_vec(),
    }
}
