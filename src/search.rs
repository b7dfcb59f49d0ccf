use crate::filters::FilterState;
use crate::model::{IndustryDemand, Institution};
use serde::Serialize;
use std::collections::HashSet;

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_SUGGESTIONS: usize = 10;
pub const MAX_INSTITUTIONS: usize = 4;
pub const MAX_SKILLS: usize = 3;
pub const MAX_COMPANIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Institution,
    Skill,
    Company,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSuggestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub label: String,
    pub category: Option<String>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight<'a> {
    pub before: &'a str,
    #[serde(rename = "match")]
    pub matched: &'a str,
    pub after: &'a str,
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte range of the first case-insensitive occurrence of `needle` in
/// `haystack`. Compares char by char, so the range always lands on char
/// boundaries of the haystack.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle = needle.chars().collect::<Vec<_>>();
    if needle.is_empty() {
        return Some((0, 0));
    }
    'outer: for (start, _) in haystack.char_indices() {
        let mut rest = haystack[start..].chars();
        let mut end = start;
        for &n in &needle {
            match rest.next() {
                Some(h) if chars_eq_ignore_case(h, n) => end += h.len_utf8(),
                _ => continue 'outer,
            }
        }
        return Some((start, end));
    }
    None
}

pub fn highlight_match<'a>(label: &'a str, query: &str) -> Option<Highlight<'a>> {
    let (start, end) = find_ignore_case(label, query.trim())?;
    Some(Highlight {
        before: &label[..start],
        matched: &label[start..end],
        after: &label[end..],
    })
}

pub fn extract_institutions(query: &str, institutions: &[Institution]) -> Vec<SearchSuggestion> {
    institutions
        .iter()
        .filter(|inst| find_ignore_case(&inst.name, query).is_some())
        .take(MAX_INSTITUTIONS)
        .map(|inst| SearchSuggestion {
            id: format!("institution:{}", inst.id),
            kind: SuggestionKind::Institution,
            label: inst.name.clone(),
            category: Some(inst.category.clone()),
            metadata: Some(inst.location.area.clone()).filter(|a| !a.is_empty()),
        })
        .collect()
}

pub fn extract_skills(query: &str, demand: &[IndustryDemand]) -> Vec<SearchSuggestion> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for skill in demand.iter().flat_map(|d| d.skills_required.iter()) {
        let skill = skill.trim();
        let key = skill.to_lowercase();
        if skill.is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        if find_ignore_case(skill, query).is_none() {
            continue;
        }
        let companies = demand
            .iter()
            .filter(|d| d.skills_required.iter().any(|s| s.trim().to_lowercase() == key))
            .count();
        out.push(SearchSuggestion {
            id: format!("skill:{key}"),
            kind: SuggestionKind::Skill,
            label: skill.to_string(),
            category: Some("Skill".to_string()),
            metadata: Some(format!("required by {companies} companies")),
        });
        if out.len() == MAX_SKILLS {
            break;
        }
    }
    out
}

pub fn extract_companies(
    query: &str,
    demand: &[IndustryDemand],
    sector: Option<&str>,
) -> Vec<SearchSuggestion> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    // Sector narrows first, so dedup keeps the first record within the sector.
    for d in demand {
        if let Some(sector) = sector {
            if !d.sector.trim().eq_ignore_ascii_case(sector.trim()) {
                continue;
            }
        }
        if !seen.insert(d.company_name.as_str()) {
            continue;
        }
        if find_ignore_case(&d.company_name, query).is_none() {
            continue;
        }
        out.push(SearchSuggestion {
            id: format!("company:{}", d.id),
            kind: SuggestionKind::Company,
            label: d.company_name.clone(),
            category: Some(d.sector.clone()),
            metadata: Some(d.company_type.clone()).filter(|t| !t.is_empty()),
        });
        if out.len() == MAX_COMPANIES {
            break;
        }
    }
    out
}

/// Ranked autocomplete: institutions, then skills, then companies. The filter
/// state is accepted for the caller's convenience and does not narrow results.
pub fn get_search_suggestions(
    query: &str,
    institutions: &[Institution],
    demand: &[IndustryDemand],
    _filters: &FilterState,
    sector: Option<&str>,
) -> Vec<SearchSuggestion> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }
    let mut out = extract_institutions(query, institutions);
    out.extend(extract_skills(query, demand));
    out.extend(extract_companies(query, demand, sector));
    out.truncate(MAX_SUGGESTIONS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;
    use proptest::prelude::*;

    fn inst(id: &str, name: &str) -> Institution {
        Institution {
            id: id.to_string(),
            name: name.to_string(),
            category: "Engineering".to_string(),
            location: Location::default(),
            domains: Vec::new(),
            tools: Vec::new(),
            degrees: Vec::new(),
            coe: false,
            intake: 0,
            placed: 0,
        }
    }

    fn demand(id: &str, company: &str, sector: &str, skills: &[&str]) -> IndustryDemand {
        IndustryDemand {
            id: id.to_string(),
            company_name: company.to_string(),
            sector: sector.to_string(),
            company_type: "MNC".to_string(),
            skills_required: skills.iter().map(|s| s.to_string()).collect(),
            demand_count: 10,
        }
    }

    #[test]
    fn highlight_preserves_source_case() {
        let h = highlight_match("NITK Surathkal", "surath").expect("match");
        assert_eq!(
            h,
            Highlight {
                before: "NITK ",
                matched: "Surath",
                after: "kal"
            }
        );
    }

    #[test]
    fn highlight_returns_none_without_match() {
        assert_eq!(highlight_match("Sahyadri College", "nitk"), None);
    }

    #[test]
    fn highlight_handles_multibyte_labels() {
        let h = highlight_match("Café Skills Hub", "É S").expect("match");
        assert_eq!(h.before, "Caf");
        assert_eq!(h.matched, "é S");
        assert_eq!(h.after, "kills Hub");
    }

    #[test]
    fn short_queries_yield_nothing() {
        let list = vec![inst("1", "Alva's Institute")];
        let f = FilterState::default();
        assert!(get_search_suggestions("", &list, &[], &f, None).is_empty());
        assert!(get_search_suggestions("a", &list, &[], &f, None).is_empty());
        assert!(get_search_suggestions(" a ", &list, &[], &f, None).is_empty());
    }

    #[test]
    fn sah_finds_sahyadri_only() {
        let list = vec![inst("1", "NITK Surathkal"), inst("2", "Sahyadri College")];
        let out = get_search_suggestions("sah", &list, &[], &FilterState::default(), None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SuggestionKind::Institution);
        assert_eq!(out[0].label, "Sahyadri College");
        let h = highlight_match(&out[0].label, "sah").expect("highlight");
        assert_eq!((h.before, h.matched, h.after), ("", "Sah", "yadri College"));
    }

    #[test]
    fn companies_dedup_first_occurrence_wins() {
        let rows = vec![
            demand("10", "Infosys", "IT", &[]),
            demand("11", "Infosys", "IT", &[]),
        ];
        let out = extract_companies("info", &rows, None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "company:10");
    }

    #[test]
    fn company_sector_filter_applies() {
        let rows = vec![
            demand("1", "MRPL", "Petrochemicals", &[]),
            demand("2", "MCF", "Fertilisers", &[]),
        ];
        let out = extract_companies("m", &rows, Some("fertilisers"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "MCF");
    }

    #[test]
    fn skills_dedup_case_insensitively_keeping_first_spelling() {
        let rows = vec![
            demand("1", "A", "IT", &["Python", "SQL"]),
            demand("2", "B", "IT", &["python", "PySpark"]),
        ];
        let out = extract_skills("py", &rows);
        let labels = out.iter().map(|s| s.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["Python", "PySpark"]);
        assert_eq!(out[0].metadata.as_deref(), Some("required by 2 companies"));
    }

    #[test]
    fn every_suggestion_can_be_highlighted() {
        let list = vec![inst("1", "İstanbul Tech"), inst("2", "Straße Polytechnic")];
        for q in ["tech", "STRASSE", "ße", "İs"] {
            for s in get_search_suggestions(q, &list, &[], &FilterState::default(), None) {
                assert!(highlight_match(&s.label, q).is_some(), "{q} vs {}", s.label);
            }
        }
    }

    proptest! {
        #[test]
        fn suggestion_caps_hold(
            names in prop::collection::vec("[ab]{2,5}", 0..12),
            skills in prop::collection::vec("[ab]{2,5}", 0..12),
            companies in prop::collection::vec("[ab]{2,5}", 0..12),
            query in "[ab]{2,3}",
        ) {
            let list = names
                .iter()
                .enumerate()
                .map(|(i, n)| inst(&i.to_string(), n))
                .collect::<Vec<_>>();
            let rows = companies
                .iter()
                .enumerate()
                .map(|(i, c)| IndustryDemand {
                    id: i.to_string(),
                    company_name: c.clone(),
                    sector: "IT".to_string(),
                    company_type: String::new(),
                    skills_required: skills.clone(),
                    demand_count: 1,
                })
                .collect::<Vec<_>>();
            let out = get_search_suggestions(&query, &list, &rows, &FilterState::default(), None);
            let count = |k: SuggestionKind| out.iter().filter(|s| s.kind == k).count();
            prop_assert!(out.len() <= MAX_SUGGESTIONS);
            prop_assert!(count(SuggestionKind::Institution) <= MAX_INSTITUTIONS);
            prop_assert!(count(SuggestionKind::Skill) <= MAX_SKILLS);
            prop_assert!(count(SuggestionKind::Company) <= MAX_COMPANIES);
        }
    }
}
