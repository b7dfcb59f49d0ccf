use serde::{Deserialize, Serialize};

pub const DOMAINS: &[&str] = &[
    "Software Development",
    "Data Science",
    "Cloud Computing",
    "Cybersecurity",
    "AI/ML",
    "Electronics",
    "Electrical",
    "Mechanical",
    "Civil",
    "Automotive",
    "Healthcare",
    "Banking & Finance",
    "Retail",
    "Hospitality",
    "Logistics",
    "Manufacturing",
];

pub const TOOLS: &[&str] = &[
    "Python",
    "Java",
    "SQL",
    "React",
    "AWS",
    "Docker",
    "Excel",
    "Tally",
    "SAP",
    "AutoCAD",
    "SolidWorks",
    "MATLAB",
    "CNC Programming",
    "PLC",
];

pub const DEGREES: &[&str] = &[
    "B.E",
    "B.Tech",
    "M.Tech",
    "Diploma",
    "ITI Certificate",
    "B.Sc",
    "BCA",
    "MCA",
    "BBA",
    "MBA",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub area: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub degrees: Vec<String>,
    #[serde(default)]
    pub coe: bool,
    #[serde(default)]
    pub intake: u32,
    #[serde(default)]
    pub placed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryDemand {
    pub id: String,
    pub company_name: String,
    pub sector: String,
    pub company_type: String,
    pub skills_required: Vec<String>,
    pub demand_count: i64,
}

/// Splits a comma-joined skills column into trimmed, non-empty items.
pub fn split_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_skills(skills: &[String]) -> String {
    skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
