//! Role-aware screen selection.
//!
//! The dashboard shell shows exactly one top-level screen, picked from the
//! signed-in principal and a small navigation state (current view plus admin
//! mode). Every change to that state goes through [`NavState::apply`], which
//! checks the role's permissions before producing the next state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    DistrictAdmin,
    Institution,
    Trainee,
    Company,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::DistrictAdmin => "district_admin",
            Role::Institution => "institution",
            Role::Trainee => "trainee",
            Role::Company => "company",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "super_admin" => Some(Role::SuperAdmin),
            "district_admin" => Some(Role::DistrictAdmin),
            "institution" => Some(Role::Institution),
            "trainee" => Some(Role::Trainee),
            "company" => Some(Role::Company),
            _ => None,
        }
    }

    pub fn allows_mode(self, mode: AdminMode) -> bool {
        use AdminMode::*;
        match self {
            Role::SuperAdmin => true,
            Role::DistrictAdmin => mode != DicSeeder,
            Role::Institution => matches!(
                mode,
                Lobby
                    | Dashboard
                    | Portal
                    | Trainer
                    | ItiTrade
                    | TrainingCenter
                    | TraineeDetails
                    | TraineeAnalysis
                    | InstitutionWizard
            ),
            Role::Trainee => matches!(mode, Lobby | Dashboard | Portal | TraineeDetails),
            Role::Company => false,
        }
    }

    pub fn allows_view(self, view: View) -> bool {
        use View::*;
        match self {
            Role::SuperAdmin => true,
            Role::DistrictAdmin | Role::Institution => view != CredentialManager,
            Role::Trainee => matches!(
                view,
                Map | Dashboard | Institutions | Coe | Centers | SkillsIntel
            ),
            Role::Company => false,
        }
    }
}

macro_rules! slug_enum {
    ($name:ident { $($variant:ident => $slug:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $slug)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn slug(self) -> &'static str {
                match self {
                    $($name::$variant => $slug),+
                }
            }

            pub fn from_slug(s: &str) -> Option<$name> {
                match s {
                    $($slug => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

slug_enum!(View {
    Map => "map",
    Dashboard => "dashboard",
    EeeOverview => "eee-overview",
    Institutions => "institutions",
    Assessments => "assessments",
    Industry => "industry",
    Coe => "coe",
    Centers => "centers",
    AiSearch => "ai-search",
    Reports => "reports",
    Analytics => "analytics",
    Forecast => "forecast",
    SkillsIntel => "skills-intel",
    CredentialManager => "credential-manager",
});

slug_enum!(AdminMode {
    Lobby => "lobby",
    Dashboard => "dashboard",
    Portal => "portal",
    Plan => "plan",
    PlanList => "plan-list",
    PlanEdit => "plan-edit",
    Schemes => "schemes",
    Trainer => "trainer",
    ItiTrade => "iti-trade",
    TrainingCenter => "training-center",
    TraineeDetails => "trainee-details",
    TraineeAnalysis => "trainee-analysis",
    DistrictSkillMatrix => "district-skill-matrix",
    AggregateDemand => "aggregate-demand",
    AssignWork => "assign-work",
    InstitutionWizard => "institution-wizard",
    DicSeeder => "dic-seeder",
});

/// Screens a role may open directly, for building the shell's menus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub views: Vec<View>,
    pub admin_modes: Vec<AdminMode>,
}

impl Role {
    /// `plan-edit` is left out; it is reached through a plan id.
    pub fn menu(self) -> Menu {
        Menu {
            views: View::ALL
                .iter()
                .copied()
                .filter(|v| self.allows_view(*v))
                .collect(),
            admin_modes: AdminMode::ALL
                .iter()
                .copied()
                .filter(|m| *m != AdminMode::PlanEdit && self.allows_mode(*m))
                .collect(),
        }
    }
}

/// What the router needs to know about the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal<'a> {
    pub role: Role,
    pub district: Option<&'a str>,
    pub company_name: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavState {
    pub view: View,
    pub admin_mode: AdminMode,
    pub plan_id: Option<String>,
}

impl Default for NavState {
    fn default() -> Self {
        Self {
            view: View::Map,
            admin_mode: AdminMode::Lobby,
            plan_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum NavTarget {
    View(View),
    Admin(AdminMode),
    EditPlan(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "camelCase")]
pub enum Screen {
    Login,
    #[serde(rename_all = "camelCase")]
    CompanySurvey { company_slug: Option<String> },
    DistrictPicker,
    #[serde(rename_all = "camelCase")]
    Admin {
        mode: AdminMode,
        plan_id: Option<String>,
    },
    View { view: View },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("sign in first")]
    NotAuthenticated,
    #[error("choose a district first")]
    DistrictRequired,
    #[error("plan-edit needs a plan id")]
    PlanIdRequired,
    #[error("{role} may not open {target}")]
    Forbidden { role: &'static str, target: String },
}

impl NavState {
    fn permitted_for(&self, role: Role) -> bool {
        role.allows_mode(self.admin_mode)
            && (self.admin_mode != AdminMode::Dashboard || role.allows_view(self.view))
            && (self.admin_mode != AdminMode::PlanEdit || self.plan_id.is_some())
    }

    /// Produces the state reached by navigating to `target`, or the reason the
    /// principal may not go there. `self` is left untouched either way.
    pub fn apply(
        &self,
        principal: Option<&Principal<'_>>,
        target: NavTarget,
    ) -> Result<NavState, NavError> {
        let principal = principal.ok_or(NavError::NotAuthenticated)?;
        let role = principal.role;
        let forbidden = |target: String| NavError::Forbidden {
            role: role.as_str(),
            target,
        };
        if role == Role::Company {
            return Err(forbidden("the dashboard".to_string()));
        }
        if role == Role::SuperAdmin && principal.district.is_none() {
            return Err(NavError::DistrictRequired);
        }

        match target {
            NavTarget::View(view) => {
                if !role.allows_view(view) || !role.allows_mode(AdminMode::Dashboard) {
                    return Err(forbidden(format!("view {}", view.slug())));
                }
                Ok(NavState {
                    view,
                    admin_mode: AdminMode::Dashboard,
                    plan_id: None,
                })
            }
            NavTarget::Admin(AdminMode::PlanEdit) => Err(NavError::PlanIdRequired),
            NavTarget::Admin(mode) => {
                if !role.allows_mode(mode) {
                    return Err(forbidden(format!("mode {}", mode.slug())));
                }
                Ok(NavState {
                    view: self.view,
                    admin_mode: mode,
                    plan_id: None,
                })
            }
            NavTarget::EditPlan(plan_id) => {
                if !role.allows_mode(AdminMode::PlanEdit) {
                    return Err(forbidden(format!("mode {}", AdminMode::PlanEdit.slug())));
                }
                let plan_id = plan_id.trim().to_string();
                if plan_id.is_empty() {
                    return Err(NavError::PlanIdRequired);
                }
                Ok(NavState {
                    view: self.view,
                    admin_mode: AdminMode::PlanEdit,
                    plan_id: Some(plan_id),
                })
            }
        }
    }
}

pub fn resolve_screen(principal: Option<&Principal<'_>>, nav: &NavState) -> Screen {
    let Some(principal) = principal else {
        return Screen::Login;
    };
    if principal.role == Role::Company {
        return Screen::CompanySurvey {
            company_slug: principal.company_name.map(slugify).filter(|s| !s.is_empty()),
        };
    }
    if principal.role == Role::SuperAdmin && principal.district.is_none() {
        return Screen::DistrictPicker;
    }
    // A state that was never validated for this role falls back to the lobby.
    if !nav.permitted_for(principal.role) {
        return Screen::Admin {
            mode: AdminMode::Lobby,
            plan_id: None,
        };
    }
    match nav.admin_mode {
        AdminMode::Dashboard => Screen::View { view: nav.view },
        mode => Screen::Admin {
            mode,
            plan_id: nav.plan_id.clone(),
        },
    }
}

pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", content = "value", rename_all = "camelCase")]
pub enum Route {
    Home,
    Login,
    CompanySurvey(Option<String>),
    Admin(AdminMode),
    AdminPlan(String),
    View(View),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route for path: {0}")]
    Unknown(String),
}

impl Route {
    pub fn parse(path: &str) -> Result<Route, RouteError> {
        let unknown = || RouteError::Unknown(path.to_string());
        let bare = path.split(['?', '#']).next().unwrap_or("");
        let segments = bare
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        match segments.as_slice() {
            [] => Ok(Route::Home),
            ["login"] => Ok(Route::Login),
            ["company-survey"] => Ok(Route::CompanySurvey(None)),
            ["company-survey", name] => Ok(Route::CompanySurvey(Some(name.to_string()))),
            ["admin", "plan", plan_id] => Ok(Route::AdminPlan(plan_id.to_string())),
            ["admin", mode] => AdminMode::from_slug(mode)
                .map(Route::Admin)
                .ok_or_else(unknown),
            [view] => View::from_slug(view).map(Route::View).ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::CompanySurvey(None) => "/company-survey".to_string(),
            Route::CompanySurvey(Some(name)) => format!("/company-survey/{name}"),
            Route::Admin(mode) => format!("/admin/{}", mode.slug()),
            Route::AdminPlan(plan_id) => format!("/admin/plan/{plan_id}"),
            Route::View(view) => format!("/{}", view.slug()),
        }
    }

    pub fn target(&self) -> Option<NavTarget> {
        match self {
            Route::Admin(mode) => Some(NavTarget::Admin(*mode)),
            Route::AdminPlan(plan_id) => Some(NavTarget::EditPlan(plan_id.clone())),
            Route::View(view) => Some(NavTarget::View(*view)),
            Route::Home | Route::Login | Route::CompanySurvey(_) => None,
        }
    }

    pub fn for_screen(screen: &Screen) -> Route {
        match screen {
            Screen::Login => Route::Login,
            Screen::CompanySurvey { company_slug } => Route::CompanySurvey(company_slug.clone()),
            Screen::DistrictPicker => Route::Home,
            Screen::Admin {
                mode: AdminMode::PlanEdit,
                plan_id: Some(plan_id),
            } => Route::AdminPlan(plan_id.clone()),
            Screen::Admin { mode, .. } => Route::Admin(*mode),
            Screen::View { view } => Route::View(*view),
        }
    }
}
