use crate::model::{IndustryDemand, Institution};
use crate::nav::{self, NavError, NavState, NavTarget, Principal, Role, Screen};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub district: Option<String>,
    pub company_name: Option<String>,
    pub institution_id: Option<String>,
}

impl AuthContext {
    pub fn principal(&self) -> Principal<'_> {
        Principal {
            role: self.role,
            district: self.district.as_deref(),
            company_name: self.company_name.as_deref(),
        }
    }
}

/// Fetched entity lists. Only ever replaced as a whole.
#[derive(Debug, Default)]
pub struct DataStore {
    institutions: Vec<Institution>,
    demand: Vec<IndustryDemand>,
    loaded_at: Option<DateTime<Utc>>,
}

impl DataStore {
    pub fn replace(&mut self, institutions: Vec<Institution>, demand: Vec<IndustryDemand>) {
        self.institutions = institutions;
        self.demand = demand;
        self.loaded_at = Some(Utc::now());
    }

    pub fn clear(&mut self) {
        *self = DataStore::default();
    }

    pub fn institutions(&self) -> &[Institution] {
        &self.institutions
    }

    pub fn demand(&self) -> &[IndustryDemand] {
        &self.demand
    }

    pub fn institution(&self, id: &str) -> Option<&Institution> {
        self.institutions.iter().find(|i| i.id == id)
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

#[derive(Debug, Default)]
pub struct Session {
    auth: Option<AuthContext>,
    nav: NavState,
    data: DataStore,
}

impl Session {
    pub fn auth(&self) -> Option<&AuthContext> {
        self.auth.as_ref()
    }

    pub fn principal(&self) -> Option<Principal<'_>> {
        self.auth.as_ref().map(AuthContext::principal)
    }

    pub fn nav(&self) -> &NavState {
        &self.nav
    }

    pub fn data(&self) -> &DataStore {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataStore {
        &mut self.data
    }

    pub fn sign_in(&mut self, auth: AuthContext) {
        self.auth = Some(auth);
        self.nav = NavState::default();
    }

    pub fn sign_out(&mut self) {
        self.auth = None;
        self.nav = NavState::default();
    }

    /// Only super admins roam between districts; everyone else is pinned to
    /// the district on their account.
    pub fn select_district(&mut self, district: &str) -> Result<(), NavError> {
        let auth = self.auth.as_mut().ok_or(NavError::NotAuthenticated)?;
        if auth.role != Role::SuperAdmin {
            return Err(NavError::Forbidden {
                role: auth.role.as_str(),
                target: "district selection".to_string(),
            });
        }
        let district = district.trim();
        auth.district = (!district.is_empty()).then(|| district.to_string());
        self.nav = NavState::default();
        Ok(())
    }

    pub fn navigate(&mut self, target: NavTarget) -> Result<Screen, NavError> {
        let next = self.nav.apply(self.principal().as_ref(), target)?;
        self.nav = next;
        Ok(self.screen())
    }

    pub fn screen(&self) -> Screen {
        nav::resolve_screen(self.principal().as_ref(), &self.nav)
    }

    /// District that district-scoped reads default to.
    pub fn district(&self) -> Option<&str> {
        self.auth.as_ref().and_then(|a| a.district.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::{AdminMode, View};

    fn ctx(role: Role, district: Option<&str>) -> AuthContext {
        AuthContext {
            user_id: "u1".to_string(),
            email: "a@b.in".to_string(),
            role,
            district: district.map(str::to_string),
            company_name: None,
            institution_id: None,
        }
    }

    #[test]
    fn super_admin_flow_picks_district_then_navigates() {
        let mut s = Session::default();
        assert_eq!(s.screen(), Screen::Login);
        s.sign_in(ctx(Role::SuperAdmin, None));
        assert_eq!(s.screen(), Screen::DistrictPicker);
        s.select_district("Dakshina Kannada").expect("select");
        assert_eq!(s.district(), Some("Dakshina Kannada"));
        let screen = s
            .navigate(NavTarget::Admin(AdminMode::DicSeeder))
            .expect("navigate");
        assert_eq!(
            screen,
            Screen::Admin {
                mode: AdminMode::DicSeeder,
                plan_id: None
            }
        );
    }

    #[test]
    fn refused_navigation_keeps_previous_state() {
        let mut s = Session::default();
        s.sign_in(ctx(Role::Trainee, Some("Udupi")));
        s.navigate(NavTarget::View(View::Coe)).expect("coe");
        assert!(s.navigate(NavTarget::Admin(AdminMode::AssignWork)).is_err());
        assert_eq!(s.screen(), Screen::View { view: View::Coe });
    }

    #[test]
    fn district_admin_cannot_switch_district() {
        let mut s = Session::default();
        s.sign_in(ctx(Role::DistrictAdmin, Some("Udupi")));
        assert!(s.select_district("Mysuru").is_err());
        assert_eq!(s.district(), Some("Udupi"));
    }

    #[test]
    fn sign_out_resets_navigation() {
        let mut s = Session::default();
        s.sign_in(ctx(Role::DistrictAdmin, Some("Udupi")));
        s.navigate(NavTarget::View(View::Reports)).expect("reports");
        s.sign_out();
        assert_eq!(s.nav(), &NavState::default());
        assert_eq!(s.screen(), Screen::Login);
    }

    #[test]
    fn data_store_replaces_wholesale() {
        let mut store = DataStore::default();
        assert!(store.loaded_at().is_none());
        store.replace(Vec::new(), Vec::new());
        assert!(store.loaded_at().is_some());
        assert!(store.institution("missing").is_none());
        store.clear();
        assert!(store.loaded_at().is_none());
    }
}
