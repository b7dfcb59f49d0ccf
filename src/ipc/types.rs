use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::db;
use crate::session::Session;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("{0:#}")]
    Config(anyhow::Error),
    #[error("{0:#}")]
    Db(anyhow::Error),
    #[error("{0:#}")]
    Load(anyhow::Error),
}

impl OpenError {
    pub fn code(&self) -> &'static str {
        match self {
            OpenError::Config(_) => "config_invalid",
            OpenError::Db(_) => "db_open_failed",
            OpenError::Load(_) => "db_query_failed",
        }
    }
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: Config,
    pub session: Session,
}

impl AppState {
    /// Switches to another workspace. The previous one stays active when any
    /// step fails; a successful switch signs the current user out.
    pub fn open_workspace(&mut self, path: &Path) -> Result<(), OpenError> {
        let config = Config::load(path).map_err(OpenError::Config)?;
        let conn = db::open_db(path).map_err(OpenError::Db)?;
        let institutions = db::list_institutions(&conn).map_err(OpenError::Load)?;
        let demand = db::list_demand(&conn).map_err(OpenError::Load)?;

        self.session = Session::default();
        self.session.data_mut().replace(institutions, demand);
        self.workspace = Some(path.to_path_buf());
        self.db = Some(conn);
        self.config = config;
        tracing::info!(
            workspace = %path.to_string_lossy(),
            institutions = self.session.data().institutions().len(),
            demand = self.session.data().demand().len(),
            "workspace opened"
        );
        Ok(())
    }

    /// Re-reads the entity lists after a write.
    pub fn reload_data(&mut self) -> anyhow::Result<()> {
        let Some(conn) = self.db.as_ref() else {
            self.session.data_mut().clear();
            return Ok(());
        };
        let institutions = db::list_institutions(conn)?;
        let demand = db::list_demand(conn)?;
        self.session.data_mut().replace(institutions, demand);
        Ok(())
    }
}
