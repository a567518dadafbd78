//! Layered settings: defaults, then the user config file, then a project-local
//! `flashlingo.toml`, then `FLASHLINGO_*` environment variables. Command-line
//! flags are applied last by the caller.

use clap::ValueEnum;
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use flashlingo_core::UserId;
use flashlingo_json::paths::data_root;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Json,
    Sqlite,
    Pg,
}

fn default_user() -> String {
    "local".to_string()
}

const fn default_max_backups() -> usize {
    10
}

fn default_api_addr() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreKind,
    #[serde(default = "default_user")]
    pub user: String,
    /// Root for the JSON store and default SQLite file.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Postgres connection string, required for `store = "pg"`.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
    #[serde(default = "default_api_addr")]
    pub api_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::Json,
            user: default_user(),
            data_dir: None,
            db_path: None,
            database_url: None,
            max_backups: default_max_backups(),
            api_addr: default_api_addr(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self::figment(global_config_path()).extract()?)
    }

    pub fn figment(global: Option<PathBuf>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = global.filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Toml::file("flashlingo.toml"))
            .merge(Env::prefixed("FLASHLINGO_").ignore(&["log"]))
    }

    pub fn user_id(&self) -> anyhow::Result<UserId> {
        Ok(UserId::new(&self.user)?)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(data_root)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("flashlingo.sqlite3"))
    }
}

fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "flashlingo", "FlashLingo")
        .map(|pd| pd.config_dir().join("config.toml"))
}
