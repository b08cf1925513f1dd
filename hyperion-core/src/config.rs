//! Server configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_PORT: u16 = 8000;
static DEFAULT_CLIENT_URL: &str = "http://localhost:3000/";
static DEFAULT_DATABASE_PATH: &str = "data/hyperion.db";
static DEFAULT_DATA_DIR: &str = "data";
static DEFAULT_ICS_PATH: &str = "data/ics/ae_calendar.ics";
static DEFAULT_DOMAIN: &str = "myecl.fr";

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_client_url() -> String {
    DEFAULT_CLIENT_URL.to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_ics_path() -> PathBuf {
    PathBuf::from(DEFAULT_ICS_PATH)
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_true() -> bool {
    true
}

/// Settings read from ~/.config/hyperion/config.toml and `HYPERION__*` env vars.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the web client, with a trailing slash. Used to build ICS links.
    #[serde(default = "default_client_url")]
    pub client_url: String,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Root directory for uploaded images.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where the shared calendar file is written.
    #[serde(default = "default_ics_path")]
    pub ics_path: PathBuf,

    #[serde(default)]
    pub school: SchoolSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchoolSettings {
    /// Used for event UIDs and the calendar PRODID.
    #[serde(default = "default_domain")]
    pub application_domain_name: String,

    /// When false, new events skip the approval step and start approved.
    #[serde(default = "default_true")]
    pub require_event_confirmation: bool,
}

impl Default for SchoolSettings {
    fn default() -> Self {
        SchoolSettings {
            application_domain_name: default_domain(),
            require_event_confirmation: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            port: DEFAULT_PORT,
            client_url: default_client_url(),
            database_path: default_database_path(),
            data_dir: default_data_dir(),
            ics_path: default_ics_path(),
            school: SchoolSettings::default(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
            .join("hyperion");

        Ok(config_dir.join("config.toml"))
    }

    /// Load settings from `path` (or the default location), layered with the environment.
    ///
    /// A commented default file is created when the default location does not exist yet.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                }
                p
            }
        };

        let mut settings: Settings = Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("HYPERION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;

        settings.database_path = expand(&settings.database_path);
        settings.data_dir = expand(&settings.data_dir);
        settings.ics_path = expand(&settings.ics_path);

        if !settings.client_url.ends_with('/') {
            settings.client_url.push('/');
        }

        Ok(settings)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> Result<()> {
        let contents = format!(
            "\
# hyperion configuration

# port = {DEFAULT_PORT}
# client_url = \"{DEFAULT_CLIENT_URL}\"
# database_path = \"{DEFAULT_DATABASE_PATH}\"
# data_dir = \"{DEFAULT_DATA_DIR}\"
# ics_path = \"{DEFAULT_ICS_PATH}\"

# [school]
# application_domain_name = \"{DEFAULT_DOMAIN}\"
# require_event_confirmation = true
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
