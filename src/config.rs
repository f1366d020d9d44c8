//! Desired-state file: which `.k5login` files to manage and how
//!
//! ```toml
//! [[k5login]]
//! path = "~/.k5login"
//! principals = ["daniel@EXAMPLE.COM", "george@EXAMPLE.COM"]
//! mode = "600"
//!
//! [[k5login]]
//! path = "/home/guest/.k5login"
//! ensure = "absent"
//!
//! [selinux_defaults.k5login_home]
//! user = "staff_u"
//! ```

use anyhow::{Context, Result, bail};
use k5login::{DefaultContexts, DesiredState, Ensure, Mode, ResourceKind, SecurityContext};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// On-disk format of the desired-state file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from the file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct K5syncConfig {
    /// Managed files, reconciled in order
    #[serde(default)]
    pub k5login: Vec<K5loginEntry>,

    /// Overrides for the built-in default security contexts
    #[serde(default)]
    pub selinux_defaults: HashMap<ResourceKind, SecurityContext>,
}

/// One declared `.k5login` file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct K5loginEntry {
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default)]
    pub ensure: Ensure,

    /// Omitted: leave an existing file's principals alone
    #[serde(default)]
    pub principals: Option<Principals>,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub seluser: Option<String>,
    #[serde(default)]
    pub selrole: Option<String>,
    #[serde(default)]
    pub seltype: Option<String>,
    #[serde(default)]
    pub selrange: Option<String>,
}

/// A single principal or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principals {
    One(String),
    Many(Vec<String>),
}

impl Principals {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(p) => vec![p],
            Self::Many(list) => list,
        }
    }
}

fn default_path() -> String {
    "~/.k5login".to_string()
}

impl K5syncConfig {
    /// Load the desired-state file; a missing file declares nothing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, nothing declared", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config = Self::parse(&content, ConfigFormat::from_path(path))
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = match format {
            ConfigFormat::Toml => toml::from_str(content).context("Invalid TOML format")?,
            ConfigFormat::Json => serde_json::from_str(content).context("Invalid JSON format")?,
        };
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashMap::new();
        for (index, entry) in self.k5login.iter().enumerate() {
            let path = entry
                .expanded_path()
                .with_context(|| format!("Invalid k5login entry #{} ({})", index + 1, entry.path))?;
            if let Some(first) = seen.insert(path.clone(), index) {
                bail!(
                    "k5login entries #{} and #{} both manage {}",
                    first + 1,
                    index + 1,
                    path.display()
                );
            }
        }
        Ok(())
    }

    /// Built-in default contexts with this file's overrides applied
    pub fn default_contexts(&self) -> DefaultContexts {
        self.selinux_defaults
            .iter()
            .fold(DefaultContexts::builtin(), |defaults, (kind, context)| {
                defaults.with_override(*kind, context.clone())
            })
    }
}

impl K5loginEntry {
    /// Path with `~` and variables expanded; must end up absolute
    pub fn expanded_path(&self) -> Result<PathBuf> {
        let path = paths::expand_path(&self.path);
        if !path.is_absolute() {
            bail!("path must be absolute: {}", path.display());
        }
        Ok(path)
    }

    pub fn desired_state(&self) -> DesiredState {
        DesiredState {
            ensure: self.ensure,
            principals: self.principals.clone().map(Principals::into_vec),
            mode: self.mode,
            context: SecurityContext {
                user: self.seluser.clone(),
                role: self.selrole.clone(),
                type_: self.seltype.clone(),
                range: self.selrange.clone(),
            },
        }
    }
}
