//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri della conversione
//! - Deriva la `Policy` (commit / force / delete) usata da converter e deletion
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Parametri di configurazione:
//! - `path`: Directory radice da processare (default: None = directory corrente)
//! - `recursive`: Scende nelle sottodirectory (default: false)
//! - `commit`: Esegue davvero conversione e cancellazione (default: false = dry run)
//! - `force`: Sovrascrive le destinazioni esistenti (default: false)
//! - `delete`: Cancella il sorgente dopo una conversione riuscita (default: false)
//! - `extensions`: Lista di estensioni separate da virgola (default: "avi,mpg")
//! - `preset`: Preset HandBrake (default: "Normal")
//! - `target_extension`: Estensione di output (default: "mp4")
//! - `engine_binary`: Eseguibile del motore (default: "HandBrakeCLI")
//!
//! `path`, `commit`, `force` e `delete` valgono solo per la singola run: non
//! vengono scritti né letti dal file JSON e arrivano sempre dalla command line.
//!
//! La configurazione viene costruita una sola volta in `main` e poi passata
//! per riferimento a scanner, converter e pipeline. Non esiste stato globale.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     path: Some("/media/videos".into()),
//!     commit: true,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::ConvertError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_EXTENSIONS: &str = "avi,mpg";
pub const DEFAULT_PRESET: &str = "Normal";
pub const DEFAULT_TARGET_EXTENSION: &str = "mp4";
pub const DEFAULT_ENGINE: &str = "HandBrakeCLI";

/// Configuration for a conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory to scan (None = current directory)
    #[serde(skip)]
    pub path: Option<PathBuf>,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Perform real conversion/deletion instead of a dry run
    #[serde(skip)]
    pub commit: bool,
    /// Allow overwriting an existing destination
    #[serde(skip)]
    pub force: bool,
    /// Remove the source after a successful commit
    #[serde(skip)]
    pub delete: bool,
    /// Comma delimited source extensions
    pub extensions: String,
    /// Engine preset name
    pub preset: String,
    /// Extension of the converted file
    pub target_extension: String,
    /// Engine executable
    pub engine_binary: String,
    /// Verbose logging
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            recursive: false,
            commit: false,
            force: false,
            delete: false,
            extensions: DEFAULT_EXTENSIONS.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            target_extension: DEFAULT_TARGET_EXTENSION.to_string(),
            engine_binary: DEFAULT_ENGINE.to_string(),
            verbose: false,
        }
    }
}

/// The three flags that gate mutating actions for a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Policy {
    pub commit: bool,
    pub force: bool,
    pub delete: bool,
}

impl Config {
    /// Policy flags in effect for this run
    pub fn policy(&self) -> Policy {
        Policy {
            commit: self.commit,
            force: self.force,
            delete: self.delete,
        }
    }

    /// Root directory, falling back to the current directory
    pub fn root(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.preset.trim().is_empty() {
            return Err(ConvertError::Validation("Preset must not be empty".to_string()).into());
        }

        if self.target_extension.is_empty() || self.target_extension.contains('.') {
            return Err(ConvertError::Validation(format!(
                "Invalid target extension: '{}'",
                self.target_extension
            )).into());
        }

        if self.engine_binary.trim().is_empty() {
            return Err(ConvertError::Validation("Engine binary must not be empty".to_string()).into());
        }

        let root = self.root();
        if !root.exists() {
            return Err(ConvertError::Validation(format!("Path does not exist: {}", root.display())).into());
        }
        if !root.is_dir() {
            return Err(ConvertError::Validation(format!("Path is not a directory: {}", root.display())).into());
        }

        Ok(())
    }

    /// Default location of the configuration file
    pub fn default_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mp4-encoder").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
