use crate::compose::ComposeOptions;
use crate::error::StampError;
use crate::locate::DEFAULT_TOKEN_PATTERN;
use crate::records::RecordRules;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Run settings. Every field has a default, so a config file only names what
/// it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StampConfig {
    /// Template carrying the visible placeholder tokens; only scanned.
    pub annotated_template: PathBuf,
    /// Placeholder-free template every output starts from.
    pub template: PathBuf,
    pub records: PathBuf,
    pub output_dir: PathBuf,
    pub token_pattern: String,
    /// 0 lets the thread pool size itself.
    pub workers: usize,
    pub fetch_timeout_secs: u64,
    /// JSON-lines run report; not written when unset.
    pub report: Option<PathBuf>,
    pub rules: RecordRules,
    pub compose: ComposeOptions,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            annotated_template: PathBuf::from("templatewithplaceholder.pdf"),
            template: PathBuf::from("templatewithoutplaceholder.pdf"),
            records: PathBuf::from("students.csv"),
            output_dir: PathBuf::from("StudentPdfs"),
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            workers: 1,
            fetch_timeout_secs: 30,
            report: None,
            rules: RecordRules::default(),
            compose: ComposeOptions::default(),
        }
    }
}

impl StampConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, StampError> {
        toml::from_str(text)
            .map_err(|err| StampError::InvalidConfiguration(format!("config: {}", err)))
    }

    pub fn load(path: &Path) -> Result<Self, StampError> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            StampError::InvalidConfiguration(format!("cannot read {}: {}", path.display(), err))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), StampError> {
        if self.fetch_timeout_secs == 0 {
            return Err(StampError::InvalidConfiguration(
                "fetch_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.rules.validate()?;
        self.compose.validate()
    }
}
