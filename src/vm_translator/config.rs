// Translator Configuration
// Optional TOML settings for the preamble and whole-program bootstrap

use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::vm_translator::codegen::DEFAULT_STACK_BASE;
use crate::vm_translator::error::TranslatorError;

/// Name of the configuration file picked up from a program directory
pub const CONFIG_FILE_NAME: &str = "vm-translator.toml";

/// Settings for one translation run.
///
/// Every field is optional in the TOML file:
///
/// ```toml
/// stack_base = 256
/// entry_function = "Sys.init"
/// entry_return_label = "sysReturn"
/// bootstrap = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslatorConfig {
    /// Address SP is set to before the first instruction runs
    pub stack_base: u16,
    /// Function called first in whole-program builds
    pub entry_function: String,
    /// Return label of the bootstrap call
    pub entry_return_label: String,
    /// Whether whole-program builds start with a call to `entry_function`
    pub bootstrap: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        TranslatorConfig {
            stack_base: DEFAULT_STACK_BASE,
            entry_function: "Sys.init".to_string(),
            entry_return_label: "sysReturn".to_string(),
            bootstrap: true,
        }
    }
}

impl TranslatorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, TranslatorError> {
        toml::from_str(text).map_err(|err| TranslatorError::ConfigError(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, TranslatorError> {
        debug!("Loading translator configuration from {}", path.display());
        let text = fs::read_to_string(path)
            .map_err(|err| TranslatorError::IOError(format!("{}: {}", path.display(), err)))?;
        Self::from_toml_str(&text)
    }

    /// Load `vm-translator.toml` from `dir` if present, defaults otherwise
    pub fn discover(dir: &Path) -> Result<Self, TranslatorError> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}
