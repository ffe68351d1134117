//! Static configuration, read from TOML.
//!
//! ```toml
//! greetings = true
//! prompt = "pipe> "
//! height = 20
//! syntax = "haskell"
//!
//! [keydown]
//! pass_through = ["ctrl+r"]
//!
//! [theme]
//! error = "light-red"
//!
//! [backend]
//! program = "pipe"
//! args = ["serve"]
//! timeout_ms = 5000
//! settle_ms = 20
//! ```

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    error::{ReplError, Result},
    keys::KeydownPolicy,
    process::ProcessSource,
    syntax::SyntaxMode,
};

pub const DEFAULT_PROMPT: &str = "pipe> ";

/// Top-level front end configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Show the startup banner.
    pub greetings: bool,
    pub prompt: String,
    /// Visible transcript rows; the whole drawing area when unset.
    pub height: Option<u16>,
    /// Handle `clear` and `exit` in the front end instead of the backend.
    pub builtins: bool,
    pub syntax: SyntaxMode,
    pub keydown: KeydownPolicy,
    pub theme: ThemeConfig,
    pub backend: BackendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            greetings: false,
            prompt: DEFAULT_PROMPT.to_string(),
            height: None,
            builtins: true,
            syntax: SyntaxMode::default(),
            keydown: KeydownPolicy::default(),
            theme: ThemeConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        log::debug!("read config from {}", path.display());
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.height == Some(0) {
            return Err(ReplError::Config("height must be at least 1".into()));
        }
        if self.prompt.contains('\n') {
            return Err(ReplError::Config("prompt must be a single line".into()));
        }
        Ok(())
    }
}

/// Colour names for transcript styles; unset entries keep the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub prompt: Option<String>,
    pub success: Option<String>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// The external evaluator program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub program: Option<String>,
    pub args: Vec<String>,
    /// Wait for a banner line before signalling readiness.
    pub handshake: bool,
    pub timeout_ms: Option<u64>,
    /// Quiet time that ends a multi-line response.
    pub settle_ms: Option<u64>,
}

impl BackendConfig {
    /// A process source for the configured program, if there is one.
    pub fn source(&self) -> Option<ProcessSource> {
        let program = self.program.as_ref()?;
        let mut source = ProcessSource::new(program)
            .args(self.args.iter().cloned())
            .handshake(self.handshake);
        if let Some(ms) = self.timeout_ms {
            source = source.timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.settle_ms {
            source = source.settle(Duration::from_millis(ms));
        }
        Some(source)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use crossterm::event::KeyCode;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.greetings);
        assert_eq!(config.prompt, "pipe> ");
        assert_eq!(config.syntax, SyntaxMode::Haskell);
        assert!(config.backend.source().is_none());
    }

    #[test]
    fn full_file() {
        let config = Config::from_toml_str(
            r#"
            greetings = true
            prompt = "> "
            height = 12
            builtins = false
            syntax = "plain"

            [keydown]
            pass_through = ["ctrl+r", "f5"]

            [theme]
            error = "light-red"

            [backend]
            program = "pipe"
            args = ["serve", "--quiet"]
            handshake = true
            timeout_ms = 250
            settle_ms = 5
            "#,
        )
        .unwrap();

        assert!(config.greetings);
        assert_eq!(config.prompt, "> ");
        assert_eq!(config.height, Some(12));
        assert!(!config.builtins);
        assert_eq!(config.syntax, SyntaxMode::Plain);
        assert_eq!(config.keydown.pass_through[1].code, KeyCode::F(5));
        assert_eq!(config.theme.error.as_deref(), Some("light-red"));

        let source = config.backend.source().unwrap();
        assert_eq!(source.program(), "pipe");
        assert_eq!(source.arguments(), ["serve", "--quiet"]);
        assert!(source.uses_handshake());
        assert_eq!(source.timeout_duration(), Some(Duration::from_millis(250)));
        assert_eq!(source.settle_duration(), Duration::from_millis(5));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = Config::from_toml_str("colour = \"red\"").unwrap_err();
        assert!(matches!(err, ReplError::TomlParse(_)));
    }

    #[test]
    fn zero_height_is_rejected() {
        let err = Config::from_toml_str("height = 0").unwrap_err();
        assert!(matches!(err, ReplError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prompt = \"calc> \"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.prompt, "calc> ");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ReplError::Io(_)));
    }
}
