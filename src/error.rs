//! Error types for pipe_repl.

use std::io;

/// Failures while acquiring an evaluation backend.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to start backend `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("backend handshake failed: {0}")]
    Handshake(String),

    #[error("backend loader stopped before signalling readiness")]
    Abandoned,

    #[error("backend acquisition failed: {0}")]
    Acquire(String),
}

/// Errors produced by the REPL front end.
#[derive(Debug, thiserror::Error)]
pub enum ReplError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("syntax highlighting error: {0}")]
    Syntax(#[from] regex::Error),

    #[error("backend error: {0}")]
    Load(#[from] LoadError),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ReplError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_display() {
        let e = LoadError::Spawn {
            program: "pipe".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(
            format!("{e}"),
            "failed to start backend `pipe`: no such file"
        );
    }

    #[test]
    fn handshake_error_display() {
        let e = LoadError::Handshake("no banner".into());
        assert_eq!(format!("{e}"), "backend handshake failed: no banner");
    }

    #[test]
    fn config_error_display() {
        let e = ReplError::Config("unknown colour".into());
        assert_eq!(format!("{e}"), "config error: unknown colour");
    }

    #[test]
    fn load_error_from_conversion() {
        let e: ReplError = LoadError::Abandoned.into();
        let msg = format!("{e}");
        assert!(msg.starts_with("backend error"));
        assert!(msg.contains("readiness"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("this is [[[not valid toml").unwrap_err();
        let e: ReplError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn io_error_from_conversion() {
        let e: ReplError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }
}
