//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. Every problem is
//! reported, not just the first.

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: must not be empty")]
    EmptyPath { field: &'static str },

    #[error("content.default_document: '{0}' must be a plain file name")]
    DefaultDocument(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_connections",
        });
    }
    if config.limits.max_line_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "limits.max_line_bytes",
        });
    }
    if config.limits.read_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "limits.read_timeout_secs",
        });
    }
    if let Some(tls) = &config.listener.tls {
        if tls.handshake_timeout_secs == 0 {
            errors.push(ValidationError::Zero {
                field: "listener.tls.handshake_timeout_secs",
            });
        }
        check_path(&mut errors, "listener.tls.cert_path", tls.cert_path.as_os_str());
        check_path(&mut errors, "listener.tls.key_path", tls.key_path.as_os_str());
    }

    check_path(&mut errors, "content.root", config.content.root.as_os_str());
    check_path(&mut errors, "content.uploads_dir", config.content.uploads_dir.as_os_str());
    check_path(&mut errors, "drift.token_path", config.drift.token_path.as_os_str());

    let document = &config.content.default_document;
    if document.is_empty()
        || document.contains(['/', '\\'])
        || document == "."
        || document == ".."
    {
        errors.push(ValidationError::DefaultDocument(document.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_path(errors: &mut Vec<ValidationError>, field: &'static str, value: &std::ffi::OsStr) {
    if value.is_empty() {
        errors.push(ValidationError::EmptyPath { field });
    }
}
