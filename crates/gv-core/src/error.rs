//! Core error types for Gridview RS

use std::collections::BTreeMap;
use thiserror::Error;

/// Core error type for all grid operations
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ValidationErrors),

    #[error("Unknown column: {field}")]
    UnknownColumn { field: String },

    #[error("Export failed: {0}")]
    Export(String),
}

/// Standard Result type for grid operations
pub type GridResult<T> = Result<T, GridError>;

impl GridError {
    pub fn transport(message: impl Into<String>) -> Self {
        GridError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn unknown_column(field: impl Into<String>) -> Self {
        GridError::UnknownColumn {
            field: field.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GridError::Transport { .. } => "transport_error",
            GridError::Decode(_) => "decode_error",
            GridError::Config(_) => "configuration_error",
            GridError::UnknownColumn { .. } => "unknown_column",
            GridError::Export(_) => "export_error",
        }
    }
}

/// Validation errors collection: field name -> messages
#[derive(Error, Debug, Default, Clone)]
#[error("{}", self.full_messages().join("; "))]
pub struct ValidationErrors {
    /// Field-specific errors, ordered by field name
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// Turn a non-empty collection into an error
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}
