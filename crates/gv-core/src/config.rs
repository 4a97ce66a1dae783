//! Grid configuration
//!
//! Supplied once when a grid is constructed and immutable afterwards.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult, ValidationErrors};
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::types::ColumnDescriptor;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Where the dataset lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridMode {
    /// Every view change is answered by a new bounded remote query
    #[default]
    Server,
    /// The whole dataset is fetched once and paged in memory
    Client,
}

impl GridMode {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "server" => Some(Self::Server),
            "client" => Some(Self::Client),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }

    pub fn is_server(&self) -> bool {
        *self == Self::Server
    }
}

/// Grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub mode: GridMode,
    /// Remote endpoint rows are fetched from
    pub endpoint: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Document title handed to export encoders
    pub title: String,
    /// Initial page size
    pub page_size: u32,
    /// Quiet period before a server-mode fetch is issued
    pub debounce_ms: u64,
    /// Field holding the stable row identifier
    pub id_field: String,
    /// Response field holding the rows
    pub rows_key: String,
    /// Response field holding the total row count
    pub total_key: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            mode: GridMode::Server,
            endpoint: String::new(),
            columns: vec![],
            title: "Export".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            id_field: "id".to_string(),
            rows_key: "products".to_string(),
            total_key: "total".to_string(),
        }
    }
}

impl GridConfig {
    pub fn new(mode: GridMode, endpoint: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            mode,
            endpoint: endpoint.into(),
            columns,
            ..Self::default()
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the initial page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Load configuration from a key lookup, starting from defaults.
    ///
    /// Pass `|key| std::env::var(key).ok()` to read the process environment.
    pub fn from_lookup<F>(lookup: F) -> GridResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut errors = ValidationErrors::new();

        if let Some(mode) = lookup("GRID_MODE") {
            match GridMode::from_str(&mode) {
                Some(mode) => config.mode = mode,
                None => errors.add("GRID_MODE", format!("is not a known mode: {}", mode)),
            }
        }
        if let Some(endpoint) = lookup("GRID_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(title) = lookup("GRID_TITLE") {
            config.title = title;
        }
        if let Some(size) = lookup("GRID_PAGE_SIZE") {
            match size.parse() {
                Ok(size) => config.page_size = size,
                Err(_) => errors.add("GRID_PAGE_SIZE", "is not a number"),
            }
        }
        if let Some(ms) = lookup("GRID_DEBOUNCE_MS") {
            match ms.parse() {
                Ok(ms) => config.debounce_ms = ms,
                Err(_) => errors.add("GRID_DEBOUNCE_MS", "is not a number"),
            }
        }
        if let Some(field) = lookup("GRID_ID_FIELD") {
            config.id_field = field;
        }
        if let Some(key) = lookup("GRID_ROWS_KEY") {
            config.rows_key = key;
        }
        if let Some(key) = lookup("GRID_TOTAL_KEY") {
            config.total_key = key;
        }
        if let Some(columns) = lookup("GRID_COLUMNS") {
            match serde_json::from_str(&columns) {
                Ok(columns) => config.columns = columns,
                Err(e) => errors.add("GRID_COLUMNS", format!("is not a column list: {}", e)),
            }
        }

        errors.into_result()?;
        Ok(config)
    }

    /// Check the configuration, collecting every problem
    pub fn validate(&self) -> GridResult<()> {
        let mut errors = ValidationErrors::new();

        if self.mode.is_server() && self.endpoint.trim().is_empty() {
            errors.add("endpoint", "can't be blank in server mode");
        }
        if self.page_size == 0 {
            errors.add("page_size", "must be greater than 0");
        }
        if self.id_field.trim().is_empty() {
            errors.add("id_field", "can't be blank");
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.field_id.is_empty() {
                errors.add("columns", "field id can't be blank");
            } else if !seen.insert(column.field_id.as_str()) {
                errors.add("columns", format!("duplicate field id: {}", column.field_id));
            }
        }

        errors.into_result().map_err(GridError::from)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Look up a column by field id
    pub fn column(&self, field_id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.field_id == field_id)
    }
}
