//! Columns and the column-visibility mask

use std::collections::BTreeMap;

use gv_core::ColumnDescriptor;

/// Which columns the user has hidden. Columns not in the mask are visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnVisibility {
    mask: BTreeMap<String, bool>,
}

impl ColumnVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column's visibility, returning whether anything changed
    pub fn set(&mut self, field_id: impl Into<String>, visible: bool) -> bool {
        let field_id = field_id.into();
        let was_visible = self.is_visible(&field_id);
        self.mask.insert(field_id, visible);
        was_visible != visible
    }

    pub fn is_visible(&self, field_id: &str) -> bool {
        self.mask.get(field_id).copied().unwrap_or(true)
    }
}

/// The configured columns of a grid, in display order
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    /// Get all columns
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Look up a column by field id
    pub fn get(&self, field_id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.field_id == field_id)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Columns not hidden by the mask, in display order
    pub fn visible(&self, visibility: &ColumnVisibility) -> Vec<ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| visibility.is_visible(&c.field_id))
            .cloned()
            .collect()
    }
}
