//! Column filters
//!
//! A filter set holds at most one filter per column. Entries keep their
//! insertion order, which is also the order they serialize in.

use std::cmp::Ordering;

use gv_core::{ColumnDescriptor, Row};

/// Separates field, operator and value inside one filter token
pub const FIELD_DELIMITER: char = ':';
/// Separates filter tokens inside a fragment
pub const ENTRY_DELIMITER: char = ',';

/// Filter operators that can be applied to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// Equals
    Equals,
    /// Not equals
    NotEquals,
    /// Contains (case-insensitive)
    Contains,
    /// Does not contain
    NotContains,
    /// Starts with
    StartsWith,
    /// Ends with
    EndsWith,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
}

impl FilterOperator {
    /// Parse operator from its wire name
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "equals" | "=" => Some(Self::Equals),
            "notEquals" | "!=" => Some(Self::NotEquals),
            "contains" => Some(Self::Contains),
            "notContains" => Some(Self::NotContains),
            "startsWith" => Some(Self::StartsWith),
            "endsWith" => Some(Self::EndsWith),
            "gt" | ">" => Some(Self::GreaterThan),
            "gte" | ">=" => Some(Self::GreaterThanOrEqual),
            "lt" | "<" => Some(Self::LessThan),
            "lte" | "<=" => Some(Self::LessThanOrEqual),
            _ => None,
        }
    }

    /// Wire name of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::GreaterThan => "gt",
            Self::GreaterThanOrEqual => "gte",
            Self::LessThan => "lt",
            Self::LessThanOrEqual => "lte",
        }
    }

    /// Operator used when a user types into a column's filter box
    pub fn for_column(column: &ColumnDescriptor) -> Self {
        if column.is_numeric() {
            Self::Equals
        } else {
            Self::Contains
        }
    }

    /// Evaluate against a cell's text
    pub fn evaluate(&self, cell: &str, value: &str) -> bool {
        let lower_cell = || cell.to_lowercase();
        let lower_value = || value.to_lowercase();

        match self {
            Self::Equals => compare(cell, value) == Ordering::Equal,
            Self::NotEquals => compare(cell, value) != Ordering::Equal,
            Self::Contains => lower_cell().contains(&lower_value()),
            Self::NotContains => !lower_cell().contains(&lower_value()),
            Self::StartsWith => lower_cell().starts_with(&lower_value()),
            Self::EndsWith => lower_cell().ends_with(&lower_value()),
            Self::GreaterThan => compare(cell, value) == Ordering::Greater,
            Self::GreaterThanOrEqual => compare(cell, value) != Ordering::Less,
            Self::LessThan => compare(cell, value) == Ordering::Less,
            Self::LessThanOrEqual => compare(cell, value) != Ordering::Greater,
        }
    }
}

/// Numeric comparison when both sides are numbers, case-insensitive text otherwise
fn compare(cell: &str, value: &str) -> Ordering {
    match (cell.trim().parse::<f64>(), value.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => cell.to_lowercase().cmp(&value.to_lowercase()),
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterItem {
    /// The column being filtered
    pub field_id: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterItem {
    pub fn new(field_id: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            operator,
            value: value.into(),
        }
    }

    /// `field:operator:value`
    pub fn to_token(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.field_id,
            FIELD_DELIMITER,
            self.operator.as_str(),
            FIELD_DELIMITER,
            self.value
        )
    }

    /// Parse a `field:operator:value` token; the value may itself contain `:`
    pub fn parse_token(token: &str) -> Option<Self> {
        let mut parts = token.splitn(3, FIELD_DELIMITER);
        let field = parts.next()?.trim();
        let operator = FilterOperator::from_str(parts.next()?.trim())?;
        let value = parts.next().unwrap_or("");
        if field.is_empty() {
            return None;
        }
        Some(Self::new(field, operator, value))
    }

    /// Check a row against this filter
    pub fn matches(&self, row: &Row) -> bool {
        self.operator.evaluate(&row.text(&self.field_id), &self.value)
    }
}

/// Outcome of a filter mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    Added,
    Updated,
    Removed,
    Unchanged,
}

impl FilterChange {
    pub fn is_changed(&self) -> bool {
        *self != Self::Unchanged
    }
}

/// Filter set - at most one filter per column, AND semantics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    items: Vec<FilterItem>,
}

impl FilterSet {
    /// Create a new empty filter set
    pub fn new() -> Self {
        Self { items: vec![] }
    }

    /// Insert, replace or remove the filter for `field_id`.
    ///
    /// An empty value removes an existing filter; it never adds one.
    pub fn upsert(
        &mut self,
        field_id: &str,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> FilterChange {
        let value = value.into();

        match self.items.iter().position(|f| f.field_id == field_id) {
            Some(index) if value.is_empty() => {
                self.items.remove(index);
                FilterChange::Removed
            }
            Some(index) => {
                let item = &mut self.items[index];
                if item.operator == operator && item.value == value {
                    FilterChange::Unchanged
                } else {
                    item.operator = operator;
                    item.value = value;
                    FilterChange::Updated
                }
            }
            None if value.is_empty() => FilterChange::Unchanged,
            None => {
                self.items.push(FilterItem::new(field_id, operator, value));
                FilterChange::Added
            }
        }
    }

    /// Upsert (builder pattern)
    pub fn with(mut self, field_id: &str, operator: FilterOperator, value: impl Into<String>) -> Self {
        self.upsert(field_id, operator, value);
        self
    }

    /// Get all filters
    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    /// Get the filter for a column
    pub fn get(&self, field_id: &str) -> Option<&FilterItem> {
        self.items.iter().find(|f| f.field_id == field_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Serialize as `field:operator:value` tokens joined by `,`, in set order
    pub fn to_query_fragment(&self) -> String {
        self.items
            .iter()
            .map(FilterItem::to_token)
            .collect::<Vec<_>>()
            .join(&ENTRY_DELIMITER.to_string())
    }

    /// Parse a fragment produced by [`FilterSet::to_query_fragment`].
    ///
    /// Malformed tokens are skipped; a repeated column keeps its last value.
    pub fn parse_fragment(fragment: &str) -> Self {
        let mut set = Self::new();
        for token in fragment.split(ENTRY_DELIMITER) {
            if let Some(item) = FilterItem::parse_token(token) {
                set.upsert(&item.field_id, item.operator, item.value);
            }
        }
        set
    }

    /// Check a row against every filter
    pub fn matches(&self, row: &Row) -> bool {
        self.items.iter().all(|f| f.matches(row))
    }
}
