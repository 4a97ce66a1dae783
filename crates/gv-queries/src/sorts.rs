//! Sort specification
//!
//! Sort criteria are applied in order; the first entry is the primary key.

use crate::filters::{ENTRY_DELIMITER, FIELD_DELIMITER};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1)
    Desc,
}

impl SortDirection {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A single sort criterion
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortCriterion {
    pub field_id: String,
    pub direction: SortDirection,
}

impl SortCriterion {
    pub fn new(field_id: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field_id: field_id.into(),
            direction,
        }
    }

    pub fn asc(field_id: impl Into<String>) -> Self {
        Self::new(field_id, SortDirection::Asc)
    }

    pub fn desc(field_id: impl Into<String>) -> Self {
        Self::new(field_id, SortDirection::Desc)
    }

    /// `field:direction`
    pub fn to_token(&self) -> String {
        format!("{}{}{}", self.field_id, FIELD_DELIMITER, self.direction.as_str())
    }
}

/// Ordered collection of sort criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    criteria: Vec<SortCriterion>,
}

impl SortSpec {
    /// Create a new empty sort spec
    pub fn new() -> Self {
        Self { criteria: vec![] }
    }

    /// Create with a single criterion
    pub fn by(field_id: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            criteria: vec![SortCriterion::new(field_id, direction)],
        }
    }

    /// Add a criterion (builder pattern)
    pub fn then(mut self, criterion: SortCriterion) -> Self {
        self.add(criterion);
        self
    }

    /// Add a criterion; an existing criterion for the same field is replaced in place
    pub fn add(&mut self, criterion: SortCriterion) -> &mut Self {
        match self
            .criteria
            .iter_mut()
            .find(|c| c.field_id == criterion.field_id)
        {
            Some(existing) => existing.direction = criterion.direction,
            None => self.criteria.push(criterion),
        }
        self
    }

    /// Get all sort criteria
    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn clear(&mut self) {
        self.criteria.clear();
    }

    /// Serialize as `field:direction` tokens joined by `,`, in priority order
    pub fn to_token(&self) -> String {
        self.criteria
            .iter()
            .map(SortCriterion::to_token)
            .collect::<Vec<_>>()
            .join(&ENTRY_DELIMITER.to_string())
    }

    /// Parse a sort token; a bare field sorts ascending
    pub fn parse_token(token: &str) -> Self {
        let mut spec = Self::new();
        for part in token.split(ENTRY_DELIMITER) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let criterion = match part.rsplit_once(FIELD_DELIMITER) {
                Some((field, dir)) => match SortDirection::from_str(dir) {
                    Some(direction) => SortCriterion::new(field, direction),
                    None => SortCriterion::asc(part),
                },
                None => SortCriterion::asc(part),
            };
            spec.add(criterion);
        }
        spec
    }
}
