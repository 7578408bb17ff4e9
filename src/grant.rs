//! Grant records and dataset loading.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::LayoutError;

/// Funding instrument of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Projects,
    Careers,
    #[serde(rename = "Science Communication", alias = "ScienceCommunication")]
    ScienceCommunication,
    Programmes,
    Infrastructure,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::Projects,
        Self::Careers,
        Self::ScienceCommunication,
        Self::Programmes,
        Self::Infrastructure,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Projects => "Projects",
            Self::Careers => "Careers",
            Self::ScienceCommunication => "Science Communication",
            Self::Programmes => "Programmes",
            Self::Infrastructure => "Infrastructure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub amount: f64,
    #[serde(rename = "type", alias = "category")]
    pub category: Category,
    /// Discipline label
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub year: i64,
}

/// Parse a JSON array of grants and check the record invariants.
pub fn parse_grants(json: &str) -> Result<Vec<GrantRecord>, LayoutError> {
    let grants: Vec<GrantRecord> = serde_json::from_str(json)?;
    validate_grants(&grants)?;
    tracing::debug!(count = grants.len(), "Loaded grant dataset");
    Ok(grants)
}

/// Ids must be unique and amounts finite and non-negative.
pub fn validate_grants(grants: &[GrantRecord]) -> Result<(), LayoutError> {
    let mut seen: HashSet<i64> = HashSet::with_capacity(grants.len());

    for grant in grants {
        if !seen.insert(grant.id) {
            return Err(LayoutError::InvalidRecord {
                id: grant.id,
                reason: "duplicate id".to_string(),
            });
        }
        if !grant.amount.is_finite() || grant.amount < 0.0 {
            return Err(LayoutError::InvalidRecord {
                id: grant.id,
                reason: format!("amount {} must be a non-negative number", grant.amount),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_format() {
        let json = r#"[
            {"id": 2, "title": "Glaciers", "amount": 250000, "type": "Projects", "field": "Earth sciences"},
            {"id": 1, "title": "Outreach", "amount": 40000.5, "type": "Science Communication", "field": "Physics", "year": 2024}
        ]"#;
        let grants = parse_grants(json).unwrap();

        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].category, Category::Projects);
        assert_eq!(grants[0].year, 0);
        assert_eq!(grants[1].category, Category::ScienceCommunication);
        assert_eq!(grants[1].year, 2024);
    }

    #[test]
    fn test_unknown_category() {
        let json = r#"[{"id": 1, "amount": 1, "type": "Lottery"}]"#;
        assert!(matches!(parse_grants(json), Err(LayoutError::Json(_))));
    }

    #[test]
    fn test_duplicate_id() {
        let json = r#"[
            {"id": 7, "amount": 1, "type": "Careers"},
            {"id": 7, "amount": 2, "type": "Careers"}
        ]"#;
        let err = parse_grants(json).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidRecord { id: 7, .. }));
    }

    #[test]
    fn test_negative_amount() {
        let json = r#"[{"id": 3, "amount": -5, "type": "Programmes"}]"#;
        assert!(parse_grants(json).is_err());
    }

    #[test]
    fn test_empty_dataset() {
        assert!(parse_grants("[]").unwrap().is_empty());
    }
}
