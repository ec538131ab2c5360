// Work Category Domain Model

use serde::{Deserialize, Serialize};

/// Closed set of work categories for a collection run.
///
/// Categories are always processed in the fixed order of [`Category::ALL`];
/// resume logic relies on this order being stable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Followers,
    Following,
    Suggested,
}

impl Category {
    /// Fixed processing order for a run
    pub const ALL: [Category; 3] = [
        Category::Followers,
        Category::Following,
        Category::Suggested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Followers => "FOLLOWERS",
            Category::Following => "FOLLOWING",
            Category::Suggested => "SUGGESTED",
        }
    }

    /// Position of this category in the fixed processing order
    pub fn order(&self) -> usize {
        match self {
            Category::Followers => 0,
            Category::Following => 1,
            Category::Suggested => 2,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = crate::domain::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FOLLOWERS" => Ok(Category::Followers),
            "FOLLOWING" => Ok(Category::Following),
            "SUGGESTED" => Ok(Category::Suggested),
            other => Err(crate::domain::error::DomainError::UnknownCategory(
                other.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_order_matches_order_index() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.order(), i);
        }
    }

    #[test]
    fn test_round_trip_from_str() {
        for category in Category::ALL {
            let parsed: Category = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_unknown_category_rejected() {
        let result: Result<Category, _> = "STORIES".parse();
        assert!(result.is_err());
    }
}
