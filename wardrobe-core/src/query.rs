//! Filtering and ordering over a local snapshot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{sort_newest_first, ItemRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Clean,
    Dirty,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "clean" => Ok(Self::Clean),
            "dirty" => Ok(Self::Dirty),
            other => Err(format!(
                "unknown status '{other}'; expected: all, clean, dirty"
            )),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Clean => write!(f, "clean"),
            StatusFilter::Dirty => write!(f, "dirty"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// Selection over cached items. The default selects everything, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ItemFilter {
    /// Matches the `category` attribute, ignoring case.
    pub category: Option<String>,
    pub status: StatusFilter,
    pub sort: SortOrder,
}

impl ItemFilter {
    /// Items available for an outfit suggestion.
    pub fn clean_only() -> Self {
        Self {
            status: StatusFilter::Clean,
            ..Self::default()
        }
    }

    pub fn matches(&self, item: &ItemRecord) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Clean => item.is_clean,
            StatusFilter::Dirty => !item.is_clean,
        };
        let category_ok = match &self.category {
            None => true,
            Some(wanted) => item
                .category()
                .map(|c| c.eq_ignore_ascii_case(wanted))
                .unwrap_or(false),
        };
        status_ok && category_ok
    }

    pub fn apply(&self, items: &[ItemRecord]) -> Vec<ItemRecord> {
        let mut selected: Vec<ItemRecord> =
            items.iter().filter(|i| self.matches(i)).cloned().collect();
        sort_newest_first(&mut selected);
        if self.sort == SortOrder::Oldest {
            selected.reverse();
        }
        selected
    }
}
