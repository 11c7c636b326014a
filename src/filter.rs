//! Client-side view filter and derived counters.
//!
//! Everything here is pure: the derived list is a function of (items, filter) only.

use serde::{Deserialize, Serialize};

use crate::models::ItemView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(&self, item: &ItemView) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !item.completed(),
            Filter::Completed => item.completed(),
        }
    }

    /// Keep the items matching this filter, preserving order.
    pub fn apply<'a>(&self, items: &'a [ItemView]) -> Vec<&'a ItemView> {
        items.iter().filter(|item| self.matches(item)).collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived counters over an item set. `active + completed == total` by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Counts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl Counts {
    pub fn of(items: &[ItemView]) -> Self {
        let total = items.len();
        let active = items.iter().filter(|item| !item.completed()).count();
        Self {
            total,
            active,
            completed: total - active,
        }
    }
}
