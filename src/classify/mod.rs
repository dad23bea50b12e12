//! Page archetype classification
//!
//! This module turns a URL (plus an optional page title) into one of a small
//! set of page archetypes. Classification is a pure function: the same input
//! always yields the same category, and no input ever fails to classify.
//!
//! # Components
//!
//! - `rules`: the ordered rule cascade and keyword tables
//! - `slug`: short stable identifiers derived from URL paths

mod rules;
mod slug;

pub use rules::{classify, Rule, RULES};
pub use slug::slug;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Page archetype assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Home,
    Search,
    About,
    Contact,
    Faq,
    News,
    Product,
    Other,
}

impl Category {
    /// Human-readable label used in selection rows
    pub fn label(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Search => "Search",
            Self::About => "About",
            Self::Contact => "Contact",
            Self::Faq => "FAQ",
            Self::News => "News",
            Self::Product => "Product",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregation level of a News or Product page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubType {
    List,
    Detail,
}

/// Output of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub subtype: Option<SubType>,
    pub score: u8,
}

impl Classification {
    /// The fallback classification for pages no rule recognises
    pub const OTHER: Classification = Classification {
        category: Category::Other,
        subtype: None,
        score: 0,
    };

    pub fn is_detail(&self) -> bool {
        self.subtype == Some(SubType::Detail)
    }
}
