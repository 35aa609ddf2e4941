//! # Query Module
//!
//! Filter and search descriptors shared by the cache, the raw stream and
//! the binary.
//!
//! - Category is an exact match on `entry_type`
//! - Tags use AND semantics
//! - Keyword search is a case-insensitive substring match, tried against
//!   title, then summary, then tags; the first hit decides

use crate::Entry;

/// Filter applied by `list`, `stream_filtered` and `find_by_tag`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Exact `entry_type` to keep.
    pub category: Option<String>,
    /// Every tag here must be present on the entry.
    pub tags: Vec<String>,
    /// Keep deprecated entries too.
    pub include_deprecated: bool,
}

impl EntryFilter {
    /// Filter that keeps every live entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Require one more tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Require every tag in `tags`.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn include_deprecated(mut self, include: bool) -> Self {
        self.include_deprecated = include;
        self
    }

    /// Check a single entry against the filter.
    #[must_use]
    pub fn matches(&self, entry: &Entry) -> bool {
        if !self.include_deprecated && entry.deprecated {
            return false;
        }
        if self
            .category
            .as_ref()
            .is_some_and(|category| entry.entry_type != *category)
        {
            return false;
        }
        entry.has_all_tags(&self.tags)
    }
}

/// Which field satisfied a keyword search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Title,
    Summary,
    Tag,
}

/// Keyword search with the category/tag filters of [`EntryFilter`].
///
/// Deprecated entries are never returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl SearchQuery {
    /// Query that matches every live entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Search for a keyword.
    #[must_use]
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// The equivalent listing filter (live entries only).
    #[must_use]
    pub fn filter(&self) -> EntryFilter {
        EntryFilter {
            category: self.category.clone(),
            tags: self.tags.clone(),
            include_deprecated: false,
        }
    }

    /// Return the first field the keyword hits, in title, summary, tag order.
    ///
    /// With no keyword every entry passing the filter matches on its title.
    #[must_use]
    pub fn matched_field(&self, entry: &Entry) -> Option<MatchField> {
        if !self.filter().matches(entry) {
            return None;
        }
        let Some(keyword) = &self.keyword else {
            return Some(MatchField::Title);
        };
        let needle = keyword.to_lowercase();
        if entry.title.to_lowercase().contains(&needle) {
            Some(MatchField::Title)
        } else if entry.summary.to_lowercase().contains(&needle) {
            Some(MatchField::Summary)
        } else if entry
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
        {
            Some(MatchField::Tag)
        } else {
            None
        }
    }

    #[must_use]
    pub fn matches(&self, entry: &Entry) -> bool {
        self.matched_field(entry).is_some()
    }
}

// =============================================================================
// TESTS
// =============================================================================
