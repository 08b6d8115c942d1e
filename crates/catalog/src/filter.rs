//! The catalog filter and its query-string encoding.
//!
//! A filter is a plain value: the storefront mirrors it into the address bar
//! and re-reads it on load, so encoding and decoding must agree exactly.
//!
//! | Parameter | Meaning | Default |
//! |-----------|---------|---------|
//! | `page` | zero-based page | `0` |
//! | `pageSize` | rows per page | `20` |
//! | `status` | visibility status (an unknown value matches no product) | `published` |
//! | `is_active` | visibility flag (anything but `false` is `true`) | `true` |
//! | `q` | free-text search | none |
//! | `type`, `grade-level`, `subject`, `framework` | comma-joined tag ids | none |

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use storefront_core::{DomainError, DomainResult, TagId, ValueObject};

use crate::page::PageRequest;
use crate::product::{ProductStatus, Visibility};
use crate::search::SearchText;
use crate::tag::TagGroupSlug;

pub const PARAM_PAGE: &str = "page";
pub const PARAM_PAGE_SIZE: &str = "pageSize";
pub const PARAM_STATUS: &str = "status";
pub const PARAM_IS_ACTIVE: &str = "is_active";
pub const PARAM_SEARCH: &str = "q";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogFilter {
    selected_tags: BTreeMap<TagGroupSlug, BTreeSet<TagId>>,
    search: Option<SearchText>,
    visibility: Visibility,
    /// Raw `status` value that names no known status.
    unmatched_status: Option<String>,
    page: PageRequest,
}

impl ValueObject for CatalogFilter {}

impl CatalogFilter {
    /// Public defaults: published + active, first page of 20, no tags, no search.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add tags to a group's selection. Selecting nothing leaves the group inactive.
    pub fn with_tags<I>(mut self, group: TagGroupSlug, tags: I) -> Self
    where
        I: IntoIterator<Item = TagId>,
    {
        let tags: BTreeSet<TagId> = tags.into_iter().collect();
        if !tags.is_empty() {
            self.selected_tags.entry(group).or_default().extend(tags);
        }
        self
    }

    pub fn with_search(mut self, raw: &str) -> Self {
        self.search = SearchText::parse(raw);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self.unmatched_status = None;
        self
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn search(&self) -> Option<&SearchText> {
        self.search.as_ref()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }

    /// `true` when the requested status is not one any product can have, so
    /// the visibility gate admits nothing.
    pub fn matches_nothing(&self) -> bool {
        self.unmatched_status.is_some()
    }

    pub fn selected(&self, group: TagGroupSlug) -> Option<&BTreeSet<TagId>> {
        self.selected_tags.get(&group)
    }

    /// Groups with at least one tag selected, in `TagGroupSlug` order.
    pub fn active_groups(&self) -> impl Iterator<Item = (TagGroupSlug, &BTreeSet<TagId>)> + '_ {
        self.selected_tags
            .iter()
            .filter(|(_, tags)| !tags.is_empty())
            .map(|(group, tags)| (*group, tags))
    }

    pub fn has_tag_constraint(&self) -> bool {
        self.active_groups().next().is_some()
    }

    /// Encode as query parameters. Defaults are written out too, so the
    /// result is self-describing; empty groups and absent search are omitted.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (PARAM_PAGE.to_string(), self.page.page().to_string()),
            (PARAM_PAGE_SIZE.to_string(), self.page.page_size().to_string()),
            (
                PARAM_STATUS.to_string(),
                self.unmatched_status
                    .clone()
                    .unwrap_or_else(|| self.visibility.status.to_string()),
            ),
            (PARAM_IS_ACTIVE.to_string(), self.visibility.is_active.to_string()),
        ];
        if let Some(q) = &self.search {
            pairs.push((PARAM_SEARCH.to_string(), q.as_str().to_string()));
        }
        for (group, tags) in self.active_groups() {
            pairs.push((group.as_str().to_string(), encode_tag_list(tags)));
        }
        pairs
    }

    /// Decode query parameters. Unknown keys (including unrecognized tag
    /// groups) are ignored; later duplicates of a scalar key win, repeated
    /// group keys accumulate.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = CatalogFilter::new();
        let mut page = 0u32;
        let mut page_size = crate::page::DEFAULT_PAGE_SIZE;

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                PARAM_PAGE => page = parse_number(PARAM_PAGE, value)?,
                PARAM_PAGE_SIZE => page_size = parse_number(PARAM_PAGE_SIZE, value)?,
                PARAM_STATUS => match value.parse::<ProductStatus>() {
                    Ok(status) => {
                        filter.visibility.status = status;
                        filter.unmatched_status = None;
                    }
                    Err(_) => filter.unmatched_status = Some(value.trim().to_string()),
                },
                PARAM_IS_ACTIVE => filter.visibility.is_active = value.trim() != "false",
                PARAM_SEARCH => filter.search = SearchText::parse(value),
                other => {
                    if let Some(group) = TagGroupSlug::from_slug(other) {
                        let tags = decode_tag_list(value)?;
                        filter = filter.with_tags(group, tags);
                    }
                }
            }
        }

        filter.page = PageRequest::new(page, page_size)?;
        Ok(filter)
    }
}

/// Comma-joined tag ids, ascending.
pub fn encode_tag_list(tags: &BTreeSet<TagId>) -> String {
    tags.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Split on commas, trim, drop empty entries, parse each id.
pub fn decode_tag_list(raw: &str) -> DomainResult<BTreeSet<TagId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<TagId>)
        .collect()
}

fn parse_number(name: &str, raw: &str) -> DomainResult<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| DomainError::validation(format!("{name} must be a non-negative integer")))
}
