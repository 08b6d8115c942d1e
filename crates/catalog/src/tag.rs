use core::str::FromStr;

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, ProductId, TagGroupId, TagId};

/// The tag groups the catalog filter understands.
///
/// The set is fixed: a group stored under any other slug is never offered as a
/// facet and never constrains a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TagGroupSlug {
    #[serde(rename = "type")]
    Type,
    #[serde(rename = "grade-level")]
    GradeLevel,
    #[serde(rename = "subject")]
    Subject,
    #[serde(rename = "framework")]
    Framework,
}

impl TagGroupSlug {
    pub const ALL: [TagGroupSlug; 4] = [
        TagGroupSlug::Type,
        TagGroupSlug::GradeLevel,
        TagGroupSlug::Subject,
        TagGroupSlug::Framework,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TagGroupSlug::Type => "type",
            TagGroupSlug::GradeLevel => "grade-level",
            TagGroupSlug::Subject => "subject",
            TagGroupSlug::Framework => "framework",
        }
    }

    /// Lenient lookup used when decoding query parameters: unknown slugs are `None`.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == slug)
    }
}

impl core::fmt::Display for TagGroupSlug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagGroupSlug {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slug(s)
            .ok_or_else(|| DomainError::validation(format!("unknown tag group '{s}'")))
    }
}

/// A filter category (e.g. "Grade Level").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    pub id: TagGroupId,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
}

impl TagGroup {
    pub fn recognized_slug(&self) -> Option<TagGroupSlug> {
        TagGroupSlug::from_slug(&self.slug)
    }
}

/// A single filter option; belongs to exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub tag_group_id: TagGroupId,
    pub sort_order: i32,
}

/// Row of the product/tag join table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductTag {
    pub product_id: ProductId,
    pub tag_id: TagId,
}

/// A recognized tag group with its tags, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    #[serde(flatten)]
    pub group: TagGroup,
    pub tags: Vec<Tag>,
}

/// Group tags under their (recognized) groups, both ordered by `sort_order`.
///
/// Tags whose group is missing or unrecognized are dropped.
pub fn build_facets(mut groups: Vec<TagGroup>, tags: Vec<Tag>) -> Vec<Facet> {
    groups.retain(|g| g.recognized_slug().is_some());
    groups.sort_by_key(|g| g.sort_order);

    let mut facets: Vec<Facet> = groups
        .into_iter()
        .map(|group| Facet { group, tags: Vec::new() })
        .collect();

    for tag in tags {
        if let Some(facet) = facets.iter_mut().find(|f| f.group.id == tag.tag_group_id) {
            facet.tags.push(tag);
        }
    }
    for facet in &mut facets {
        facet.tags.sort_by_key(|t| t.sort_order);
    }
    facets
}
