use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provenance label attached to a candidate: which iteration produced it and
/// which intent categories the producing query targeted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Tag {
    Iteration(u32),
    Category(String),
}

pub type TagSet = BTreeSet<Tag>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TagParseError {
    #[error("tag `{0}` is missing a `kind:` prefix")]
    MissingKind(String),
    #[error("unknown tag kind `{0}`")]
    UnknownKind(String),
    #[error("invalid tag value `{0}`")]
    InvalidValue(String),
}

impl Tag {
    pub fn iteration(number: u32) -> Self {
        Self::Iteration(number)
    }

    /// Returns `None` when the label normalizes to nothing.
    pub fn category(label: &str) -> Option<Self> {
        let normalized = normalize_category(label);
        (!normalized.is_empty()).then_some(Self::Category(normalized))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Iteration(_) => "iteration",
            Self::Category(_) => "category",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iteration(number) => write!(f, "iteration:{number}"),
            Self::Category(label) => write!(f, "category:{label}"),
        }
    }
}

impl FromStr for Tag {
    type Err = TagParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (kind, raw) =
            value.trim().split_once(':').ok_or_else(|| TagParseError::MissingKind(value.into()))?;
        match kind {
            "iteration" => raw
                .parse::<u32>()
                .map(Self::Iteration)
                .map_err(|_| TagParseError::InvalidValue(raw.to_string())),
            "category" => Self::category(raw).ok_or_else(|| TagParseError::InvalidValue(raw.into())),
            other => Err(TagParseError::UnknownKind(other.to_string())),
        }
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_string()
    }
}

impl TryFrom<String> for Tag {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Union merge. Existing tags are never removed or rewritten.
pub fn merge_tags(into: &mut TagSet, other: &TagSet) {
    into.extend(other.iter().cloned());
}

pub fn render_tags(tags: &TagSet) -> String {
    if tags.is_empty() {
        return "no tags".to_string();
    }
    tags.iter().map(Tag::to_string).collect::<Vec<_>>().join(", ")
}

fn normalize_category(label: &str) -> String {
    let mut normalized = String::with_capacity(label.len());
    let mut pending_separator = false;
    for character in label.trim().chars() {
        if character.is_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('_');
            }
            pending_separator = false;
            normalized.extend(character.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::{merge_tags, render_tags, Tag, TagParseError, TagSet};

    #[test]
    fn category_labels_are_normalized_to_snake_case() {
        assert_eq!(Tag::category("  Venture Capital "), Some(Tag::Category("venture_capital".into())));
        assert_eq!(Tag::category("B2B--SaaS"), Some(Tag::Category("b2b_saas".into())));
        assert_eq!(Tag::category(" - "), None);
    }

    #[test]
    fn textual_form_parses_back() {
        let tag: Tag = "iteration:4".parse().expect("iteration tag");
        assert_eq!(tag, Tag::Iteration(4));
        assert_eq!(Tag::Category("fintech".into()).to_string(), "category:fintech");

        assert_eq!("saas".parse::<Tag>(), Err(TagParseError::MissingKind("saas".into())));
        assert_eq!("color:red".parse::<Tag>(), Err(TagParseError::UnknownKind("color".into())));
        assert!(matches!("iteration:x".parse::<Tag>(), Err(TagParseError::InvalidValue(_))));
    }

    #[test]
    fn merge_is_a_union_that_keeps_existing_tags() {
        let mut tags = TagSet::from([Tag::Iteration(1), Tag::Category("saas".into())]);
        let incoming = TagSet::from([Tag::Iteration(2), Tag::Category("saas".into())]);

        merge_tags(&mut tags, &incoming);

        assert_eq!(tags.len(), 3);
        assert!(tags.contains(&Tag::Iteration(1)));
        assert!(tags.contains(&Tag::Iteration(2)));
        assert_eq!(render_tags(&tags), "iteration:1, iteration:2, category:saas");
        assert_eq!(render_tags(&TagSet::new()), "no tags");
    }
}
