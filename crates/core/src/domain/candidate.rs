use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::tag::{merge_tags, TagSet};

/// Directories hand out this marker in place of an email they will not reveal.
pub const LOCKED_EMAIL_MARKER: &str = "email_not_unlocked";

/// Normalized identity used to collapse duplicate candidates.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DedupKey {
    Email(String),
    ProfileUrl(String),
}

impl DedupKey {
    pub fn value(&self) -> &str {
        match self {
            Self::Email(value) | Self::ProfileUrl(value) => value,
        }
    }

    /// Single-column form used by the persistence layer.
    pub fn storage_key(&self) -> String {
        self.to_string()
    }

    pub fn from_storage_key(raw: &str) -> Option<Self> {
        let (kind, value) = raw.split_once(':')?;
        match kind {
            "email" => normalize_email(value).map(Self::Email),
            "profile" => normalize_profile_url(value).map(Self::ProfileUrl),
            _ => None,
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(value) => write!(f, "email:{value}"),
            Self::ProfileUrl(value) => write!(f, "profile:{value}"),
        }
    }
}

/// One raw result from a directory search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub email: Option<String>,
    pub profile_url: Option<String>,
    pub provider_id: Option<String>,
    pub name: String,
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub tags: TagSet,
}

impl CandidateRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_profile_url(mut self, profile_url: impl Into<String>) -> Self {
        self.profile_url = Some(profile_url.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_company(mut self, company_name: impl Into<String>) -> Self {
        self.company_name = Some(company_name.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Email first, profile URL second. `None` means the record is unkeyable.
    pub fn dedup_key(&self) -> Option<DedupKey> {
        self.email
            .as_deref()
            .and_then(normalize_email)
            .map(DedupKey::Email)
            .or_else(|| {
                self.profile_url.as_deref().and_then(normalize_profile_url).map(DedupKey::ProfileUrl)
            })
    }

    /// Usable email, i.e. one that survives normalization.
    pub fn usable_email(&self) -> Option<String> {
        self.email.as_deref().and_then(normalize_email)
    }

    pub fn company(&self) -> Option<&str> {
        self.company_name.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }

    pub fn add_tags(&mut self, tags: &TagSet) {
        merge_tags(&mut self.tags, tags);
    }
}

pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_ascii_lowercase();
    if email.contains(LOCKED_EMAIL_MARKER) {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || email.contains(char::is_whitespace) {
        return None;
    }
    Some(email)
}

pub fn normalize_profile_url(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    let without_query = without_www.split(['?', '#']).next().unwrap_or_default();
    let normalized = without_query.trim_end_matches('/');
    (!normalized.is_empty()).then(|| normalized.to_string())
}
