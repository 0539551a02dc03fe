use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_MODEL: &str = "anthropic/claude-3.7-sonnet";

/// Group key for ids without a usable provider segment.
pub const OTHER_PROVIDER: &str = "other";

const BUILTIN_MODELS: &[&str] = &[
    "anthropic/claude-3.7-sonnet",
    "anthropic/claude-3-opus",
    "anthropic/claude-3-sonnet",
    "anthropic/claude-3-haiku",
    "anthropic/claude-3.5-sonnet",
    "google/gemini-1.5-pro",
    "google/gemini-1.5-flash",
    "openai/gpt-4o",
    "openai/gpt-4-turbo",
    "openai/gpt-3.5-turbo",
    "meta/llama-3-70b-instruct",
    "mistral/mistral-large",
    "mistral/mistral-medium",
];

/// Ordered set of selectable model ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelCatalog {
    ids: Vec<String>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        Self {
            ids: BUILTIN_MODELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|m| m == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|m| m == id)
    }

    /// Installs a refreshed list. Blank entries and duplicates are dropped;
    /// if nothing usable remains the current catalog stays and `false` is
    /// returned.
    pub fn replace(&mut self, fresh: Vec<String>) -> bool {
        let mut seen = HashSet::new();
        let cleaned: Vec<String> = fresh
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if cleaned.is_empty() {
            return false;
        }
        self.ids = cleaned;
        true
    }

    pub fn filter(&self, query: &str) -> Vec<String> {
        filter_models(&self.ids, query)
    }
}

/// Every whitespace-separated term of `query` must appear, case-insensitively,
/// somewhere in the id. Order of `ids` is preserved.
pub fn filter_models(ids: &[String], query: &str) -> Vec<String> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() {
        return ids.to_vec();
    }
    ids.iter()
        .filter(|id| {
            let lower = id.to_lowercase();
            terms.iter().all(|t| lower.contains(t.as_str()))
        })
        .cloned()
        .collect()
}

pub fn provider_of(id: &str) -> &str {
    match id.split_once('/') {
        Some((provider, _)) if !provider.trim().is_empty() => provider,
        _ => OTHER_PROVIDER,
    }
}

/// Id with its provider prefix removed, for display under a group header.
pub fn display_name(id: &str) -> &str {
    match id.split_once('/') {
        Some((provider, rest)) if !provider.trim().is_empty() => rest,
        _ => id,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderGroup<'a> {
    pub provider: &'a str,
    pub models: Vec<&'a str>,
}

/// Partitions `ids` by provider; groups come out sorted by provider key and
/// keep the input order inside each group.
pub fn group_by_provider(ids: &[String]) -> Vec<ProviderGroup<'_>> {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for id in ids {
        grouped.entry(provider_of(id)).or_default().push(id.as_str());
    }
    grouped
        .into_iter()
        .map(|(provider, models)| ProviderGroup { provider, models })
        .collect()
}
