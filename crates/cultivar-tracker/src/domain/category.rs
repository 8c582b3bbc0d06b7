//! Category name normalization
//!
//! Categories are free-form strings supplied by callers, so "Security",
//! "security" and " security " must land on the same investment. Names are
//! matched on a folded key (trimmed, inner whitespace collapsed, lowercased);
//! the first registered or persisted spelling is canonical.

use std::collections::BTreeMap;

use cultivar_common::{PortfolioSnapshot, ValidationError};

/// Registry of canonical category names
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    /// folded key → canonical spelling
    canonical: BTreeMap<String, String>,
    /// Reject names that are not registered
    strict: bool,
}

impl CategoryRegistry {
    /// Registry that accepts any non-empty name
    pub fn open() -> Self {
        Self::default()
    }

    /// Registry that only accepts the given names
    pub fn strict<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::with_names(names);
        registry.strict = true;
        registry
    }

    /// Open registry seeded with preferred spellings
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::open();
        for name in names {
            registry.register(name.as_ref());
        }
        registry
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Register a canonical spelling; the first spelling for a key wins.
    pub fn register(&mut self, name: &str) {
        let tidy = tidy(name);
        if tidy.is_empty() {
            return;
        }
        self.canonical.entry(fold(&tidy)).or_insert(tidy);
    }

    pub fn registered(&self) -> impl Iterator<Item = &str> + '_ {
        self.canonical.values().map(String::as_str)
    }

    /// Checks that need no persisted state: emptiness and strict membership.
    pub fn validate(&self, raw: &str) -> Result<(), ValidationError> {
        let tidy = tidy(raw);
        if tidy.is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if self.strict && !self.canonical.contains_key(&fold(&tidy)) {
            return Err(ValidationError::UnknownCategory(tidy));
        }
        Ok(())
    }

    /// Canonical name for a category being written.
    ///
    /// Registered names win, then a case-insensitive match among categories
    /// already in `snapshot`, then the tidied input itself (open mode only).
    pub fn canonicalize(
        &self,
        raw: &str,
        snapshot: &PortfolioSnapshot,
    ) -> Result<String, ValidationError> {
        self.validate(raw)?;
        Ok(self.resolve(raw, snapshot))
    }

    /// Lenient lookup for read paths: never fails, unknown names are tidied.
    pub fn resolve(&self, raw: &str, snapshot: &PortfolioSnapshot) -> String {
        let tidy = tidy(raw);
        let key = fold(&tidy);
        if let Some(canonical) = self.canonical.get(&key) {
            return canonical.clone();
        }
        snapshot
            .categories()
            .into_iter()
            .find(|existing| fold(existing) == key)
            .map(str::to_string)
            .unwrap_or(tidy)
    }
}

/// Trim and collapse inner whitespace
fn tidy(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold(tidy: &str) -> String {
    tidy.to_lowercase()
}
