//! Badge barcode resolution.
//!
//! A scanned badge barcode is exactly six characters from `[A-Za-z0-9+=-]`.
//! Anything else typed at the desk is taken as a plain borrower name.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static BARCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+=-]{6}$").expect("barcode pattern compiles"));

pub fn is_barcode(input: &str) -> bool {
    BARCODE.is_match(input)
}

/// Attendee record returned by a badge directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeHolder {
    pub full_name: String,
    pub badge_number: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no attendee for barcode {0}")]
    NotFound(String),

    #[error("badge directory unavailable: {0}")]
    Unavailable(String),
}

/// External attendee lookup keyed by badge barcode.
pub trait BadgeDirectory: Send + Sync {
    fn lookup(&self, barcode: &str) -> Result<BadgeHolder, LookupError>;
}

/// Fixed barcode table. Intended for tests/dev.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBadgeDirectory {
    holders: HashMap<String, BadgeHolder>,
}

impl InMemoryBadgeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holder(
        mut self,
        barcode: impl Into<String>,
        full_name: impl Into<String>,
        badge_number: impl Into<String>,
    ) -> Self {
        self.holders.insert(
            barcode.into(),
            BadgeHolder {
                full_name: full_name.into(),
                badge_number: badge_number.into(),
            },
        );
        self
    }
}

impl BadgeDirectory for InMemoryBadgeDirectory {
    fn lookup(&self, barcode: &str) -> Result<BadgeHolder, LookupError> {
        self.holders
            .get(barcode)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(barcode.to_string()))
    }
}

/// Who is at the desk, as far as we can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonInfo {
    pub barcode: Option<String>,
    pub name: String,
    pub badge: Option<String>,
}

impl PersonInfo {
    fn named(name: &str) -> Self {
        Self {
            barcode: None,
            name: name.to_string(),
            badge: None,
        }
    }
}

/// Resolve desk input into a person.
///
/// Barcode-shaped input gets one directory lookup. If that fails, or no
/// directory is configured, the raw input is the name and the barcode is
/// dropped.
pub fn resolve_person(raw: &str, directory: Option<&dyn BadgeDirectory>) -> PersonInfo {
    let input = raw.trim();
    if !is_barcode(input) {
        return PersonInfo::named(input);
    }
    let Some(directory) = directory else {
        return PersonInfo::named(input);
    };

    match directory.lookup(input) {
        Ok(holder) => PersonInfo {
            barcode: Some(input.to_string()),
            name: holder.full_name,
            badge: Some(holder.badge_number),
        },
        Err(err) => {
            tracing::warn!(barcode = input, error = %err, "badge lookup failed; using raw input as name");
            PersonInfo::named(input)
        }
    }
}
