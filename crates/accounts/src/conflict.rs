use std::collections::BTreeSet;

use serde::Serialize;

/// A unique field that collides with a different live account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictingField {
    Email,
    Username,
    PhoneNumber,
}

impl ConflictingField {
    pub const ALL: [ConflictingField; 3] = [Self::Email, Self::Username, Self::PhoneNumber];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Username => "username",
            Self::PhoneNumber => "phone_number",
        }
    }

    /// Human-readable message used in error bodies.
    pub fn message(self) -> &'static str {
        match self {
            Self::Email => "Email already in use",
            Self::Username => "Username already in use",
            Self::PhoneNumber => "Phone number already in use",
        }
    }
}

/// Ordered set of conflicting fields; empty means "no conflict".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConflictSet(BTreeSet<ConflictingField>);

impl ConflictSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(field: ConflictingField) -> Self {
        Self(BTreeSet::from([field]))
    }

    pub fn insert(&mut self, field: ConflictingField) {
        self.0.insert(field);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ConflictingField> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ConflictingField> for ConflictSet {
    fn from_iter<I: IntoIterator<Item = ConflictingField>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl core::fmt::Display for ConflictSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.iter().map(ConflictingField::as_str).collect();
        f.write_str(&names.join(", "))
    }
}
