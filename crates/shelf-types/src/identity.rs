use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier of one physical book copy (UUID v7 for time-ordering).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CopyId(uuid::Uuid);

impl CopyId {
    /// Generate a new time-ordered copy ID (UUID v7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for CopyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CopyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CopyId({})", self.short_id())
    }
}

impl fmt::Display for CopyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CopyId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidUuid(e.to_string()))
    }
}

/// Identifier of one checkout record (UUID v7 for time-ordering).
///
/// A copy refers to its current record through a `RecordId` rather than
/// holding the record itself, so clearing the pointer never touches the
/// record's history.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(uuid::Uuid);

impl RecordId {
    /// Generate a new time-ordered record ID (UUID v7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.short_id())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidUuid(e.to_string()))
    }
}

fn validate_name(kind: &str, value: &str) -> Result<(), TypeError> {
    if value.is_empty() {
        return Err(TypeError::InvalidIdentifier(format!("{kind} must not be empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(TypeError::InvalidIdentifier(format!(
            "{kind} {value:?} must not contain whitespace"
        )));
    }
    Ok(())
}

/// Login name of a reader.
///
/// Readers are authenticated outside Shelf; the core only compares
/// identities, so the login name is all it keeps.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_name("user id", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Short code naming a library branch (e.g. `"central"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchId(String);

impl BranchId {
    pub fn new(code: impl Into<String>) -> Result<Self, TypeError> {
        let code = code.into();
        validate_name("branch code", &code)?;
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BranchId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BranchId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchId> for String {
    fn from(id: BranchId) -> Self {
        id.0
    }
}

/// ISBN of a book title, stored without separators.
///
/// Accepts ISBN-10 (nine digits and a final digit or `X`) and ISBN-13
/// (thirteen digits). Hyphens and spaces are stripped on construction.
/// Check digits are not verified.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookId(String);

impl BookId {
    pub fn isbn(raw: impl AsRef<str>) -> Result<Self, TypeError> {
        let raw = raw.as_ref();
        let isbn: String = raw
            .chars()
            .filter(|c| *c != '-' && *c != ' ')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let invalid = |reason: &str| TypeError::InvalidIsbn {
            isbn: raw.to_string(),
            reason: reason.to_string(),
        };

        if !isbn.is_ascii() {
            return Err(invalid("ISBN must contain only digits, X, hyphens and spaces"));
        }

        match isbn.len() {
            13 if isbn.chars().all(|c| c.is_ascii_digit()) => Ok(Self(isbn)),
            10 => {
                let (body, check) = isbn.split_at(9);
                if body.chars().all(|c| c.is_ascii_digit())
                    && check.chars().all(|c| c.is_ascii_digit() || c == 'X')
                {
                    Ok(Self(isbn))
                } else {
                    Err(invalid("ISBN-10 must be nine digits followed by a digit or X"))
                }
            }
            13 => Err(invalid("ISBN-13 must contain only digits")),
            n => Err(invalid(&format!("expected 10 or 13 characters, got {n}"))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BookId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::isbn(s)
    }
}

impl TryFrom<String> for BookId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::isbn(value)
    }
}

impl From<BookId> for String {
    fn from(id: BookId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_ids_are_unique() {
        assert_ne!(CopyId::new(), CopyId::new());
    }

    #[test]
    fn record_ids_are_time_ordered() {
        let first = RecordId::new();
        let second = RecordId::new();
        assert!(first < second);
    }

    #[test]
    fn short_id_format() {
        let id = CopyId::new();
        assert_eq!(id.short_id().len(), 8);
        assert!(id.to_string().starts_with(&id.short_id()));
    }

    #[test]
    fn copy_id_parses_its_display_form() {
        let id = CopyId::new();
        let parsed: CopyId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn copy_id_rejects_garbage() {
        assert!(matches!(
            "not-a-uuid".parse::<CopyId>(),
            Err(TypeError::InvalidUuid(_))
        ));
    }

    #[test]
    fn user_id_rejects_empty_and_whitespace() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("jane doe").is_err());
        assert_eq!(UserId::new("jdoe").unwrap().as_str(), "jdoe");
    }

    #[test]
    fn branch_id_serde_validates() {
        let ok: BranchId = serde_json::from_str("\"central\"").unwrap();
        assert_eq!(ok.as_str(), "central");
        assert!(serde_json::from_str::<BranchId>("\"\"").is_err());
    }

    #[test]
    fn isbn_13_strips_hyphens() {
        let book = BookId::isbn("978-0-13-468599-1").unwrap();
        assert_eq!(book.as_str(), "9780134685991");
    }

    #[test]
    fn isbn_10_accepts_x_check_digit() {
        let book = BookId::isbn("0-8044-2957-x").unwrap();
        assert_eq!(book.as_str(), "080442957X");
    }

    #[test]
    fn isbn_rejects_bad_lengths_and_letters() {
        assert!(BookId::isbn("12345").is_err());
        assert!(BookId::isbn("97801346859X1").is_err());
        assert!(BookId::isbn("X804429570").is_err());
    }

    #[test]
    fn isbn_rejects_non_ascii_input() {
        for raw in ["12345678é", "978013468599١", "０-306-40615-2"] {
            let error = BookId::isbn(raw).unwrap_err();
            assert!(matches!(error, TypeError::InvalidIsbn { .. }), "{raw}");
        }
        assert!(serde_json::from_str::<BookId>("\"12345678é\"").is_err());
    }
}
