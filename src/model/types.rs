//! Core identifier types for the document repository.
//!
//! Validated newtypes used throughout the import pipeline: document ids,
//! version numbers, registry keys, and actor identities. Each type validates
//! on construction and round-trips through serde via `try_from`/`into`, so a
//! deserialized value is always well-formed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Which kind of value failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    DocId,
    VersionNumber,
    ExternalId,
    Actor,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DocId => "document id",
            Self::VersionNumber => "version number",
            Self::ExternalId => "external record id",
            Self::Actor => "actor identity",
        };
        f.write_str(name)
    }
}

/// A value failed validation during construction or deserialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// The kind of value that was rejected.
    pub kind: ErrorKind,
    /// The offending value, rendered for diagnostics.
    pub value: String,
    /// Why the value is invalid.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} '{}': {}", self.kind, self.value, self.reason)
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// DocId
// ---------------------------------------------------------------------------

/// An opaque, positive document identifier assigned by the repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DocId(u32);

impl DocId {
    /// Create a new `DocId`, rejecting zero.
    ///
    /// # Errors
    /// Returns an error if `id` is zero.
    pub fn new(id: u32) -> Result<Self, ValidationError> {
        if id == 0 {
            return Err(ValidationError {
                kind: ErrorKind::DocId,
                value: id.to_string(),
                reason: "document ids start at 1".to_owned(),
            });
        }
        Ok(Self(id))
    }

    /// Return the raw integer id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

impl TryFrom<u32> for DocId {
    type Error = ValidationError;
    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<DocId> for u32 {
    fn from(id: DocId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// VersionNumber
// ---------------------------------------------------------------------------

/// A 1-based version number, strictly increasing per document.
///
/// "No version yet" is expressed as `Option<VersionNumber>`, never as a
/// zero sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct VersionNumber(u32);

impl VersionNumber {
    /// The first version of any document.
    pub const FIRST: Self = Self(1);

    /// Create a new `VersionNumber`, rejecting zero.
    ///
    /// # Errors
    /// Returns an error if `n` is zero.
    pub fn new(n: u32) -> Result<Self, ValidationError> {
        if n == 0 {
            return Err(ValidationError {
                kind: ErrorKind::VersionNumber,
                value: n.to_string(),
                reason: "version numbers start at 1".to_owned(),
            });
        }
        Ok(Self(n))
    }

    /// Return the raw number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The version number following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl TryFrom<u32> for VersionNumber {
    type Error = ValidationError;
    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<VersionNumber> for u32 {
    fn from(n: VersionNumber) -> Self {
        n.0
    }
}

// ---------------------------------------------------------------------------
// ExternalId
// ---------------------------------------------------------------------------

/// The registry's key for an externally sourced trial record
/// (e.g. `NCT00412345`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalId(String);

impl ExternalId {
    /// Create a new `ExternalId` from a string, validating format.
    ///
    /// # Errors
    /// Returns an error if the string is empty or contains whitespace.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.is_empty() {
            return Err(ValidationError {
                kind: ErrorKind::ExternalId,
                value: s.to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ValidationError {
                kind: ErrorKind::ExternalId,
                value: s.to_owned(),
                reason: "must not contain whitespace".to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ExternalId {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ExternalId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<ExternalId> for String {
    fn from(id: ExternalId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The identity under which a lock is held — an automated importer or a
/// human editor. Only used for lock bookkeeping, never for authentication.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Actor(String);

impl Actor {
    /// Create a new `Actor` from a string.
    ///
    /// # Errors
    /// Returns an error if the string is empty or only whitespace.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.trim().is_empty() {
            return Err(ValidationError {
                kind: ErrorKind::Actor,
                value: s.to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Actor {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Actor {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> Self {
        actor.0
    }
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// An immutable, numbered snapshot of a document's content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// 1-based number, unique per document, strictly increasing.
    pub number: VersionNumber,
    /// The XML snapshot.
    pub content: String,
    /// Whether this version is eligible for downstream publication.
    pub publishable: bool,
    /// Unix epoch seconds at creation time.
    pub created_at: u64,
}

// ---------------------------------------------------------------------------
// ExternalRecord
// ---------------------------------------------------------------------------

/// One queued update from the registry feed.
///
/// `doc_id` maps the record to an existing repository document; `None` means
/// the record describes a brand-new document. The content has already been
/// run through the repository's import transform before it reaches the merge
/// engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecord {
    /// The registry key for this trial.
    pub external_id: ExternalId,
    /// The repository document this record updates, if one exists.
    #[serde(default)]
    pub doc_id: Option<DocId>,
    /// Transformed XML content supplied by the feed.
    pub content: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_rejects_zero() {
        assert!(DocId::new(0).is_err());
        assert_eq!(DocId::new(7).map(DocId::get), Ok(7));
    }

    #[test]
    fn version_number_is_ordered_and_nonzero() {
        assert!(VersionNumber::new(0).is_err());
        let v1 = VersionNumber::FIRST;
        assert!(v1 < v1.next());
        assert_eq!(v1.next().get(), 2);
    }

    #[test]
    fn external_id_rejects_whitespace() {
        assert!(ExternalId::new("").is_err());
        assert!(ExternalId::new("NCT 123").is_err());
        assert!(ExternalId::new("NCT00412345").is_ok());
    }

    #[test]
    fn serde_round_trip_preserves_validation() {
        let id: DocId = serde_json::from_str("12").expect("valid id");
        assert_eq!(id.get(), 12);
        assert!(serde_json::from_str::<DocId>("0").is_err());

        let ext: ExternalId = serde_json::from_str("\"NCT1\"").expect("valid key");
        assert_eq!(ext.as_str(), "NCT1");
        assert!(serde_json::from_str::<ExternalId>("\"\"").is_err());
    }

    #[test]
    fn record_doc_id_defaults_to_none() {
        let record: ExternalRecord =
            serde_json::from_str(r#"{"external_id":"NCT2","content":"<T/>"}"#)
                .expect("valid record");
        assert!(record.doc_id.is_none());
    }
}
