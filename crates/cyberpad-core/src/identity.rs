//! Identity handling
//!
//! An identity is an opaque, client-trusted string naming the current user.
//! It only selects which storage key a workspace lives under; nothing here
//! authenticates it.
//!
//! The identity is always passed to the store explicitly. Where it comes
//! from is the job of an [`IdentityProvider`]: a fixed value (command-line
//! flag or config), or the "current user" entry kept in the same key-value
//! back end as the workspaces.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::storage::{KeyValueStore, StorageResult};

/// Key of the single-value entry holding the current identity
pub const CURRENT_IDENTITY_KEY: &str = "cyberpad_current_user";

/// Errors from parsing an identity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Identity cannot be empty")]
    Empty,

    #[error("Identity cannot start or end with whitespace")]
    SurroundingWhitespace,

    #[error("Identity cannot contain control characters")]
    ControlCharacter,
}

/// A validated user identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Parse an identity
    ///
    /// The value is kept exactly as given. It must be non-empty, must not
    /// start or end with whitespace and must be free of control characters.
    pub fn parse(value: &str) -> Result<Self, IdentityError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }
        if trimmed.len() != value.len() {
            return Err(IdentityError::SurroundingWhitespace);
        }
        if value.chars().any(char::is_control) {
            return Err(IdentityError::ControlCharacter);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl std::str::FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Source of the current identity
pub trait IdentityProvider {
    /// The established identity, or `None` when nobody is signed in
    fn current(&self) -> Option<Identity>;
}

/// Always yields the same identity (or none)
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity(Option<Identity>);

impl FixedIdentity {
    pub fn new(identity: Identity) -> Self {
        Self(Some(identity))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl IdentityProvider for FixedIdentity {
    fn current(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Reads the current identity from its entry in a key-value back end
pub struct StoredIdentity<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> StoredIdentity<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore + ?Sized> IdentityProvider for StoredIdentity<'_, S> {
    fn current(&self) -> Option<Identity> {
        match self.store.get(CURRENT_IDENTITY_KEY) {
            Ok(Some(value)) => match Identity::parse(&value) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!(error = %e, "Ignoring invalid stored identity");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored identity");
                None
            }
        }
    }
}

/// Tries each provider in turn and yields the first identity found
pub struct FirstOf<'a>(pub Vec<&'a dyn IdentityProvider>);

impl IdentityProvider for FirstOf<'_> {
    fn current(&self) -> Option<Identity> {
        self.0.iter().find_map(|provider| provider.current())
    }
}

/// Record `identity` as the current user in `store`
pub fn sign_in<S: KeyValueStore + ?Sized>(store: &mut S, identity: &Identity) -> StorageResult<()> {
    store.set(CURRENT_IDENTITY_KEY, identity.as_str())
}

/// Clear the current user entry, returning whether one was set
pub fn sign_out<S: KeyValueStore + ?Sized>(store: &mut S) -> StorageResult<bool> {
    store.remove(CURRENT_IDENTITY_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_parse_keeps_value() {
        let id = Identity::parse("neo the one").unwrap();
        assert_eq!(id.as_str(), "neo the one");
        assert_eq!(id.to_string(), "neo the one");
    }

    #[test]
    fn test_parse_rejects_surrounding_whitespace() {
        assert_eq!(
            Identity::parse(" neo"),
            Err(IdentityError::SurroundingWhitespace)
        );
        assert_eq!(
            Identity::parse("neo\t"),
            Err(IdentityError::SurroundingWhitespace)
        );
        assert_ne!(
            Identity::parse(" neo").ok(),
            Some(Identity::parse("neo").unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_empty_and_control() {
        assert_eq!(Identity::parse("   "), Err(IdentityError::Empty));
        assert_eq!(
            Identity::parse("ne\u{7}o"),
            Err(IdentityError::ControlCharacter)
        );
    }

    #[test]
    fn test_serde_validates() {
        let id: Identity = serde_json::from_str(r#""trinity""#).unwrap();
        assert_eq!(id.as_str(), "trinity");
        assert!(serde_json::from_str::<Identity>(r#""""#).is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""trinity""#);
    }

    #[test]
    fn test_fixed_identity() {
        let provider = FixedIdentity::new(Identity::parse("morpheus").unwrap());
        assert_eq!(provider.current().unwrap().as_str(), "morpheus");
        assert!(FixedIdentity::none().current().is_none());
    }

    #[test]
    fn test_stored_identity_sign_in_out() {
        let mut store = MemoryStore::new();
        assert!(StoredIdentity::new(&store).current().is_none());

        sign_in(&mut store, &Identity::parse("neo").unwrap()).unwrap();
        assert_eq!(
            StoredIdentity::new(&store).current().unwrap().as_str(),
            "neo"
        );

        assert!(sign_out(&mut store).unwrap());
        assert!(StoredIdentity::new(&store).current().is_none());
        assert!(!sign_out(&mut store).unwrap());
    }

    #[test]
    fn test_stored_identity_ignores_garbage() {
        let mut store = MemoryStore::new();
        store.set(CURRENT_IDENTITY_KEY, "   ").unwrap();
        assert!(StoredIdentity::new(&store).current().is_none());
    }

    #[test]
    fn test_first_of() {
        let mut store = MemoryStore::new();
        sign_in(&mut store, &Identity::parse("stored").unwrap()).unwrap();

        let none = FixedIdentity::none();
        let stored = StoredIdentity::new(&store);
        let chain = FirstOf(vec![&none as &dyn IdentityProvider, &stored]);
        assert_eq!(chain.current().unwrap().as_str(), "stored");

        let flag = FixedIdentity::new(Identity::parse("flag").unwrap());
        let chain = FirstOf(vec![&flag as &dyn IdentityProvider, &stored]);
        assert_eq!(chain.current().unwrap().as_str(), "flag");
    }
}
