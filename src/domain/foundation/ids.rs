//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Identity of a reader.
///
/// A reader may be known by a primary account id, a third-party union id
/// (WeChat login), or both once the two accounts are linked. At least one
/// half is always present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId {
    ftc_id: Option<Uuid>,
    union_id: Option<String>,
}

impl MemberId {
    /// Creates a MemberId, rejecting an empty identity.
    pub fn new(ftc_id: Option<Uuid>, union_id: Option<String>) -> Result<Self, ValidationError> {
        let union_id = union_id.filter(|u| !u.trim().is_empty());
        if ftc_id.is_none() && union_id.is_none() {
            return Err(ValidationError::empty_field("member_id"));
        }
        Ok(Self { ftc_id, union_id })
    }

    /// Reader known only by the primary account.
    pub fn ftc(ftc_id: Uuid) -> Self {
        Self {
            ftc_id: Some(ftc_id),
            union_id: None,
        }
    }

    /// Reader known only by a WeChat union id.
    pub fn wechat(union_id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(None, Some(union_id.into()))
    }

    /// Reader with both identities linked.
    pub fn linked(ftc_id: Uuid, union_id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Some(ftc_id), Some(union_id.into()))
    }

    pub fn ftc_id(&self) -> Option<&Uuid> {
        self.ftc_id.as_ref()
    }

    pub fn union_id(&self) -> Option<&str> {
        self.union_id.as_deref()
    }

    pub fn is_linked(&self) -> bool {
        self.ftc_id.is_some() && self.union_id.is_some()
    }

    /// Key used for locking and lookup: primary id first, union id otherwise.
    pub fn compound_key(&self) -> String {
        match (&self.ftc_id, &self.union_id) {
            (Some(id), _) => id.to_string(),
            (None, Some(union)) => union.clone(),
            (None, None) => String::new(),
        }
    }

    /// Inverse of `compound_key`: a UUID is a primary id, anything else a union id.
    pub fn from_compound_key(key: &str) -> Result<Self, ValidationError> {
        match Uuid::parse_str(key) {
            Ok(id) => Ok(Self::ftc(id)),
            Err(_) => Self::wechat(key),
        }
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compound_key())
    }
}

/// Identifier of an order.
///
/// Format is `FT` followed by 16 upper-case hex characters drawn from a
/// random v4 UUID, so ids are neither sequential nor guessable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    const PREFIX: &'static str = "FT";
    const HEX_LEN: usize = 16;

    /// Generates a fresh order id.
    pub fn new() -> Self {
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        Self(format!("{}{}", Self::PREFIX, &hex[..Self::HEX_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| ValidationError::invalid_format("order_id", "missing FT prefix"))?;
        if hex.len() != Self::HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::invalid_format(
                "order_id",
                "expected 16 hex characters after prefix",
            ));
        }
        Ok(Self(format!("{}{}", Self::PREFIX, hex.to_uppercase())))
    }
}

/// Unique identifier for an add-on record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddOnId(Uuid);

impl AddOnId {
    /// Creates a new random AddOnId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an AddOnId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AddOnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AddOnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AddOnId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a membership snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(Uuid);

impl SnapshotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnapshotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}
