//! Core ability engine types
//!
//! Principals, resources, abilities, roles and the two pivot rows that link
//! them. Polymorphic associations are modelled as an `(entity_type, key)` pair
//! ([`EntityRef`]) rather than through trait objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::constraints::Constraint;
use crate::error::{AuthzError, Result};

/// Primary key of an entity (principal or resource)
pub type EntityKey = i64;

/// Primary key of an ability row
pub type AbilityId = i64;

/// Primary key of a role row
pub type RoleId = i64;

/// Tenant partition value
pub type ScopeValue = i64;

/// Entity type under which roles act as principals
pub const ROLE_ENTITY_TYPE: &str = "roles";

/// Reserved entity type meaning "any resource type"
pub const WILDCARD: &str = "*";

/// Attribute bag shared by principals and resources
pub type Attributes = HashMap<String, Value>;

/// Polymorphic association: type discriminator plus foreign key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub key: EntityKey,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, key: EntityKey) -> Self {
        Self {
            entity_type: entity_type.into(),
            key,
        }
    }

    /// Whether this reference points at a role row
    pub fn is_role(&self) -> bool {
        self.entity_type == ROLE_ENTITY_TYPE
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.key)
    }
}

/// Principal that can hold grants and role assignments (user, service, role)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authority {
    /// Principal type (e.g. "user")
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Principal primary key
    pub key: EntityKey,

    /// Columns available to constraints (e.g. "team_id")
    #[serde(default)]
    pub attributes: Attributes,
}

impl Authority {
    /// Create a new principal of the given type
    pub fn new(entity_type: impl Into<String>, key: EntityKey) -> Self {
        Self {
            entity_type: entity_type.into(),
            key,
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute to the principal
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.key)
    }

    pub fn is_role(&self) -> bool {
        self.entity_type == ROLE_ENTITY_TYPE
    }

    /// Column lookup; `id` falls back to the primary key
    pub fn attribute(&self, column: &str) -> Value {
        match self.attributes.get(column) {
            Some(value) => value.clone(),
            None if column == "id" => Value::from(self.key),
            None => Value::Null,
        }
    }
}

/// Resource instance; `key` is `None` for a record that was never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub entity_type: String,

    #[serde(default)]
    pub key: Option<EntityKey>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl Record {
    /// A persisted record
    pub fn new(entity_type: impl Into<String>, key: EntityKey) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: Some(key),
            attributes: HashMap::new(),
        }
    }

    /// A record that does not exist in storage yet
    pub fn unsaved(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: None,
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute to the record
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn exists(&self) -> bool {
        self.key.is_some()
    }

    pub fn attribute(&self, column: &str) -> Value {
        match (self.attributes.get(column), self.key) {
            (Some(value), _) => value.clone(),
            (None, Some(key)) if column == "id" => Value::from(key),
            _ => Value::Null,
        }
    }
}

/// What an ability is checked or granted against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// Every resource type (`"*"`)
    Everything,
    /// A resource type without a specific instance
    Type { entity_type: String },
    /// A specific resource instance (persisted or not)
    Record(Record),
}

impl Target {
    pub fn everything() -> Self {
        Target::Everything
    }

    /// Shorthand for a resource type target
    pub fn of_type(entity_type: impl Into<String>) -> Self {
        Target::Type {
            entity_type: entity_type.into(),
        }
    }

    /// The concrete record, if this target is one that exists
    pub fn existing_record(&self) -> Option<&Record> {
        match self {
            Target::Record(record) if record.exists() => Some(record),
            _ => None,
        }
    }
}

impl From<Record> for Target {
    fn from(record: Record) -> Self {
        Target::Record(record)
    }
}

impl From<&Record> for Target {
    fn from(record: &Record) -> Self {
        Target::Record(record.clone())
    }
}

/// Named permission, optionally bound to a resource type, instance or ownership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,
    pub name: String,

    /// `None` for simple abilities, `"*"` for any type
    pub entity_type: Option<String>,

    /// `None` for blanket abilities over a type
    pub entity_id: Option<EntityKey>,

    #[serde(default)]
    pub only_owned: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraint>,

    #[serde(default)]
    pub scope: Option<ScopeValue>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ability {
    /// Lowercase, hyphen-joined matching key (`edit-post-1-owned`)
    pub fn identifier(&self) -> String {
        let mut slug = self.name.clone();

        if let Some(entity_type) = &self.entity_type {
            slug.push('-');
            slug.push_str(entity_type);
        }

        if let Some(entity_id) = self.entity_id {
            slug.push('-');
            slug.push_str(&entity_id.to_string());
        }

        if self.only_owned {
            slug.push_str("-owned");
        }

        slug.to_lowercase()
    }
}

/// Assignable grouping of abilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,

    /// Inheritance level; `None` opts out of inheritance in both directions
    #[serde(default)]
    pub level: Option<i64>,

    #[serde(default)]
    pub scope: Option<ScopeValue>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// The role acting as a principal
    pub fn as_authority(&self) -> Authority {
        let mut authority = Authority::new(ROLE_ENTITY_TYPE, self.id)
            .with_attribute("name", self.name.clone());

        if let Some(level) = self.level {
            authority = authority.with_attribute("level", level);
        }

        authority
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(ROLE_ENTITY_TYPE, self.id)
    }
}

/// Grant pivot row; `entity == None` means "granted to everyone"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub ability_id: AbilityId,
    pub entity: Option<EntityRef>,
    pub forbidden: bool,
    pub scope: Option<ScopeValue>,
}

/// Role assignment pivot row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedRole {
    pub role_id: RoleId,
    pub entity: EntityRef,
    pub scope: Option<ScopeValue>,
}

/// Reference to a role by primary key, name or loaded row
#[derive(Debug, Clone, PartialEq)]
pub enum RoleRef {
    Id(RoleId),
    Name(String),
    Role(Role),
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_string())
    }
}

impl From<String> for RoleRef {
    fn from(name: String) -> Self {
        RoleRef::Name(name)
    }
}

impl From<RoleId> for RoleRef {
    fn from(id: RoleId) -> Self {
        RoleRef::Id(id)
    }
}

impl From<Role> for RoleRef {
    fn from(role: Role) -> Self {
        RoleRef::Role(role)
    }
}

impl From<&Role> for RoleRef {
    fn from(role: &Role) -> Self {
        RoleRef::Role(role.clone())
    }
}

impl TryFrom<&Value> for RoleRef {
    type Error = AuthzError;

    /// Accepts a numeric id, a non-empty name, or a serialized role row
    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(RoleRef::Id)
                .ok_or_else(|| AuthzError::InvalidIdentifier(format!("non-integer role id {}", n))),
            Value::String(name) if !name.is_empty() => Ok(RoleRef::Name(name.clone())),
            Value::Object(_) => serde_json::from_value::<Role>(value.clone())
                .map(RoleRef::Role)
                .map_err(|e| AuthzError::InvalidIdentifier(format!("malformed role: {}", e))),
            other => Err(AuthzError::InvalidIdentifier(format!(
                "expected role id, name or model, got {}",
                other
            ))),
        }
    }
}

/// Whoever receives a grant: a principal, a role, or everyone
#[derive(Debug, Clone, PartialEq)]
pub enum Grantee {
    Authority(Authority),
    Role(RoleRef),
    Everyone,
}

impl From<Authority> for Grantee {
    fn from(authority: Authority) -> Self {
        Grantee::Authority(authority)
    }
}

impl From<&Authority> for Grantee {
    fn from(authority: &Authority) -> Self {
        Grantee::Authority(authority.clone())
    }
}

impl From<&str> for Grantee {
    fn from(role: &str) -> Self {
        Grantee::Role(RoleRef::from(role))
    }
}

impl From<RoleRef> for Grantee {
    fn from(role: RoleRef) -> Self {
        Grantee::Role(role)
    }
}

impl From<&Role> for Grantee {
    fn from(role: &Role) -> Self {
        Grantee::Role(RoleRef::from(role))
    }
}
