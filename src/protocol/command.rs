//! Operation definitions
//!
//! Represents requests for the worker daemon.

use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

/// Operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    DefineEntity,
    AddRelation,
    RemoveEntity,
    RemoveRelation,
    ListEntity,
    ListRelation,
    Generate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::DefineEntity,
        OperationKind::AddRelation,
        OperationKind::RemoveEntity,
        OperationKind::RemoveRelation,
        OperationKind::ListEntity,
        OperationKind::ListRelation,
        OperationKind::Generate,
    ];

    /// Name callers use to select the operation
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::DefineEntity => "define_entity",
            OperationKind::AddRelation => "add_relation",
            OperationKind::RemoveEntity => "remove_entity",
            OperationKind::RemoveRelation => "remove_relation",
            OperationKind::ListEntity => "list_entity",
            OperationKind::ListRelation => "list_relation",
            OperationKind::Generate => "generate",
        }
    }

    /// Whether the bridge waits for a daemon response
    ///
    /// Everything except the list operations is fire-and-forget.
    pub fn expects_response(self) -> bool {
        matches!(self, OperationKind::ListEntity | OperationKind::ListRelation)
    }

    /// Number of positional arguments (entity names or pattern)
    pub fn arity(self) -> usize {
        match self {
            OperationKind::Generate => 0,
            OperationKind::DefineEntity
            | OperationKind::RemoveEntity
            | OperationKind::ListEntity => 1,
            OperationKind::AddRelation
            | OperationKind::RemoveRelation
            | OperationKind::ListRelation => 2,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| BridgeError::Validation(format!("Unknown operation: {}", s)))
    }
}

/// One side of a relation: an entity constrained by field/value pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub entity: String,

    /// Field names, parallel to `values`
    pub fields: Vec<String>,

    pub values: Vec<String>,
}

impl EntityRef {
    pub fn new<S: Into<String>>(entity: impl Into<String>, fields: Vec<S>, values: Vec<S>) -> Self {
        Self {
            entity: entity.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Entity with no field constraints
    pub fn bare(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: Vec::new(),
            values: Vec::new(),
        }
    }
}

/// A request for the worker daemon
///
/// Parallel sequences are carried as supplied; the codec rejects length
/// mismatches before anything reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Define an entity with typed fields
    DefineEntity {
        entity: String,
        fields: Vec<String>,
        types: Vec<String>,
    },

    /// Relate two constrained entities
    AddRelation { left: EntityRef, right: EntityRef },

    /// Remove an entity definition
    RemoveEntity { entity: String },

    /// Remove a relation between two constrained entities
    RemoveRelation { left: EntityRef, right: EntityRef },

    /// List entities matching a pattern
    ListEntity { pattern: String },

    /// List relations between two constrained entities
    ListRelation { left: EntityRef, right: EntityRef },

    /// Reserved; carries no payload
    Generate,
}

impl Operation {
    pub fn define_entity<S: Into<String>>(entity: impl Into<String>, fields: Vec<S>, types: Vec<S>) -> Self {
        Operation::DefineEntity {
            entity: entity.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remove_entity(entity: impl Into<String>) -> Self {
        Operation::RemoveEntity {
            entity: entity.into(),
        }
    }

    pub fn list_entity(pattern: impl Into<String>) -> Self {
        Operation::ListEntity {
            pattern: pattern.into(),
        }
    }

    /// Get the operation type
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::DefineEntity { .. } => OperationKind::DefineEntity,
            Operation::AddRelation { .. } => OperationKind::AddRelation,
            Operation::RemoveEntity { .. } => OperationKind::RemoveEntity,
            Operation::RemoveRelation { .. } => OperationKind::RemoveRelation,
            Operation::ListEntity { .. } => OperationKind::ListEntity,
            Operation::ListRelation { .. } => OperationKind::ListRelation,
            Operation::Generate => OperationKind::Generate,
        }
    }

    pub fn expects_response(&self) -> bool {
        self.kind().expects_response()
    }
}
