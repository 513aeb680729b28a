//! Query parameter unpacking
//!
//! Callers hand over comma-delimited lists under fixed names:
//!
//! ```text
//! fields=f1,f2&types=t1,t2                       (define)
//! fields1=f,..&values1=v,..&fields2=..&values2=..  (relations)
//! ```
//!
//! Positional arguments (entity names, list pattern) come separately.

use super::command::{EntityRef, Operation, OperationKind};
use crate::error::{BridgeError, Result};

/// Message returned for mismatched list lengths
pub const COUNT_MISMATCH: &str = "Count of fields and types or values do not match";

/// Structured parameters for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub fields: Vec<String>,
    pub types: Vec<String>,
    pub fields1: Vec<String>,
    pub values1: Vec<String>,
    pub fields2: Vec<String>,
    pub values2: Vec<String>,
}

impl QueryParams {
    /// Build from raw `(name, value)` pairs
    ///
    /// Unknown names are ignored; a repeated name keeps its last value.
    /// Absent or empty values become empty lists.
    pub fn unpack<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = QueryParams::default();
        for (name, value) in pairs {
            let list = split_list(value.as_ref());
            match name.as_ref() {
                "fields" => params.fields = list,
                "types" => params.types = list,
                "fields1" => params.fields1 = list,
                "values1" => params.values1 = list,
                "fields2" => params.fields2 = list,
                "values2" => params.values2 = list,
                other => tracing::trace!("Ignoring query parameter '{}'", other),
            }
        }

        params.validate()?;
        Ok(params)
    }

    /// Every field list must match its partner's length
    pub fn validate(&self) -> Result<()> {
        if self.fields.len() != self.types.len()
            || self.fields1.len() != self.values1.len()
            || self.fields2.len() != self.values2.len()
        {
            return Err(BridgeError::Validation(COUNT_MISMATCH.to_string()));
        }
        Ok(())
    }

    /// Left relation operand
    pub fn left(&self, entity: &str) -> EntityRef {
        EntityRef {
            entity: entity.to_string(),
            fields: self.fields1.clone(),
            values: self.values1.clone(),
        }
    }

    /// Right relation operand
    pub fn right(&self, entity: &str) -> EntityRef {
        EntityRef {
            entity: entity.to_string(),
            fields: self.fields2.clone(),
            values: self.values2.clone(),
        }
    }
}

/// Split a comma-delimited list; empty input is an empty list
pub fn split_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}

impl Operation {
    /// Assemble an operation from positional arguments and unpacked lists
    ///
    /// `args` holds entity names (or the pattern for `list_entity`) in route
    /// order; their count must match [`OperationKind::arity`].
    pub fn from_query<S: AsRef<str>>(
        kind: OperationKind,
        args: &[S],
        params: &QueryParams,
    ) -> Result<Self> {
        if args.len() != kind.arity() {
            return Err(BridgeError::Validation(format!(
                "{} takes {} argument(s), got {}",
                kind,
                kind.arity(),
                args.len()
            )));
        }
        params.validate()?;

        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        let operation = match kind {
            OperationKind::DefineEntity => Operation::DefineEntity {
                entity: args[0].to_string(),
                fields: params.fields.clone(),
                types: params.types.clone(),
            },
            OperationKind::AddRelation => Operation::AddRelation {
                left: params.left(args[0]),
                right: params.right(args[1]),
            },
            OperationKind::RemoveEntity => Operation::RemoveEntity {
                entity: args[0].to_string(),
            },
            OperationKind::RemoveRelation => Operation::RemoveRelation {
                left: params.left(args[0]),
                right: params.right(args[1]),
            },
            OperationKind::ListEntity => Operation::ListEntity {
                pattern: args[0].to_string(),
            },
            OperationKind::ListRelation => Operation::ListRelation {
                left: params.left(args[0]),
                right: params.right(args[1]),
            },
            OperationKind::Generate => Operation::Generate,
        };

        Ok(operation)
    }
}
