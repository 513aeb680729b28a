//! Command codec
//!
//! Encoding, validation and parsing of the daemon's text commands.
//!
//! ## Grammar
//!
//! ```text
//! def <E>(<f>_<t>,<f>_<t>,...)
//! add rel <E1>(<f>=<v>,...) <E2>(<f>=<v>,...)
//! rm ent <E>
//! rm rel <E1>(<f>=<v>,...) <E2>(<f>=<v>,...)
//! lst ent <pattern>
//! lst rel <E1>(<f>=<v>,...) <E2>(<f>=<v>,...)
//! gen
//! ```
//!
//! The daemon matches these byte for byte: `_` joins definition field/type
//! pairs, `=` joins relation field/value pairs, `,` separates pairs and a
//! single space separates operands.

use super::command::{EntityRef, Operation};
use crate::error::{BridgeError, Result};

/// Joins a field to its type in `def`
pub const TYPE_DELIMITER: char = '_';

/// Joins a field to its value in relation operands
pub const VALUE_DELIMITER: char = '=';

/// Separates pairs inside an operand
pub const PAIR_SEPARATOR: char = ',';

/// Characters that would split an operand
const RESERVED: [char; 3] = [PAIR_SEPARATOR, '(', ')'];

// =============================================================================
// Encoding
// =============================================================================

/// Encode an operation to its command string
///
/// Validates first; nothing is produced for an invalid operation.
pub fn encode(operation: &Operation) -> Result<String> {
    validate(operation)?;

    let command = match operation {
        Operation::DefineEntity {
            entity,
            fields,
            types,
        } => format!("def {}({})", entity, join_pairs(fields, types, TYPE_DELIMITER)),
        Operation::AddRelation { left, right } => {
            format!("add rel {} {}", operand(left), operand(right))
        }
        Operation::RemoveEntity { entity } => format!("rm ent {}", entity),
        Operation::RemoveRelation { left, right } => {
            format!("rm rel {} {}", operand(left), operand(right))
        }
        Operation::ListEntity { pattern } => format!("lst ent {}", pattern),
        Operation::ListRelation { left, right } => {
            format!("lst rel {} {}", operand(left), operand(right))
        }
        Operation::Generate => "gen".to_string(),
    };

    Ok(command)
}

fn operand(side: &EntityRef) -> String {
    format!(
        "{}({})",
        side.entity,
        join_pairs(&side.fields, &side.values, VALUE_DELIMITER)
    )
}

fn join_pairs(names: &[String], values: &[String], delimiter: char) -> String {
    names
        .iter()
        .zip(values)
        .map(|(name, value)| format!("{}{}{}", name, delimiter, value))
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// Validation
// =============================================================================

/// Check an operation can be encoded without ambiguity
///
/// Parallel sequences must have equal length. Entity names must be non-empty
/// single words. Pair tokens must not contain `,`, `(` or `)`; types must not
/// contain `_` and relation fields must not contain `=`.
pub fn validate(operation: &Operation) -> Result<()> {
    match operation {
        Operation::DefineEntity {
            entity,
            fields,
            types,
        } => {
            check_entity(entity)?;
            check_lengths(fields.len(), types.len(), "types")?;
            for field in fields {
                check_token(field, "field")?;
            }
            for ty in types {
                check_token(ty, "type")?;
                if ty.contains(TYPE_DELIMITER) {
                    return Err(BridgeError::Validation(format!(
                        "type '{}' must not contain '{}'",
                        ty, TYPE_DELIMITER
                    )));
                }
            }
            Ok(())
        }
        Operation::AddRelation { left, right }
        | Operation::RemoveRelation { left, right }
        | Operation::ListRelation { left, right } => {
            check_side(left)?;
            check_side(right)
        }
        Operation::RemoveEntity { entity } => check_entity(entity),
        Operation::ListEntity { pattern } => {
            if pattern.is_empty() {
                return Err(BridgeError::Validation("pattern must not be empty".to_string()));
            }
            Ok(())
        }
        Operation::Generate => Ok(()),
    }
}

fn check_side(side: &EntityRef) -> Result<()> {
    check_entity(&side.entity)?;
    check_lengths(side.fields.len(), side.values.len(), "values")?;
    for field in &side.fields {
        check_token(field, "field")?;
        if field.contains(VALUE_DELIMITER) {
            return Err(BridgeError::Validation(format!(
                "field '{}' must not contain '{}'",
                field, VALUE_DELIMITER
            )));
        }
    }
    for value in &side.values {
        check_token(value, "value")?;
    }
    Ok(())
}

fn check_lengths(fields: usize, other: usize, what: &str) -> Result<()> {
    if fields != other {
        return Err(BridgeError::Validation(format!(
            "Count of fields and {} do not match ({} fields, {} {})",
            what, fields, other, what
        )));
    }
    Ok(())
}

fn check_entity(entity: &str) -> Result<()> {
    if entity.is_empty() {
        return Err(BridgeError::Validation("entity name must not be empty".to_string()));
    }
    if entity.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c)) {
        return Err(BridgeError::Validation(format!(
            "entity name '{}' contains whitespace or reserved characters",
            entity
        )));
    }
    Ok(())
}

fn check_token(token: &str, what: &str) -> Result<()> {
    if token.contains(&RESERVED[..]) {
        return Err(BridgeError::Validation(format!(
            "{} '{}' contains a reserved character (one of , ( ))",
            what, token
        )));
    }
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Parse a command string back into an operation
///
/// Inverse of [`encode`] for every valid operation.
pub fn decode(command: &str) -> Result<Operation> {
    if command == "gen" {
        return Ok(Operation::Generate);
    }

    if let Some(rest) = command.strip_prefix("def ") {
        let (entity, body, tail) = split_operand(rest)?;
        expect_end(tail, command)?;
        let (fields, types) = split_pairs(body, |pair| pair.rsplit_once(TYPE_DELIMITER))?;
        return Ok(Operation::DefineEntity {
            entity: entity.to_string(),
            fields,
            types,
        });
    }
    if let Some(rest) = command.strip_prefix("add rel ") {
        let (left, right) = parse_relation(rest)?;
        return Ok(Operation::AddRelation { left, right });
    }
    if let Some(rest) = command.strip_prefix("rm rel ") {
        let (left, right) = parse_relation(rest)?;
        return Ok(Operation::RemoveRelation { left, right });
    }
    if let Some(rest) = command.strip_prefix("lst rel ") {
        let (left, right) = parse_relation(rest)?;
        return Ok(Operation::ListRelation { left, right });
    }
    if let Some(entity) = command.strip_prefix("rm ent ") {
        return Ok(Operation::RemoveEntity {
            entity: entity.to_string(),
        });
    }
    if let Some(pattern) = command.strip_prefix("lst ent ") {
        return Ok(Operation::ListEntity {
            pattern: pattern.to_string(),
        });
    }

    Err(BridgeError::Protocol(format!("Unrecognized command: {:?}", command)))
}

/// Split `E(body)rest` into its parts
fn split_operand(input: &str) -> Result<(&str, &str, &str)> {
    let open = input
        .find('(')
        .ok_or_else(|| BridgeError::Protocol(format!("Missing '(' in {:?}", input)))?;
    let close = input[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or_else(|| BridgeError::Protocol(format!("Missing ')' in {:?}", input)))?;

    Ok((&input[..open], &input[open + 1..close], &input[close + 1..]))
}

fn parse_relation(input: &str) -> Result<(EntityRef, EntityRef)> {
    let (left, right_input) = parse_side(input)?;
    let right_input = right_input.strip_prefix(' ').ok_or_else(|| {
        BridgeError::Protocol(format!("Expected a second operand in {:?}", input))
    })?;
    let (right, tail) = parse_side(right_input)?;
    expect_end(tail, input)?;
    Ok((left, right))
}

fn parse_side(input: &str) -> Result<(EntityRef, &str)> {
    let (entity, body, rest) = split_operand(input)?;
    let (fields, values) = split_pairs(body, |pair| pair.split_once(VALUE_DELIMITER))?;
    Ok((
        EntityRef {
            entity: entity.to_string(),
            fields,
            values,
        },
        rest,
    ))
}

fn split_pairs<F>(body: &str, split: F) -> Result<(Vec<String>, Vec<String>)>
where
    F: Fn(&str) -> Option<(&str, &str)>,
{
    let mut names = Vec::new();
    let mut values = Vec::new();
    if body.is_empty() {
        return Ok((names, values));
    }

    for pair in body.split(PAIR_SEPARATOR) {
        let (name, value) = split(pair)
            .ok_or_else(|| BridgeError::Protocol(format!("Malformed pair {:?}", pair)))?;
        names.push(name.to_string());
        values.push(value.to_string());
    }
    Ok((names, values))
}

fn expect_end(tail: &str, command: &str) -> Result<()> {
    if !tail.is_empty() {
        return Err(BridgeError::Protocol(format!(
            "Trailing input {:?} in {:?}",
            tail, command
        )));
    }
    Ok(())
}
