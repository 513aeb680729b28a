//! Protocol Module
//!
//! Defines the text protocol spoken with the worker daemon.
//!
//! ## Exchange
//! ```text
//! bridge ──SET command_prefix+N "<command>"──▶ store ──▶ daemon
//! bridge ◀──GET response_prefix+N "<text>"─── store ◀── daemon
//! ```
//!
//! ### Commands
//! - `def`     - define an entity with typed fields
//! - `add rel` - add a relation between two entities
//! - `rm ent`  - remove an entity
//! - `rm rel`  - remove a relation
//! - `lst ent` - list entities (response expected)
//! - `lst rel` - list relations (response expected)
//! - `gen`     - reserved
//!
//! Responses are free text owned by the daemon; no framing or versioning.

mod command;
mod codec;
mod params;

pub use command::{EntityRef, Operation, OperationKind};
pub use codec::{decode, encode, validate, PAIR_SEPARATOR, TYPE_DELIMITER, VALUE_DELIMITER};
pub use params::{split_list, QueryParams, COUNT_MISMATCH};
