//! Instaweave Core Types
//!
//! This crate holds the type-level (M1) side of instaweave:
//!
//! - **Identifiers**: interned element ids ([`identifier::ElementId`])
//! - **Elements**: records with a typed relationship index ([`element`])
//! - **Multiplicity**: declared bounds and how they are read ([`multiplicity`])
//! - **Model**: loading, ownership and metatype indexes ([`Model`])
//! - **Errors**: the error taxonomy and diagnostics ([`error`])
//! - **Phases**: the ordered steps of a generation run ([`phase::Phase`])

pub mod element;
pub mod error;
pub mod identifier;
pub mod multiplicity;
pub mod phase;

mod model;

pub use model::{Model, Resolved};
