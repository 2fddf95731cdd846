//! Prism Core Types and Definitions
//!
//! This crate provides the foundational types shared by every stage of the
//! Prism DTO compiler. It includes:
//!
//! - **Identifiers**: String-interned identifiers ([`identifier::Id`])
//! - **Schema**: Entity metadata, the provider interface and the resolution
//!   barrier ([`schema`] module)
//! - **DTO**: The fully resolved DTO type graph handed to emitters
//!   ([`dto`] module)

pub mod dto;
pub mod identifier;
pub mod schema;
