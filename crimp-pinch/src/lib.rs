//! # crimp-pinch
//!
//! Record mapping for crimp.
//!
//! This crate provides:
//! - The `Pinchable` contract between user types and the dynamic value
//!   model, with impls for primitives, strings, binaries, and containers
//! - `StructBuilder` / `StructParser` for field-id based records with
//!   required and optional fields, plus union extraction
//! - The `pinch_enum!` declarative enumeration descriptor
//! - `ApplicationException`, the standard exception payload

pub mod error;
pub mod exception;
pub mod parser;
pub mod pinchable;

// Re-exported for the types named in `Pinchable` signatures and for
// `pinch_enum!` expansion.
pub use crimp_protocol as protocol;

pub use error::PinchError;
pub use exception::{ApplicationException, ExceptionKind};
pub use parser::{alt, catch, StructParser};
pub use pinchable::{pinch, unpinch, Pinchable, StructBuilder};
