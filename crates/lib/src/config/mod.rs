//! Configuration Model.
//!
//! The declarative stack definition, the environment profiles it is compiled
//! against, and the validation that gates graph construction.

mod load;
mod profile;
mod route;
mod types;
mod validate;

pub use load::LoadError;
pub use profile::*;
pub use route::{PathSegment, join_path, parse_path};
pub use types::*;
pub use validate::{RecordKind, RecordRef, ValidatedStack, ValidationError, validate};
