//! Re-exports the closed `Language` enum (§6 "well-known identifiers").
//!
//! Kept as its own module, in the teacher's tradition of a dedicated
//! `parsing::language`, even though the type itself now lives in
//! `crate::types` alongside the other closed-set enumerations (§9).

pub use crate::types::Language;
