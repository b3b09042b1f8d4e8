//! # span_core - UK Timber Span Tables
//!
//! `span_core` holds the structural timber span tables (floor joists, ceiling
//! joists, roof rafters, stair stringers, stud walls), derives the grades and
//! sections the primary sources do not tabulate, and checks the result for
//! engineering consistency before it is published.
//!
//! ## Design Philosophy
//!
//! - **Nothing fabricated**: a derived value always names the value and rule it came from
//! - **Never overwrite**: derivation only fills empty slots, so it can be rerun safely
//! - **JSON-First**: the database round-trips through the span table document format
//! - **Rich Errors**: structured error types, validation findings in a report
//!
//! ## Quick Start
//!
//! ```rust
//! use span_core::seed::build_reference_database;
//! use span_core::validation::validate;
//!
//! let (db, outcome) = build_reference_database().unwrap();
//! assert!(outcome.is_complete());
//!
//! let report = validate(&db);
//! assert!(report.passed);
//! ```
//!
//! ## Modules
//!
//! - [`timber`] - Strength grades, section sizes, spacings and the size registry
//! - [`tables`] - Span entries, provenance, condition keys and grade tables
//! - [`elements`] - Structural elements with their loading and design criteria
//! - [`database`] - The root span database and its metadata
//! - [`ratios`] - Grade ratios, size factors and rounding
//! - [`config`] - Engine configuration and the TOML rule table
//! - [`derivation`] - Fills missing grades and sections
//! - [`validation`] - Consistency checks over a whole database
//! - [`file_io`] - Validated, atomic saves and version-checked loads
//! - [`seed`] - The reference C16 seed and standard derivation requests
//! - [`errors`] - Structured error types

pub mod config;
pub mod database;
pub mod derivation;
pub mod elements;
pub mod errors;
pub mod file_io;
pub mod ratios;
pub mod seed;
pub mod tables;
pub mod timber;
pub mod validation;

// Re-export commonly used types at crate root for convenience
pub use config::EngineConfig;
pub use database::{SpanDatabase, SCHEMA_VERSION};
pub use derivation::{derive_grade, derive_missing, DerivationEngine, DerivationRequest, DerivationSummary};
pub use elements::StructuralElement;
pub use errors::{SpanError, SpanResult};
pub use file_io::{load_database, save_database};
pub use tables::{ConditionKey, ConfidenceLevel, GradeTable, SpanEntry};
pub use timber::{SectionSize, Spacing, StrengthGrade};
pub use validation::{validate, validate_with, ValidationReport};
