//! Backend collaborator contract for the formulary system.
//!
//! [`FormulaApi`] is the logical interface the wizard consumes (catalog,
//! phases, functions, compatibility, generation, save). [`FixtureApi`]
//! implements it from a local TOML or JSON catalog file.

pub mod error;
pub mod fixture;
pub mod traits;

pub use error::ApiError;
pub use fixture::{FixtureApi, FixtureCatalog, IncompatiblePair, Template, TemplateLine};
pub use traits::FormulaApi;
