//! Core types and rules for the formulary system.
//!
//! Holds the formula data model, the product-type and wizard enums,
//! percentage arithmetic, per-step validation rules, and the payload
//! shapes exchanged with the backend collaborators.

pub mod catalog;
pub mod enums;
pub mod formula;
pub mod payload;
pub mod percent;
pub mod validation;
