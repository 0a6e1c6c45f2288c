//! Configuration management for the formulary system.
//!
//! This crate handles loading and saving `.formulary/config.yaml` files,
//! discovering `.formulary/` directories in the filesystem, and providing
//! typed access to configuration values with `FORMULARY_*` environment
//! overrides.

pub mod config;
pub mod formulary_dir;
