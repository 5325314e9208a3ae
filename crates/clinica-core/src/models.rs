//! Domain models for CLINICA.
//!
//! These are the core types shared across all crates.

pub mod appointment;
pub mod consultorio;
pub mod package;
pub mod staff;
