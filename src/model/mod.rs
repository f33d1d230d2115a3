//! Core data model types.

pub mod record;
