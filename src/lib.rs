//! `mboxsplit`: split MBOX archives into chunked JSON, JSON Lines, CSV or
//! headered plain-text files.
//!
//! This crate provides the streaming MBOX parser, the payload charset
//! resolver, record extraction, and the chunked writers used by the
//! `mbox-extract` and `mbox-text` binaries.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod model;
pub mod parser;
