//! Email parsing: MBOX streaming parser, verbatim header access, MIME walking and charset resolution.

pub mod charset;
pub mod header;
pub mod mbox;
pub mod mime;
