//! The exported record and the run summary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One exported message.
///
/// Built once per source message, written immediately, then dropped.
/// Field order is the serialized order in every output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// 1-based position in the archive. Does not reset between output files.
    pub index: u64,

    /// `Subject:` header, verbatim.
    pub subject: String,

    /// `From:` header, verbatim.
    pub from: String,

    /// `To:` header, verbatim.
    pub to: String,

    /// `Date:` header, verbatim (never parsed).
    pub date: String,

    /// Decoded plain-text body. Tabs are already expanded to four spaces.
    pub body: String,
}

impl MessageRecord {
    /// Column names, in serialized order.
    pub const FIELDS: [&'static str; 6] = ["index", "subject", "from", "to", "date", "body"];
}

/// Result of a completed extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractSummary {
    /// Messages read from the archive.
    pub messages: u64,
    /// Output files, in chunk order.
    pub files: Vec<PathBuf>,
    /// Total bytes written across all files.
    pub bytes_written: u64,
}
