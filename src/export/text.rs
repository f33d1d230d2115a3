//! Headered plain-text serializer.

use std::io::{self, Write};

use crate::model::record::MessageRecord;

use super::RecordFormat;

/// Every record as a `# <index>` marker line, the four header lines, the
/// body and a blank-line separator.
///
/// An archive without messages produces no file at all.
#[derive(Debug, Default)]
pub struct HeaderedTextFormat;

impl RecordFormat for HeaderedTextFormat {
    fn write_record(&mut self, out: &mut dyn Write, record: MessageRecord) -> io::Result<()> {
        writeln!(out, "# {}", record.index)?;
        writeln!(out, "Subject: {}", record.subject)?;
        writeln!(out, "From: {}", record.from)?;
        writeln!(out, "To: {}", record.to)?;
        writeln!(out, "Date: {}", record.date)?;
        out.write_all(record.body.as_bytes())?;
        out.write_all(b"\n\n")
    }

    fn emits_empty_document(&self) -> bool {
        false
    }
}
