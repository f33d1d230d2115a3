//! JSON array and JSON Lines serializers.
//!
//! Both keep non-ASCII characters literal (`serde_json` never escapes them).

use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::model::record::MessageRecord;

use super::RecordFormat;

/// One pretty-printed (2-space indent) JSON array per chunk file.
///
/// Records are buffered until the chunk is closed. The file has no
/// trailing newline.
#[derive(Debug, Default)]
pub struct JsonArrayFormat {
    pending: Vec<MessageRecord>,
}

impl RecordFormat for JsonArrayFormat {
    fn write_record(&mut self, _out: &mut dyn Write, record: MessageRecord) -> io::Result<()> {
        self.pending.push(record);
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, &self.pending)?;
        self.pending.clear();
        Ok(())
    }
}

/// One JSON object per line, `\n`-terminated.
///
/// Objects stay on one line with a space after every `,` and `:`
/// (`{"index": 1, "subject": "..."}`).
#[derive(Debug, Default)]
pub struct JsonLinesFormat;

impl RecordFormat for JsonLinesFormat {
    fn write_record(&mut self, out: &mut dyn Write, record: MessageRecord) -> io::Result<()> {
        let mut serializer = serde_json::Serializer::with_formatter(&mut *out, SpacedFormatter);
        record.serialize(&mut serializer)?;
        out.write_all(b"\n")
    }
}

/// Single-line layout with `, ` and `: ` separators.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}
