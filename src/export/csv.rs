//! CSV serializer.
//!
//! Plain UTF-8 (no BOM), `\r\n` row terminators, minimal RFC 4180 quoting.
//! Bodies are written in full.

use std::io::{self, Write};

use crate::model::record::MessageRecord;

use super::RecordFormat;

/// Header row `index,subject,from,to,date,body`, then one row per record.
#[derive(Debug, Default)]
pub struct CsvFormat;

impl RecordFormat for CsvFormat {
    fn begin(&mut self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "{}\r\n", MessageRecord::FIELDS.join(","))
    }

    fn write_record(&mut self, out: &mut dyn Write, record: MessageRecord) -> io::Result<()> {
        write!(
            out,
            "{},{},{},{},{},{}\r\n",
            record.index,
            csv_escape(&record.subject),
            csv_escape(&record.from),
            csv_escape(&record.to),
            csv_escape(&record.date),
            csv_escape(&record.body),
        )
    }
}

/// Escape a value for CSV (RFC 4180).
///
/// Wraps in double quotes if the value contains commas, quotes, or newlines.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape_simple() {
        assert_eq!(csv_escape("hello"), "hello");
    }

    #[test]
    fn test_csv_escape_comma() {
        assert_eq!(csv_escape("hello, world"), "\"hello, world\"");
    }

    #[test]
    fn test_csv_escape_quotes() {
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_csv_escape_newline() {
        assert_eq!(csv_escape("line1\nline2"), "\"line1\nline2\"");
    }

    #[test]
    fn test_csv_rows() {
        let mut format = CsvFormat;
        let mut out = Vec::new();
        format.begin(&mut out).unwrap();
        format
            .write_record(
                &mut out,
                MessageRecord {
                    index: 7,
                    subject: "Re: lunch, today?".into(),
                    from: "Ann <ann@example.com>".into(),
                    to: String::new(),
                    date: "Wed, 3 Jan 2024 12:00:00 +0000".into(),
                    body: "See \"you\" there\n".into(),
                },
            )
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "index,subject,from,to,date,body\r\n\
             7,\"Re: lunch, today?\",Ann <ann@example.com>,,\"Wed, 3 Jan 2024 12:00:00 +0000\",\"See \"\"you\"\" there\n\"\r\n"
        );
    }
}
