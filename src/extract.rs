//! Message extraction: turns every archive message into a [`MessageRecord`]
//! and streams the records into a [`ChunkedWriter`].

use std::path::Path;

use tracing::{debug, warn};

use crate::config::ExtractConfig;
use crate::error::Result;
use crate::export::{ChunkedWriter, OutputFormat};
use crate::model::record::{ExtractSummary, MessageRecord};
use crate::parser::charset::{self, DecodePolicy};
use crate::parser::header::{self, raw_header_value};
use crate::parser::mbox::MboxParser;
use crate::parser::mime;

/// Build the record for one raw message.
///
/// `raw_message` may start with its `From ` separator line. This never
/// fails: a message the MIME parser rejects is exported from a plain
/// header scan and its raw body.
pub fn extract_record(index: u64, raw_message: &[u8], policy: DecodePolicy) -> MessageRecord {
    match mime::parse_message(raw_message) {
        Ok(mail) => MessageRecord {
            index,
            subject: raw_header_value(&mail.headers, "Subject"),
            from: raw_header_value(&mail.headers, "From"),
            to: raw_header_value(&mail.headers, "To"),
            date: raw_header_value(&mail.headers, "Date"),
            body: mime::body_text(&mail, policy),
        },
        Err(e) => {
            warn!(index, error = %e, "Unparseable MIME structure, exporting raw body");
            fallback_record(index, raw_message, policy)
        }
    }
}

fn fallback_record(index: u64, raw_message: &[u8], policy: DecodePolicy) -> MessageRecord {
    let (header_bytes, body_bytes) = mime::split_fallback(raw_message);
    let headers = header::scan_headers(&header::decode_header_bytes(header_bytes));
    MessageRecord {
        index,
        subject: header::get_header(&headers, "subject"),
        from: header::get_header(&headers, "from"),
        to: header::get_header(&headers, "to"),
        date: header::get_header(&headers, "date"),
        body: charset::resolve(body_bytes, None, policy),
    }
}

/// Stream every message of `parser`'s archive into `writer`.
///
/// Messages are numbered from 1 in archive order. The writer is finished
/// (last chunk flushed and closed) once the archive is exhausted. An I/O
/// error on either side stops the run; chunk files already closed stay on
/// disk.
pub fn extract_mbox(
    parser: &MboxParser,
    mut writer: ChunkedWriter,
    policy: DecodePolicy,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<ExtractSummary> {
    let mut index: u64 = 0;

    let count = parser.parse(
        &mut |offset, raw| {
            index += 1;
            debug!(index, offset, length = raw.len(), "Extracting message");
            writer.write(extract_record(index, raw, policy))?;
            Ok(true)
        },
        progress,
    )?;
    debug!(messages = count, path = %parser.path().display(), "Archive exhausted");

    writer.finish()
}

/// Export `mbox_path` to chunk files derived from `output_path`.
///
/// The decode policy follows the format (see [`OutputFormat::decode_policy`]).
pub fn export_mbox(
    mbox_path: &Path,
    output_path: &Path,
    format: OutputFormat,
    config: &ExtractConfig,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<ExtractSummary> {
    config.validate()?;
    let parser = MboxParser::with_config(mbox_path, config)?;
    let writer = ChunkedWriter::new(output_path, config.chunk_size, format)?;
    extract_mbox(&parser, writer, format.decode_policy(), progress)
}
