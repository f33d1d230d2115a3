//! Streaming MBOX parser.
//!
//! Reads MBOX files line-by-line through a large buffer and hands every
//! message to a callback as soon as its end is known. Only one message is
//! held in memory at a time. Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::ExtractConfig;
use crate::error::{ExtractError, Result};

/// Bytes read between two progress reports.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// Streaming MBOX parser.
///
/// Reads through the file sequentially, invoking a caller-supplied callback for
/// every message boundary it finds. The parser is tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - NUL bytes and other binary content in the body
/// - UTF-8 BOM at the start of the file
///
/// The blank line that separates a message from the next `From ` line is
/// not part of the message. Anything before the first `From ` line is
/// skipped.
pub struct MboxParser {
    path: PathBuf,
    file_size: u64,
    read_buffer_size: usize,
    max_message_size: usize,
}

impl MboxParser {
    /// Create a parser for the given MBOX file with default buffer limits.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(path, &ExtractConfig::default())
    }

    /// Create a parser using the buffer and size limits from `config`.
    pub fn with_config(path: impl AsRef<Path>, config: &ExtractConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractError::FileNotFound(path.clone())
            } else {
                ExtractError::io(&path, e)
            }
        })?;
        if metadata.is_dir() {
            return Err(ExtractError::InvalidPath(format!(
                "{} is a directory",
                path.display()
            )));
        }
        Ok(Self {
            path,
            file_size: metadata.len(),
            read_buffer_size: config.read_buffer_size.max(4096),
            max_message_size: config.max_message_size,
        })
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path to the MBOX file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the full MBOX, calling `message_callback` for each message found.
    ///
    /// The callback receives `(offset, raw_bytes)`, where `raw_bytes` starts
    /// with the `From ` separator line. It returns `Ok(true)` to continue,
    /// `Ok(false)` to stop early, or an error, which aborts the parse and is
    /// returned unchanged.
    ///
    /// Returns the number of messages delivered.
    pub fn parse(
        &self,
        message_callback: &mut dyn FnMut(u64, &[u8]) -> Result<bool>,
        progress_callback: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| ExtractError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(self.read_buffer_size, file);

        let mut count: u64 = 0;
        let mut current_offset: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut message_start: u64 = 0;
        let mut prev_line_was_empty = true;
        let mut in_message = false;
        let mut preamble_len: u64 = 0;
        let mut truncated = false;
        let mut last_progress: u64 = 0;

        // Reusable line buffer
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            let line_len = {
                let buf = reader
                    .fill_buf()
                    .map_err(|e| ExtractError::io(&self.path, e))?;
                if buf.is_empty() {
                    break; // EOF
                }
                let consume_len = match memchr_newline(buf) {
                    Some(pos) => pos + 1,
                    None => buf.len(),
                };
                line_buf.extend_from_slice(&buf[..consume_len]);
                reader.consume(consume_len);
                consume_len as u64
            };

            if is_mbox_separator(&line_buf) {
                if in_message {
                    if !prev_line_was_empty {
                        warn!(
                            offset = current_offset,
                            "Found 'From ' separator without preceding blank line"
                        );
                    }
                    trim_separator_blank_line(&mut message_buf);
                    if !message_callback(message_start, &message_buf)? {
                        return Ok(count);
                    }
                    count += 1;
                } else if preamble_len > 0 {
                    warn!(
                        bytes = preamble_len,
                        "Skipping data before the first 'From ' separator"
                    );
                }
                in_message = true;
                message_start = current_offset;
                message_buf.clear();
                message_buf.extend_from_slice(&line_buf);
                truncated = false;
            } else if !in_message {
                preamble_len += line_len;
            } else if truncated {
                // Rest of an oversized message is dropped
            } else if message_buf.len() + line_buf.len() <= self.max_message_size {
                message_buf.extend_from_slice(&line_buf);
            } else {
                // First time exceeding the limit, warn once per message
                warn!(
                    offset = message_start,
                    max_size = self.max_message_size,
                    "Message exceeds maximum size, truncating body"
                );
                truncated = true;
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            current_offset += line_len;

            if let Some(cb) = progress_callback {
                if current_offset - last_progress >= PROGRESS_INTERVAL {
                    cb(current_offset, self.file_size);
                    last_progress = current_offset;
                }
            }
        }

        if in_message {
            if message_callback(message_start, &message_buf)? {
                count += 1;
            }
        } else if preamble_len > 0 {
            warn!(bytes = preamble_len, "No 'From ' separator found, file holds no messages");
        }

        if let Some(cb) = progress_callback {
            cb(self.file_size, self.file_size);
        }

        Ok(count)
    }
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    // Skip BOM if present at very start
    let line = line.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(line);
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}

/// Drop the one empty line that precedes the next `From ` separator.
fn trim_separator_blank_line(buf: &mut Vec<u8>) {
    if buf.ends_with(b"\r\n\r\n") {
        buf.truncate(buf.len() - 2);
    } else if buf.ends_with(b"\n\n") {
        buf.truncate(buf.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(data: &[u8]) -> Vec<Vec<u8>> {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("t.mbox");
        std::fs::write(&path, data).unwrap();
        let parser = MboxParser::new(&path).unwrap();
        let mut messages = Vec::new();
        parser
            .parse(
                &mut |_offset, bytes| {
                    messages.push(bytes.to_vec());
                    Ok(true)
                },
                None,
            )
            .unwrap();
        messages
    }

    #[test]
    fn test_is_mbox_separator() {
        assert!(is_mbox_separator(
            b"From user@example.com Thu Jan 01 00:00:00 2024\n"
        ));
        assert!(!is_mbox_separator(b"from user@example.com\n")); // lowercase
        assert!(!is_mbox_separator(b">From user@example.com\n")); // escaped
        assert!(!is_mbox_separator(b"Subject: From here\n"));
    }

    #[test]
    fn test_is_mbox_separator_with_bom() {
        let mut line = vec![0xEF, 0xBB, 0xBF];
        line.extend_from_slice(b"From user@example.com Thu Jan 01 00:00:00 2024\n");
        assert!(is_mbox_separator(&line));
    }

    #[test]
    fn test_is_blank_line() {
        assert!(is_blank_line(b"\n"));
        assert!(is_blank_line(b"\r\n"));
        assert!(!is_blank_line(b"hello\n"));
    }

    #[test]
    fn test_separator_blank_line_is_trimmed() {
        let messages = collect(b"From a\nSubject: 1\n\nbody one\n\nFrom b\nSubject: 2\n\nbody two\n");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], b"From a\nSubject: 1\n\nbody one\n");
        assert_eq!(messages[1], b"From b\nSubject: 2\n\nbody two\n");
    }

    #[test]
    fn test_crlf_separator_blank_line_is_trimmed() {
        let messages = collect(b"From a\r\nSubject: 1\r\n\r\nbody\r\n\r\nFrom b\r\n\r\nx\r\n");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], b"From a\r\nSubject: 1\r\n\r\nbody\r\n");
    }

    #[test]
    fn test_separator_without_blank_line_still_splits() {
        let messages = collect(b"From a\n\nfirst\nFrom b\n\nsecond\n");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], b"From a\n\nfirst\n");
    }

    #[test]
    fn test_callback_error_aborts_parse() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("t.mbox");
        std::fs::write(&path, b"From a\n\n1\n\nFrom b\n\n2\n").unwrap();
        let parser = MboxParser::new(&path).unwrap();
        let mut seen = 0;
        let result = parser.parse(
            &mut |_offset, _bytes| {
                seen += 1;
                Err(ExtractError::InvalidPath("stop".into()))
            },
            None,
        );
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_oversized_message_is_truncated() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("t.mbox");
        let mut data = b"From a\n\n".to_vec();
        data.extend(std::iter::repeat(b"0123456789\n".as_slice()).take(100).flatten());
        std::fs::write(&path, &data).unwrap();

        let config = ExtractConfig {
            max_message_size: 64,
            ..ExtractConfig::default()
        };
        let parser = MboxParser::with_config(&path, &config).unwrap();
        let mut sizes = Vec::new();
        parser
            .parse(
                &mut |_offset, bytes| {
                    sizes.push(bytes.len());
                    Ok(true)
                },
                None,
            )
            .unwrap();
        assert_eq!(sizes.len(), 1);
        assert!(sizes[0] <= 64);
    }

    #[test]
    fn test_data_before_first_separator_is_skipped() {
        let messages = collect(b"\nFrom a\nSubject: one\n\nbody1\n\nFrom b\nSubject: two\n\nbody2\n");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], b"From a\nSubject: one\n\nbody1\n");
        assert_eq!(messages[1], b"From b\nSubject: two\n\nbody2\n");

        let messages = collect(b"garbage line\nmore garbage\nFrom a\n\nonly\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], b"From a\n\nonly\n");
    }

    #[test]
    fn test_no_separator_means_no_messages() {
        assert!(collect(b"Subject: not an mbox\n\nbody\n").is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = MboxParser::new("/definitely/not/here.mbox").err().unwrap();
        assert!(matches!(err, ExtractError::FileNotFound(_)));
    }
}
