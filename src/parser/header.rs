//! Verbatim header access.
//!
//! Header values are exported exactly as written in the message: encoded
//! words stay encoded and folded lines stay folded.

use mailparse::{MailHeader, MailHeaderMap};

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Value of the first header called `name` (case-insensitive), or `""`.
pub fn raw_header_value(headers: &[MailHeader<'_>], name: &str) -> String {
    headers
        .get_first_header(name)
        .map(|header| trim_value(&decode_header_bytes(header.get_value_raw())))
        .unwrap_or_default()
}

/// Split a header block into `(lowercase_name, value)` pairs without a MIME parser.
///
/// Used for messages `mailparse` rejects. Continuation lines (starting with
/// space or tab) are appended to the previous value with their line break.
pub fn scan_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            break; // End of headers
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation line
            if let Some(last) = result.last_mut() {
                last.1.push('\n');
                last.1.push_str(line.trim_end_matches('\r'));
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = trim_value(&line[colon_pos + 1..]);
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// Get the first value for a header name from [`scan_headers`] output, or `""`.
pub fn get_header(headers: &[(String, String)], name: &str) -> String {
    let name = name.to_lowercase();
    headers
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

fn trim_value(value: &str) -> String {
    value
        .trim_start_matches([' ', '\t'])
        .trim_end_matches(['\r', '\n', ' ', '\t'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header_bytes_utf8() {
        assert_eq!(decode_header_bytes("Señor".as_bytes()), "Señor");
    }

    #[test]
    fn test_decode_header_bytes_windows_1252() {
        assert_eq!(decode_header_bytes(b"M\xfcller"), "Müller");
    }

    #[test]
    fn test_raw_header_value_keeps_encoded_words() {
        let raw = b"Subject: =?UTF-8?B?SG9sYQ==?=\nFrom: a@example.com\n\nbody\n";
        let mail = mailparse::parse_mail(raw).unwrap();
        assert_eq!(
            raw_header_value(&mail.headers, "subject"),
            "=?UTF-8?B?SG9sYQ==?="
        );
        assert_eq!(raw_header_value(&mail.headers, "From"), "a@example.com");
        assert_eq!(raw_header_value(&mail.headers, "To"), "");
    }

    #[test]
    fn test_raw_header_value_first_occurrence_wins() {
        let raw = b"To: first@example.com\nTo: second@example.com\n\nbody\n";
        let mail = mailparse::parse_mail(raw).unwrap();
        assert_eq!(raw_header_value(&mail.headers, "to"), "first@example.com");
    }

    #[test]
    fn test_scan_headers_keeps_folding() {
        let text = "Subject: long\n\tsubject\nFrom: x@example.com\n\nBody: not a header\n";
        let headers = scan_headers(text);
        assert_eq!(get_header(&headers, "Subject"), "long\n\tsubject");
        assert_eq!(get_header(&headers, "from"), "x@example.com");
        assert_eq!(get_header(&headers, "body"), "");
    }
}
