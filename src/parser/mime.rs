//! MIME body assembly: walks a parsed message and decodes its plain-text parts.

use mailparse::{MailParseError, ParsedMail};
use tracing::warn;

use super::charset::{self, DecodePolicy};

/// Maximum depth for recursive multipart descent (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 32;

/// The only content type collected from multipart messages.
const TEXT_PLAIN: &str = "text/plain";

/// A complete message carried as a part.
const MESSAGE_RFC822: &str = "message/rfc822";

/// Parse a raw message (with or without its `From ` separator line).
pub fn parse_message(raw_message: &[u8]) -> Result<ParsedMail<'_>, MailParseError> {
    mailparse::parse_mail(skip_from_line(raw_message))
}

/// Whether the message body is a list of parts or an attached message.
///
/// A `multipart/*` type whose body has no parts (no usable boundary) is a
/// single payload.
pub fn is_multipart(part: &ParsedMail<'_>) -> bool {
    let mimetype = part.ctype.mimetype.to_ascii_lowercase();
    (mimetype.starts_with("multipart/") && !part.subparts.is_empty())
        || is_encapsulated(part)
}

fn is_encapsulated(part: &ParsedMail<'_>) -> bool {
    part.ctype.mimetype.eq_ignore_ascii_case(MESSAGE_RFC822)
}

/// The `charset` parameter exactly as declared, if the part declares one.
pub fn declared_charset<'a>(part: &'a ParsedMail<'_>) -> Option<&'a str> {
    part.ctype.params.get("charset").map(String::as_str)
}

/// Transfer-decoded payload bytes. A payload that cannot be decoded is empty.
pub fn payload(part: &ParsedMail<'_>) -> Vec<u8> {
    part.get_body_raw().unwrap_or_else(|e| {
        warn!(error = %e, "Undecodable part payload, treating as empty");
        Vec::new()
    })
}

/// Decode the body text of a message.
///
/// A multipart message yields the concatenation of all its `text/plain`
/// parts, depth-first in original order, including those inside attached
/// `message/rfc822` parts; every other part is skipped. A single-part
/// message yields its payload, whatever its content type.
pub fn body_text(mail: &ParsedMail<'_>, policy: DecodePolicy) -> String {
    if is_multipart(mail) {
        let mut body = String::new();
        collect_plain_text(mail, policy, 0, &mut body);
        body
    } else {
        decode_part(mail, policy)
    }
}

fn collect_plain_text(part: &ParsedMail<'_>, policy: DecodePolicy, depth: usize, out: &mut String) {
    if part.ctype.mimetype.eq_ignore_ascii_case(TEXT_PLAIN) {
        out.push_str(&decode_part(part, policy));
    }

    let encapsulated = is_encapsulated(part);
    if part.subparts.is_empty() && !encapsulated {
        return;
    }
    if depth >= MAX_DEPTH {
        warn!(depth, "Multipart nesting too deep, skipping inner parts");
        return;
    }

    if encapsulated {
        let raw = payload(part);
        match mailparse::parse_mail(&raw) {
            Ok(inner) => collect_plain_text(&inner, policy, depth + 1, out),
            Err(e) => warn!(error = %e, "Unparseable attached message, skipping"),
        }
        return;
    }
    for sub in &part.subparts {
        collect_plain_text(sub, policy, depth + 1, out);
    }
}

fn decode_part(part: &ParsedMail<'_>, policy: DecodePolicy) -> String {
    let bytes = payload(part);
    if bytes.is_empty() {
        return String::new();
    }
    charset::resolve(&bytes, declared_charset(part), policy)
}

/// Skip the `From ` separator line at the start of MBOX messages.
pub fn skip_from_line(data: &[u8]) -> &[u8] {
    // Handle BOM
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        // Find end of line
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
        return &[];
    }
    data
}

/// Split a message that `mailparse` rejected into its header block and body bytes.
///
/// Everything after the first blank line is the body.
pub fn split_fallback(data: &[u8]) -> (&[u8], &[u8]) {
    let data = skip_from_line(data);
    if let Some(pos) = find(data, b"\r\n\r\n") {
        let lf = find(data, b"\n\n").filter(|&lf| lf < pos);
        return match lf {
            Some(lf) => (&data[..lf + 1], &data[lf + 2..]),
            None => (&data[..pos + 2], &data[pos + 4..]),
        };
    }
    match find(data, b"\n\n") {
        Some(pos) => (&data[..pos + 1], &data[pos + 2..]),
        None => (data, &[]),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
