//! Payload charset resolution.
//!
//! Turns the transfer-decoded bytes of a MIME part into text, given the
//! charset the part declares (if any). Nothing here ever fails: an unknown
//! label, an invalid byte sequence or an undeclared 8-bit payload all end in
//! a lossy decode.
//!
//! Two policies exist because the structured and the headered-text exports
//! treat invalid input differently:
//!
//! - [`DecodePolicy::SubstituteAlways`] decodes with U+FFFD replacement using
//!   the chosen charset, and switches to UTF-8 only for unknown labels.
//! - [`DecodePolicy::StrictThenFallback`] first decodes strictly and redoes
//!   the whole payload as lossy UTF-8 on the first invalid sequence.

use encoding_rs::Encoding;
use tracing::debug;

/// Sentinel charset used by MTAs for 8-bit content of unknown encoding.
pub const UNKNOWN_8BIT: &str = "unknown-8bit";

/// Charset assumed when a part declares none.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Terminal fallback: maps every byte to a code point, never fails.
pub const LATIN_1: &str = "latin-1";

/// Replacement for every horizontal tab in decoded text.
const TAB_REPLACEMENT: &str = "    ";

/// How decoding errors are handled for a declared charset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Replace invalid sequences in place; unknown labels decode as UTF-8.
    SubstituteAlways,
    /// Decode strictly; on any error decode the payload as lossy UTF-8.
    StrictThenFallback,
}

/// A decoder selected from a charset label.
#[derive(Debug, Clone, Copy)]
enum Codec {
    /// 7-bit US-ASCII. Bytes above 0x7F are errors.
    Ascii,
    /// ISO-8859-1 proper: byte `n` is `U+00nn`.
    Latin1,
    /// Anything from the WHATWG label table.
    Whatwg(&'static Encoding),
}

impl Codec {
    fn utf8() -> Codec {
        Codec::Whatwg(encoding_rs::UTF_8)
    }

    /// Look up a codec by label (case-insensitive, surrounding whitespace ignored).
    ///
    /// The WHATWG table folds `us-ascii` and `iso-8859-1` into windows-1252,
    /// so those two families are matched first.
    fn for_label(label: &str) -> Option<Codec> {
        let label = label.trim();
        match label.to_ascii_lowercase().as_str() {
            "ascii" | "us-ascii" | "us_ascii" | "646" => Some(Codec::Ascii),
            "latin-1" | "latin1" | "latin_1" | "iso-8859-1" | "iso8859-1" | "iso_8859-1"
            | "8859" | "l1" => Some(Codec::Latin1),
            _ => Encoding::for_label_no_replacement(label.as_bytes()).map(Codec::Whatwg),
        }
    }

    /// Decode, replacing invalid sequences with U+FFFD.
    fn decode_lossy(self, bytes: &[u8]) -> String {
        match self {
            Codec::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { '\u{FFFD}' })
                .collect(),
            Codec::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Codec::Whatwg(encoding) => {
                let (decoded, _) = encoding.decode_without_bom_handling(bytes);
                decoded.into_owned()
            }
        }
    }

    /// Decode, or `None` at the first invalid sequence.
    fn decode_strict(self, bytes: &[u8]) -> Option<String> {
        match self {
            Codec::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|&b| char::from(b)).collect()),
            Codec::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            Codec::Whatwg(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|decoded| decoded.into_owned()),
        }
    }
}

/// Decode a part payload to text.
///
/// `declared` is the part's `charset` parameter as written. Missing or blank
/// means UTF-8; `unknown-8bit` triggers detection. The result never contains
/// a tab character.
pub fn resolve(payload: &[u8], declared: Option<&str>, policy: DecodePolicy) -> String {
    let declared = declared.map(str::trim).filter(|label| !label.is_empty());

    let text = match declared {
        Some(label) if label.eq_ignore_ascii_case(UNKNOWN_8BIT) => {
            decode_unknown_8bit(payload, policy)
        }
        Some(label) => decode_declared(payload, label, policy),
        None => decode_declared(payload, DEFAULT_CHARSET, policy),
    };

    expand_tabs(&text)
}

/// Guess the charset of an undeclared 8-bit payload.
///
/// Returns the canonical name of the guessed encoding, or `None` when there
/// is nothing to analyse.
pub fn detect_charset(payload: &[u8]) -> Option<&'static str> {
    if payload.is_empty() {
        return None;
    }
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(payload, true);
    Some(detector.guess(None, true).name())
}

/// Replace every tab with four spaces.
pub fn expand_tabs(text: &str) -> String {
    if text.contains('\t') {
        text.replace('\t', TAB_REPLACEMENT)
    } else {
        text.to_string()
    }
}

fn decode_unknown_8bit(payload: &[u8], policy: DecodePolicy) -> String {
    let label = detect_charset(payload).unwrap_or(LATIN_1);
    debug!(charset = label, "Detected charset for unknown-8bit payload");

    match Codec::for_label(label) {
        Some(codec) => codec.decode_lossy(payload),
        None => match policy {
            DecodePolicy::SubstituteAlways => Codec::utf8().decode_lossy(payload),
            DecodePolicy::StrictThenFallback => Codec::Latin1.decode_lossy(payload),
        },
    }
}

fn decode_declared(payload: &[u8], label: &str, policy: DecodePolicy) -> String {
    let codec = Codec::for_label(label);
    if codec.is_none() {
        debug!(charset = label, "Unknown charset, falling back to UTF-8");
    }

    match policy {
        DecodePolicy::SubstituteAlways => codec.unwrap_or_else(Codec::utf8).decode_lossy(payload),
        DecodePolicy::StrictThenFallback => codec
            .and_then(|codec| codec.decode_strict(payload))
            .unwrap_or_else(|| Codec::utf8().decode_lossy(payload)),
    }
}
