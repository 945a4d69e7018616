//! Character decoding of fetched pages.
//!
//! Many of the sites this service scrapes serve GBK or GB18030 without
//! declaring it, so the response charset cannot be trusted on its own.
//! Decoding walks a short ordered list of candidate encodings:
//!
//! 1. the SDD `encoding` hint, if any
//! 2. the charset named in the `Content-Type` header, if any
//! 3. `utf-8`, `gbk`, `gb18030`
//!
//! A declared candidate (1 or 2) that decodes without malformed sequences
//! is taken as is. Otherwise the fallbacks are tried: first the first one
//! that decodes cleanly *and* yields at least one Han character, then the
//! first one that decodes cleanly at all. This is a heuristic: a page can
//! decode cleanly under the wrong encoding.

use encoding_rs::Encoding;
use sitefeed_core::Error;

/// Encodings tried after any hint and declared charset.
pub const FALLBACK_ENCODINGS: &[&str] = &["utf-8", "gbk", "gb18030"];

/// Extract the `charset` parameter from a `Content-Type` value.
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']))
            .filter(|v| !v.is_empty())
    })
}

/// Ordered candidate encodings for one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeCandidates {
    /// From the SDD hint and the response charset, in that order.
    pub declared: Vec<&'static Encoding>,
    /// Undeclared guesses, minus anything already declared.
    pub fallback: Vec<&'static Encoding>,
}

impl DecodeCandidates {
    pub fn iter(&self) -> impl Iterator<Item = &'static Encoding> + '_ {
        self.declared.iter().chain(&self.fallback).copied()
    }
}

/// Build the ordered, de-duplicated candidate lists.
///
/// Unknown labels are skipped.
pub fn candidate_encodings(hint: Option<&str>, content_type: Option<&str>) -> DecodeCandidates {
    let declared_charset = content_type.and_then(charset_from_content_type);
    let mut declared: Vec<&'static Encoding> = Vec::new();
    let mut fallback: Vec<&'static Encoding> = Vec::new();

    let labels = hint
        .into_iter()
        .chain(declared_charset)
        .map(|label| (label, true))
        .chain(FALLBACK_ENCODINGS.iter().map(|label| (*label, false)));

    for (label, is_declared) in labels {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) if declared.contains(&encoding) || fallback.contains(&encoding) => {}
            Some(encoding) if is_declared => declared.push(encoding),
            Some(encoding) => fallback.push(encoding),
            None => tracing::debug!(label, "ignoring unknown encoding label"),
        }
    }

    DecodeCandidates { declared, fallback }
}

fn try_decode(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let text = encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|t| t.into_owned());
    if text.is_none() {
        tracing::debug!(encoding = encoding.name(), "decode attempt failed");
    }
    text
}

/// Decode `bytes` using the candidate chain.
///
/// A byte-order mark overrides the chain, and a clean declared candidate
/// overrides the fallbacks.
///
/// # Errors
///
/// Returns `Error::DecodeFailed` if no candidate decodes without errors.
pub fn decode_page(bytes: &[u8], candidates: &DecodeCandidates) -> Result<(String, &'static Encoding), Error> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let body = &bytes[bom_len..];
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(body) {
            return Ok((text.into_owned(), encoding));
        }
    }

    let declared = candidates
        .declared
        .iter()
        .find_map(|&encoding| try_decode(bytes, encoding).map(|text| (text, encoding)));
    if let Some((text, encoding)) = declared {
        tracing::debug!(encoding = encoding.name(), "decoded page with declared encoding");
        return Ok((text, encoding));
    }

    let decoded: Vec<(&'static Encoding, String)> = candidates
        .fallback
        .iter()
        .filter_map(|&encoding| try_decode(bytes, encoding).map(|text| (encoding, text)))
        .collect();

    let chosen = decoded
        .iter()
        .find(|(_, text)| contains_han(text))
        .or_else(|| decoded.first());

    match chosen {
        Some((encoding, text)) => {
            tracing::debug!(encoding = encoding.name(), "decoded page with fallback encoding");
            Ok((text.clone(), *encoding))
        }
        None => {
            let tried: Vec<&str> = candidates.iter().map(|e| e.name()).collect();
            Err(Error::DecodeFailed(format!("no clean decoding among [{}]", tried.join(", "))))
        }
    }
}

/// Whether `text` contains a CJK unified ideograph.
pub fn contains_han(text: &str) -> bool {
    text.chars().any(|c| matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}'))
}
