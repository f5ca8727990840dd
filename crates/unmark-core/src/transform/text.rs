//! Text run extraction and erasure in content streams.

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

/// PDFDocEncoding code points for bytes 0x80..=0x9F; 0x9F is undefined.
const PDF_DOC_HIGH: [Option<char>; 32] = [
    Some('\u{2022}'), Some('\u{2020}'), Some('\u{2021}'), Some('\u{2026}'),
    Some('\u{2014}'), Some('\u{2013}'), Some('\u{0192}'), Some('\u{2044}'),
    Some('\u{2039}'), Some('\u{203A}'), Some('\u{2212}'), Some('\u{2030}'),
    Some('\u{201E}'), Some('\u{201C}'), Some('\u{201D}'), Some('\u{2018}'),
    Some('\u{2019}'), Some('\u{201A}'), Some('\u{2122}'), Some('\u{FB01}'),
    Some('\u{FB02}'), Some('\u{0141}'), Some('\u{0152}'), Some('\u{0160}'),
    Some('\u{0178}'), Some('\u{017D}'), Some('\u{0131}'), Some('\u{0142}'),
    Some('\u{0153}'), Some('\u{0161}'), Some('\u{017E}'), None,
];

/// Map one PDFDocEncoding byte. Control bytes other than tab, CR and LF,
/// DEL and undefined codes yield `None`.
fn pdf_doc_char(byte: u8) -> Option<char> {
    match byte {
        b'\t' | b'\n' | b'\r' => Some(char::from(byte)),
        0x00..=0x1F | 0x7F => None,
        0x80..=0x9F => PDF_DOC_HIGH[usize::from(byte - 0x80)],
        0xA0 => Some('\u{20AC}'),
        0xAD => None,
        _ => Some(char::from(byte)),
    }
}

/// Decode a PDF string object as text.
///
/// Accepts UTF-16BE and UTF-8 strings with a byte order mark, and
/// single-byte strings in PDFDocEncoding. Single-byte strings holding bytes
/// with no PDFDocEncoding character (e.g. glyph ids) yield `None`.
pub fn decode_text_string(bytes: &[u8]) -> Option<String> {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        if rest.len() % 2 != 0 {
            return None;
        }
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16(&units).ok();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8(rest.to_vec()).ok();
    }
    bytes.iter().map(|&b| pdf_doc_char(b)).collect()
}

/// Text painted by a text-show operation, `None` for other operators or
/// binary strings.
///
/// For `TJ` the string elements of the array are concatenated; kerning
/// numbers and binary strings are skipped.
pub fn shown_text(op: &Operation) -> Option<String> {
    match op.operator.as_str() {
        "Tj" | "'" => string_operand(op.operands.first()?),
        "\"" => string_operand(op.operands.get(2)?),
        "TJ" => {
            let Object::Array(items) = op.operands.first()? else {
                return None;
            };
            Some(items.iter().filter_map(string_operand).collect())
        }
        _ => None,
    }
}

fn string_operand(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => decode_text_string(bytes),
        _ => None,
    }
}

fn empty_string() -> Object {
    Object::String(Vec::new(), StringFormat::Literal)
}

/// Blank every text-show operation whose text starts with `watermark`.
/// Returns the number of operations changed.
pub fn erase_text(operations: &mut [Operation], watermark: &str) -> usize {
    let mut erased = 0;
    for op in operations.iter_mut() {
        let Some(text) = shown_text(op) else {
            continue;
        };
        if !text.starts_with(watermark) {
            continue;
        }

        let slot = match op.operator.as_str() {
            "\"" => op.operands.get_mut(2),
            _ => op.operands.first_mut(),
        };
        if let Some(slot) = slot {
            *slot = if op.operator == "TJ" {
                Object::Array(vec![empty_string()])
            } else {
                empty_string()
            };
            erased += 1;
        }
    }
    erased
}
