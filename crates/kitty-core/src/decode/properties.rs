//! Flat `key=value` decoder
//!
//! Line oriented, best effort: a line that cannot be parsed is skipped and
//! logged, only an unreadable byte stream fails the whole decode.

use tracing::debug;

use super::FlatMap;
use crate::error::DecodeError;

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// Decode flat `key=value` text.
///
/// Supports `#`/`!` comment lines, `=`, `:` or whitespace separators,
/// trailing-backslash line continuation and the usual escapes
/// (`\t \n \r \f \uXXXX`, escaped separators). When a key repeats, the
/// last occurrence wins.
pub fn decode_properties(raw: &[u8]) -> Result<FlatMap, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        let line = raw[..e.valid_up_to()]
            .iter()
            .filter(|b| **b == b'\n')
            .count()
            + 1;
        DecodeError::MalformedLine {
            line,
            reason: "invalid UTF-8 byte sequence".to_string(),
        }
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut map = FlatMap::new();
    for (line, logical) in logical_lines(text) {
        match parse_pair(&logical) {
            Ok((key, value)) => {
                map.insert(key, value);
            }
            Err(reason) => debug!(line, %reason, "Skipping malformed properties line"),
        }
    }
    Ok(map)
}

/// Join continued physical lines. Yields the 1-based starting line number
/// with the joined text; comment and blank lines are dropped.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, physical) in text.lines().enumerate() {
        let trimmed = physical.trim_start_matches(is_blank);
        let (body, continues) = split_continuation(trimmed);

        let (start, mut acc) = match pending.take() {
            Some(open) => open,
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                (idx + 1, String::new())
            }
        };
        acc.push_str(body);
        if continues {
            pending = Some((start, acc));
        } else {
            lines.push((start, acc));
        }
    }

    if let Some(open) = pending {
        lines.push(open);
    }
    lines
}

/// An odd number of trailing backslashes continues onto the next line.
fn split_continuation(line: &str) -> (&str, bool) {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    if trailing % 2 == 1 {
        (&line[..line.len() - 1], true)
    } else {
        (line, false)
    }
}

fn parse_pair(line: &str) -> Result<(String, String), String> {
    let mut escaped = false;
    let mut split = None;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                split = Some((i, i + 1));
                break;
            }
            c if is_blank(c) => {
                let rest = line[i..].trim_start_matches(is_blank);
                let offset = line.len() - rest.len();
                if rest.starts_with('=') || rest.starts_with(':') {
                    split = Some((i, offset + 1));
                } else {
                    split = Some((i, offset));
                }
                break;
            }
            _ => {}
        }
    }

    // A key with no separator maps to an empty value.
    let (key_end, value_start) = split.unwrap_or((line.len(), line.len()));
    let key = unescape(&line[..key_end])?;
    if key.is_empty() {
        return Err("empty key".to_string());
    }
    let value = unescape(line[value_start..].trim_start_matches(is_blank))?;
    Ok((key, value))
}

fn unescape(s: &str) -> Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => out.push(unicode_escape(&mut chars)?),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn read_hex4(chars: &mut std::str::Chars<'_>) -> Result<u32, String> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 {
        return Err(format!("malformed \\u escape '\\u{hex}'"));
    }
    u32::from_str_radix(&hex, 16).map_err(|_| format!("malformed \\u escape '\\u{hex}'"))
}

/// Decode the digits after `\u`, pairing UTF-16 surrogates.
fn unicode_escape(chars: &mut std::str::Chars<'_>) -> Result<char, String> {
    let code = read_hex4(chars)?;
    let scalar = if (0xD800..0xDC00).contains(&code) {
        if chars.next() != Some('\\') || chars.next() != Some('u') {
            return Err("unpaired surrogate in \\u escape".to_string());
        }
        let low = read_hex4(chars)?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err("unpaired surrogate in \\u escape".to_string());
        }
        0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00)
    } else {
        code
    };
    char::from_u32(scalar).ok_or_else(|| format!("invalid code point U+{scalar:04X}"))
}
