//! Streaming PostScript tokenizer.
//!
//! [`next_token`] reads one language object from a [`PsSource`] and leaves
//! the source positioned after it, so an open file can sit on the execution
//! stack and be tokenized lazily, one object per interpreter step. The
//! tokenizer is a character-class state machine with mutually exclusive
//! modes: comment, literal string (nesting-aware, escape-aware), hex string,
//! base-85 string, procedure, and bare token. It has no knowledge of
//! execution semantics; classification of a completed token text is a fixed
//! precedence: integer, real, procedure, string, name.

use crate::error::{Error, PsError, Result};
use crate::model::object::{ArrayRef, Name, PsObject};
use crate::model::vm::Vm;
use smol_str::SmolStr;
use std::rc::Rc;

/// A readable token source: shared bytes plus a read position.
///
/// Procedure bodies are tokenized through a sub-source over the inner text,
/// which is why the window `[pos, end)` is explicit.
#[derive(Debug, Clone)]
pub struct PsSource {
    data: Rc<[u8]>,
    pos: usize,
    end: usize,
}

impl PsSource {
    pub fn new(data: Rc<[u8]>) -> Self {
        let end = data.len();
        Self { data, pos: 0, end }
    }

    /// Copies a byte slice into a fresh source.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::new(Rc::from(data))
    }

    /// Current read position.
    pub fn tell(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    fn advance(&mut self) -> Option<u8> {
        if self.pos >= self.end {
            return None;
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Some(b)
    }

    fn back(&mut self) {
        self.pos -= 1;
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
}

/// Reads the next object from the source.
///
/// Returns the object and the number of bytes consumed for it, or `None` at
/// end of input. A trailing token cut off by end-of-stream is still emitted
/// once.
pub fn next_token(src: &mut PsSource, vm: &mut Vm) -> Result<Option<(PsObject, usize)>> {
    let start_pos = src.tell();
    let mut buf: Vec<u8> = Vec::new();

    let mut in_comment = false;
    let mut in_string = false;
    let mut in_proc = false;
    let mut in_hex = false;
    let mut in_b85 = false;
    let mut proc_depth = 0usize;
    let mut string_depth = 0usize;

    let mut chr: u8 = 0;
    let mut prev: u8 = 0;

    while let Some(read) = src.advance() {
        // An escaped backslash must not escape the character after it.
        if chr == b'\\' && prev == b'\\' {
            prev = 0;
        } else {
            prev = chr;
        }
        chr = read;

        let mut token_before = false;
        let mut append = true;
        let mut token_after = false;

        if in_comment {
            append = false;
            if matches!(chr, b'\n' | b'\x0c' | b'\r') {
                in_comment = false;
            }
        } else if in_string {
            if chr == b')' && prev != b'\\' {
                string_depth -= 1;
                if string_depth == 0 {
                    in_string = false;
                    if !in_proc {
                        token_after = true;
                    }
                }
            } else if chr == b'(' && prev != b'\\' {
                string_depth += 1;
            }
        } else if in_hex {
            if chr == b'>' {
                in_hex = false;
                token_after = true;
            }
        } else if in_b85 {
            if prev == b'~' && chr == b'>' {
                in_b85 = false;
                token_after = true;
            }
        } else if chr == b'%' {
            append = false;
            in_comment = true;
        } else if in_proc {
            if chr == b'}' {
                proc_depth -= 1;
                if proc_depth == 0 {
                    token_after = true;
                    in_proc = false;
                }
            } else if chr == b'(' {
                string_depth += 1;
                in_string = true;
            } else if chr == b'{' {
                proc_depth += 1;
            }
        } else if chr == b'(' {
            string_depth += 1;
            in_string = true;
            token_before = true;
        } else if chr == b'[' || chr == b']' {
            token_before = true;
            token_after = true;
        } else if chr == b'/' {
            token_before = true;
        } else if chr == b'{' {
            token_before = true;
            in_proc = true;
            proc_depth += 1;
        } else if chr == b'<' {
            if prev == b'<' {
                token_after = true;
            } else {
                token_before = true;
            }
        } else if prev == b'<' && chr == b'~' {
            in_b85 = true;
        } else if prev == b'<' {
            in_hex = true;
        } else if chr == b'>' {
            if prev == b'>' {
                token_after = true;
            } else {
                token_before = true;
            }
        } else if is_whitespace(chr) {
            append = false;
            token_before = true;
        }

        if token_before && !buf.is_empty() {
            if !is_whitespace(chr) {
                // Boundary character belongs to the next token.
                src.back();
            }
            let obj = classify(&buf, vm, start_pos)?;
            return Ok(Some((obj, src.tell() - start_pos)));
        }
        if append {
            buf.push(chr);
        }
        if token_after && !buf.is_empty() {
            let obj = classify(&buf, vm, start_pos)?;
            return Ok(Some((obj, src.tell() - start_pos)));
        }
    }

    if !buf.is_empty() {
        let obj = classify(&buf, vm, start_pos)?;
        return Ok(Some((obj, src.tell() - start_pos)));
    }
    Ok(None)
}

/// Tokenizes a complete byte slice into a vector of objects.
pub fn parse_all(data: &[u8], vm: &mut Vm) -> Result<Vec<PsObject>> {
    let mut src = PsSource::from_bytes(data);
    let mut objects = Vec::new();
    while let Some((obj, _)) = next_token(&mut src, vm)? {
        objects.push(obj);
    }
    Ok(objects)
}

/// Converts a complete token text into an object.
///
/// Precedence: integer literal, real literal, procedure, string literal
/// (quoted, hex or base-85), then name.
fn classify(text: &[u8], vm: &mut Vm, pos: usize) -> Result<PsObject> {
    if let Ok(s) = std::str::from_utf8(text) {
        if let Some(n) = parse_integer(s) {
            return Ok(PsObject::Integer(n));
        }
        if let Some(r) = parse_real(s) {
            return Ok(PsObject::Real(r));
        }
    }

    if text.len() >= 2 && text[0] == b'{' && text[text.len() - 1] == b'}' {
        let body = parse_all(&text[1..text.len() - 1], vm)?;
        let r = vm.alloc_array(body);
        return Ok(PsObject::Array(ArrayRef { literal: false, ..r }));
    }

    if text.len() >= 2 && text[0] == b'(' && text[text.len() - 1] == b')' {
        let bytes = decode_quoted_string(&text[1..text.len() - 1]);
        return Ok(PsObject::String(vm.alloc_string(bytes)));
    }
    if text.len() >= 4 && text.starts_with(b"<~") && text.ends_with(b"~>") {
        let bytes = decode_base85(&text[2..text.len() - 2], pos)?;
        return Ok(PsObject::String(vm.alloc_string(bytes)));
    }
    if text.len() >= 2 && text[0] == b'<' && text[text.len() - 1] == b'>' {
        let bytes = decode_hex(&text[1..text.len() - 1], pos)?;
        return Ok(PsObject::String(vm.alloc_string(bytes)));
    }

    let name = SmolStr::from(String::from_utf8_lossy(text));
    if let Some(stripped) = name.strip_prefix('/') {
        Ok(PsObject::Name(Name::literal(stripped)))
    } else {
        Ok(PsObject::Name(Name::executable(name)))
    }
}

/// Parses an integer literal, including the `base#digits` radix form.
fn parse_integer(s: &str) -> Option<i64> {
    match s.find('#') {
        None => s.parse().ok(),
        Some(idx) => {
            let base: u32 = s[..idx].parse().ok()?;
            if !(2..=36).contains(&base) {
                return None;
            }
            i64::from_str_radix(&s[idx + 1..], base).ok()
        }
    }
}

/// Parses a real literal. The leading-character guard keeps textual names
/// such as `nan` or `inf` from being read as numbers.
fn parse_real(s: &str) -> Option<f64> {
    let first = *s.as_bytes().first()?;
    if !(first.is_ascii_digit() || matches!(first, b'+' | b'-' | b'.')) {
        return None;
    }
    s.parse().ok()
}

/// Decodes the body of a parenthesis-delimited string literal: backslash
/// escapes, octal escapes, line continuations. Balanced nested parentheses
/// arrive raw and are kept verbatim.
fn decode_quoted_string(content: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(content.len());
    let mut i = 0;
    while i < content.len() {
        let b = content[i];
        i += 1;
        if b != b'\\' {
            result.push(b);
            continue;
        }
        let Some(&esc) = content.get(i) else { break };
        i += 1;
        match esc {
            b'n' => result.push(b'\n'),
            b'r' => result.push(b'\r'),
            b't' => result.push(b'\t'),
            b'b' => result.push(0x08),
            b'f' => result.push(0x0c),
            b'(' => result.push(b'('),
            b')' => result.push(b')'),
            b'\\' => result.push(b'\\'),
            b'\r' => {
                // Line continuation; swallow an optional following newline.
                if content.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => {}
            c if c.is_ascii_digit() && c < b'8' => {
                let mut octal = (c - b'0') as u32;
                for _ in 0..2 {
                    match content.get(i) {
                        Some(&d) if d.is_ascii_digit() && d < b'8' => {
                            octal = octal * 8 + (d - b'0') as u32;
                            i += 1;
                        }
                        _ => break,
                    }
                }
                result.push((octal & 0xff) as u8);
            }
            c => result.push(c),
        }
    }
    result
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decodes the body of a hex string. Whitespace is ignored; an odd trailing
/// digit supplies the high nibble of the final byte.
fn decode_hex(content: &[u8], pos: usize) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(content.len() / 2);
    let mut pending: Option<u8> = None;
    for &c in content {
        if is_whitespace(c) {
            continue;
        }
        let nibble = hex_value(c).ok_or_else(|| {
            Error::from(PsError::Syntax {
                pos,
                msg: format!("invalid character {:?} in hex string", c as char),
            })
        })?;
        match pending.take() {
            Some(high) => result.push((high << 4) | nibble),
            None => pending = Some(nibble),
        }
    }
    if let Some(high) = pending {
        result.push(high << 4);
    }
    Ok(result)
}

/// Decodes the body of a base-85 string. `z` stands for four zero bytes and
/// is only valid between groups; a final partial group of n characters is
/// padded with `u` and yields n-1 bytes.
fn decode_base85(content: &[u8], pos: usize) -> Result<Vec<u8>> {
    let syntax = |msg: &str| {
        Error::from(PsError::Syntax {
            pos,
            msg: msg.to_string(),
        })
    };

    let mut result = Vec::with_capacity(content.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut filled = 0usize;

    let flush = |group: &[u8; 5], n: usize, out: &mut Vec<u8>| -> Result<()> {
        let mut value: u64 = 0;
        for i in 0..5 {
            let digit = if i < n { group[i] - b'!' } else { b'u' - b'!' };
            value = value * 85 + u64::from(digit);
        }
        if value > u64::from(u32::MAX) {
            return Err(syntax_err(pos, "base-85 group out of range"));
        }
        let bytes = (value as u32).to_be_bytes();
        out.extend_from_slice(&bytes[..n - 1]);
        Ok(())
    };

    for &c in content {
        match c {
            c if is_whitespace(c) => {}
            b'z' if filled == 0 => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[filled] = c;
                filled += 1;
                if filled == 5 {
                    flush(&group, 5, &mut result)?;
                    filled = 0;
                }
            }
            _ => return Err(syntax("invalid character in base-85 string")),
        }
    }
    match filled {
        0 => {}
        1 => return Err(syntax("truncated base-85 group")),
        n => flush(&group, n, &mut result)?,
    }
    Ok(result)
}

fn syntax_err(pos: usize, msg: &str) -> Error {
    Error::from(PsError::Syntax {
        pos,
        msg: msg.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> (Vec<PsObject>, Vm) {
        let mut vm = Vm::new();
        let objs = parse_all(input, &mut vm).expect("tokenize");
        (objs, vm)
    }

    #[test]
    fn integers_and_reals() {
        let (objs, _) = tokens(b"42 -7 +3 2.5 -.5 1e3 16#ff 2#1010");
        assert_eq!(
            objs,
            vec![
                PsObject::Integer(42),
                PsObject::Integer(-7),
                PsObject::Integer(3),
                PsObject::Real(2.5),
                PsObject::Real(-0.5),
                PsObject::Real(1000.0),
                PsObject::Integer(255),
                PsObject::Integer(10),
            ]
        );
    }

    #[test]
    fn nested_escaped_string_is_one_token() {
        let (objs, vm) = tokens(br"(a\(b\)c)");
        assert_eq!(objs.len(), 1);
        let r = objs[0].as_string().unwrap();
        assert_eq!(vm.string(r).unwrap(), b"a(b)c");
    }

    #[test]
    fn balanced_nested_parens_kept_verbatim() {
        let (objs, vm) = tokens(b"(a(b)c)");
        let r = objs[0].as_string().unwrap();
        assert_eq!(vm.string(r).unwrap(), b"a(b)c");
    }

    #[test]
    fn dict_brackets_are_two_char_tokens() {
        let (objs, _) = tokens(b"<<>>");
        assert_eq!(
            objs,
            vec![
                PsObject::Name(Name::executable("<<")),
                PsObject::Name(Name::executable(">>")),
            ]
        );
    }

    #[test]
    fn hex_string_with_odd_digit() {
        let (objs, vm) = tokens(b"<48 65 6C 6C 6F 2>");
        let r = objs[0].as_string().unwrap();
        assert_eq!(vm.string(r).unwrap(), b"Hello\x20");
    }

    #[test]
    fn base85_string_decodes_known_group() {
        let (objs, vm) = tokens(b"<~;Kd,'~>");
        let r = objs[0].as_string().unwrap();
        assert_eq!(vm.string(r).unwrap(), b"Rust");

        let (objs, vm) = tokens(b"<~z~>");
        let r = objs[0].as_string().unwrap();
        assert_eq!(vm.string(r).unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn procedure_tokenizes_lazily_into_array() {
        let (objs, vm) = tokens(b"{1 2 add (x)}");
        assert_eq!(objs.len(), 1);
        let r = objs[0].as_array().unwrap();
        assert!(!r.literal);
        let items = vm.array(r).unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], PsObject::Integer(1));
        assert_eq!(items[2], PsObject::Name(Name::executable("add")));
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let (objs, _) = tokens(b"1 % a (comment) with ) parens\n2");
        assert_eq!(objs, vec![PsObject::Integer(1), PsObject::Integer(2)]);
    }

    #[test]
    fn trailing_unterminated_token_still_emitted() {
        let (objs, _) = tokens(b"foo bar");
        assert_eq!(objs.len(), 2);
        let (objs, _) = tokens(b"12");
        assert_eq!(objs, vec![PsObject::Integer(12)]);
    }

    #[test]
    fn consumed_byte_counts_are_reported() {
        let mut vm = Vm::new();
        let mut src = PsSource::from_bytes(b"  42 /x");
        let (obj, consumed) = next_token(&mut src, &mut vm).unwrap().unwrap();
        assert_eq!(obj, PsObject::Integer(42));
        assert_eq!(consumed, 5); // two spaces, two digits, trailing space
        let (obj, _) = next_token(&mut src, &mut vm).unwrap().unwrap();
        assert_eq!(obj, PsObject::Name(Name::literal("x")));
        assert!(next_token(&mut src, &mut vm).unwrap().is_none());
    }

    #[test]
    fn literal_and_executable_names() {
        let (objs, _) = tokens(b"/lit exec2");
        assert_eq!(
            objs,
            vec![
                PsObject::Name(Name::literal("lit")),
                PsObject::Name(Name::executable("exec2")),
            ]
        );
    }

    #[test]
    fn brackets_are_single_tokens() {
        let (objs, _) = tokens(b"[1 2]");
        assert_eq!(objs.len(), 4);
        assert_eq!(objs[0], PsObject::Name(Name::executable("[")));
        assert_eq!(objs[3], PsObject::Name(Name::executable("]")));
    }
}
