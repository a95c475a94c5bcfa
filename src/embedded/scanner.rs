//! Lexical brace matching for JavaScript bodies.
//!
//! Only the tokens that can hide a brace are understood: string literals,
//! template literals with `${}` substitutions, regular expression literals
//! and comments. Everything else is skipped byte by byte, which is safe for
//! UTF-8 because no continuation byte equals an ASCII delimiter.
//!
//! A `/` starts a regular expression when the previous significant token
//! cannot end an operand: nothing, punctuation such as `(`, `=` or `;`, or
//! a keyword like `return`. The literal must close on its own line;
//! otherwise the `/` is read as division.

/// Bytes after which a `/` begins a regular expression literal.
const REGEX_PRECEDERS: &[u8] = b"(,=:[!&|?{};+-*%<>~^";

/// Keywords after which a `/` begins a regular expression literal.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "yield", "await", "instanceof",
];

enum Frame {
    Code { depth: usize },
    Template,
}

/// Byte offset of the `}` that closes a statement block whose opening `{`
/// sits just before `start`. Returns `None` when the text ends first.
pub fn find_block_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut stack = vec![Frame::Code { depth: 1 }];
    let mut i = start;
    // Offset of the last significant byte seen in code
    let mut last: Option<usize> = None;

    while i < bytes.len() {
        let byte = bytes[i];
        let next = bytes.get(i + 1).copied();

        match stack.last_mut()? {
            Frame::Template => match byte {
                b'\\' => i += 1,
                b'`' => {
                    stack.pop();
                    last = Some(i);
                }
                b'$' if next == Some(b'{') => {
                    stack.push(Frame::Code { depth: 1 });
                    i += 1;
                    last = Some(i);
                }
                _ => {}
            },
            Frame::Code { depth } => {
                match byte {
                    b'/' if next == Some(b'/') => {
                        i = memchr_from(bytes, b'\n', i).unwrap_or(bytes.len());
                        continue;
                    }
                    b'/' if next == Some(b'*') => {
                        i = text.get(i + 2..)?.find("*/").map(|end| i + 2 + end + 2)?;
                        continue;
                    }
                    b'/' if regex_allowed(bytes, last) => {
                        if let Some(end) = skip_regex(bytes, i) {
                            last = Some(end - 1);
                            i = end;
                            continue;
                        }
                    }
                    b'\'' | b'"' => {
                        i = skip_string(bytes, i, byte);
                        last = Some(i - 1);
                        continue;
                    }
                    b'`' => stack.push(Frame::Template),
                    b'{' => *depth += 1,
                    b'}' => {
                        *depth -= 1;
                        if *depth == 0 {
                            if stack.len() == 1 {
                                return Some(i);
                            }
                            stack.pop();
                        }
                    }
                    _ => {}
                }
                if !byte.is_ascii_whitespace() {
                    last = Some(i);
                }
            }
        }
        i += 1;
    }

    None
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

fn regex_allowed(bytes: &[u8], last: Option<usize>) -> bool {
    let Some(last) = last else {
        return true;
    };
    let byte = bytes[last];
    if REGEX_PRECEDERS.contains(&byte) {
        return true;
    }
    if !is_word_byte(byte) {
        return false;
    }
    let word_start = bytes[..last]
        .iter()
        .rposition(|&b| !is_word_byte(b))
        .map_or(0, |position| position + 1);
    let word = &bytes[word_start..=last];
    REGEX_KEYWORDS.iter().any(|keyword| keyword.as_bytes() == word)
}

/// Index just past a regular expression literal starting at `start`, or
/// `None` when no closing `/` follows on the same line.
fn skip_regex(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'\n' => return None,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => return Some(i + 1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index just past a quoted string starting at `start`. Unterminated
/// strings stop at the end of their line.
fn skip_string(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn memchr_from(bytes: &[u8], needle: u8, from: usize) -> Option<usize> {
    bytes[from..]
        .iter()
        .position(|&b| b == needle)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::find_block_end;
    use rstest::rstest;

    fn end_of(body: &str) -> Option<usize> {
        let text = format!("{{{body}");
        find_block_end(&text, 1).map(|end| end - 1)
    }

    #[rstest]
    #[case("\n  foo();\n}", Some(10))]
    #[case("\n  if (a) { b(); }\n}", Some(19))]
    #[case("\n  const s = '}';\n}", Some(18))]
    #[case("\n  const s = \"\\\"}\";\n}", Some(20))]
    #[case("\n  // }\n}", Some(8))]
    #[case("\n  /* } */\n}", Some(11))]
    #[case("\n  const t = `${ {a: 1}.a } }`;\n}", Some(32))]
    #[case("\n  foo();\n", None)]
    #[case("\n  /* never closed }", None)]
    fn finds_balancing_brace(#[case] body: &str, #[case] expected: Option<usize>) {
        assert_eq!(end_of(body), expected);
        if let Some(end) = expected {
            assert_eq!(&body[end..end + 1], "}");
        }
    }

    #[rstest]
    #[case::escaped_brace("\n  const r = /\\{/g;\n  r.test(x);\n}")]
    #[case::bare_closing_brace("\n  const r = /}/;\n  done();\n}")]
    #[case::brace_in_class("\n  const r = /[{]/;\n}")]
    #[case::slash_in_class("\n  if (/[/}]/.test(s)) { go(); }\n}")]
    #[case::after_return("\n  function f() { return /}/; }\n}")]
    #[case::division("\n  const x = (a) / b / c;\n  if (x) { y(); }\n}")]
    #[case::division_after_object("\n  const half = {a: 1} / 2;\n}")]
    fn regex_literals_hide_braces(#[case] body: &str) {
        assert_eq!(end_of(body), Some(body.len() - 1));
    }

    #[test]
    fn unterminated_string_stops_at_line_end() {
        assert_eq!(end_of("\n  const s = 'oops\n}"), Some(19));
    }
}
