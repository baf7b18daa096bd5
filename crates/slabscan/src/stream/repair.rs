//! Completion of truncated JSON documents.
//!
//! The provider streams one JSON document as raw text, so at any moment the
//! client holds an arbitrary prefix of it. [`complete_partial_json`] turns
//! such a prefix into a parseable document: open value strings are closed,
//! open containers are closed, and fragments that cannot be completed
//! (dangling keys, half-spelled literals, trailing commas) are dropped back
//! to the last position where truncation yields valid JSON.
//!
//! Uses a stateful scanner that tracks string boundaries and escape
//! sequences, like the JSON extraction in classic LLM-response parsing.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

impl Container {
    fn closer(self) -> char {
        match self {
            Container::Object => '}',
            Container::Array => ']',
        }
    }
}

/// Escape-sequence progress inside a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Started,
    Unicode(u8),
}

/// Last input position where truncating and appending closers yields a
/// well-formed document.
struct StablePoint {
    end: usize,
    closers: Vec<Container>,
    set: bool,
}

impl StablePoint {
    fn new() -> Self {
        Self {
            end: 0,
            closers: Vec::new(),
            set: false,
        }
    }

    fn mark(&mut self, end: usize, stack: &[Container]) {
        self.end = end;
        self.closers.clear();
        self.closers.extend_from_slice(stack);
        self.set = true;
    }
}

/// Completes a truncated JSON document, or returns `None` when no prefix of
/// the input can be completed yet (e.g. empty input or a lone `"`).
pub fn complete_partial_json(input: &str) -> Option<String> {
    let mut stack: Vec<Container> = Vec::new();
    let mut stable = StablePoint::new();

    let mut in_string = false;
    let mut string_is_key = false;
    let mut escape = Escape::None;
    // Index after the last string content that survives closing the quote
    // early (excludes incomplete escape sequences).
    let mut string_safe_end = 0;

    let mut expecting_key = false;
    let mut in_number = false;
    let mut literal = String::new();

    for (i, c) in input.char_indices() {
        let next_index = i + c.len_utf8();

        if in_string {
            match escape {
                Escape::Started => {
                    if c == 'u' {
                        escape = Escape::Unicode(0);
                    } else {
                        escape = Escape::None;
                        string_safe_end = next_index;
                    }
                    continue;
                }
                Escape::Unicode(n) => {
                    if c.is_ascii_hexdigit() {
                        if n == 3 {
                            escape = Escape::None;
                            string_safe_end = next_index;
                        } else {
                            escape = Escape::Unicode(n + 1);
                        }
                    } else {
                        // Malformed escape; nothing from the backslash on is
                        // usable.
                        break;
                    }
                    continue;
                }
                Escape::None => {}
            }
            match c {
                '\\' => escape = Escape::Started,
                '"' => {
                    in_string = false;
                    if !string_is_key {
                        stable.mark(next_index, &stack);
                    }
                }
                _ => string_safe_end = next_index,
            }
            continue;
        }

        // A number or literal scan ends at the first non-member character.
        if in_number && !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
            in_number = false;
        }
        if !literal.is_empty() && !c.is_ascii_alphabetic() {
            literal.clear();
        }

        match c {
            '{' => {
                stack.push(Container::Object);
                expecting_key = true;
                stable.mark(next_index, &stack);
            }
            '[' => {
                stack.push(Container::Array);
                stable.mark(next_index, &stack);
            }
            '}' | ']' => {
                if stack.pop().is_none() {
                    break;
                }
                stable.mark(next_index, &stack);
            }
            '"' => {
                in_string = true;
                string_is_key = expecting_key && stack.last() == Some(&Container::Object);
                escape = Escape::None;
                string_safe_end = next_index;
            }
            ':' => expecting_key = false,
            ',' => expecting_key = stack.last() == Some(&Container::Object),
            '-' => in_number = true,
            '.' | '+' => {
                if !in_number {
                    break;
                }
            }
            c if c.is_ascii_digit() => {
                in_number = true;
                // A number ending in a digit is a complete value.
                stable.mark(next_index, &stack);
            }
            c if c.is_ascii_alphabetic() => {
                if in_number && matches!(c, 'e' | 'E') {
                    continue;
                }
                literal.push(c);
                if literal == "true" || literal == "false" || literal == "null" {
                    stable.mark(next_index, &stack);
                    literal.clear();
                } else if !["true", "false", "null"]
                    .iter()
                    .any(|l| l.starts_with(literal.as_str()))
                {
                    break;
                }
            }
            c if c.is_whitespace() => {}
            _ => break,
        }
    }

    // An unterminated value string can be closed in place, which beats
    // falling back to the last stable point.
    if in_string && !string_is_key {
        let mut out = String::with_capacity(string_safe_end + stack.len() + 1);
        out.push_str(&input[..string_safe_end]);
        out.push('"');
        for container in stack.iter().rev() {
            out.push(container.closer());
        }
        return Some(out);
    }

    if !stable.set {
        return None;
    }

    let mut out = String::with_capacity(stable.end + stable.closers.len());
    out.push_str(&input[..stable.end]);
    for container in stable.closers.iter().rev() {
        out.push(container.closer());
    }
    Some(out)
}
