//! Terminal colorization for JSON output
//!
//! Applies ANSI escape codes to pretty-printed JSON using crossterm.

use crossterm::style::{Color, Stylize};

/// Colorize pretty-printed JSON
///
/// - Object keys: Cyan
/// - String values: Green
/// - Numbers: Yellow
/// - `true`, `false`, `null`: Magenta
/// - Punctuation and whitespace: uncolored
pub fn colorize_json(input: &str) -> String {
    let mut result = String::with_capacity(input.len() * 2);
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let start = i;
                i += 1;
                while i < chars.len() {
                    match chars[i] {
                        '\\' => i += 2,
                        '"' => {
                            i += 1;
                            break;
                        }
                        _ => i += 1,
                    }
                }
                let end = i.min(chars.len());
                let token: String = chars[start..end].iter().collect();
                let color = if is_object_key(&chars[end..]) {
                    Color::Cyan
                } else {
                    Color::Green
                };
                result.push_str(&format!("{}", token.with(color)));
            }
            '-' | '0'..='9' => {
                let start = i;
                while i < chars.len()
                    && matches!(chars[i], '-' | '+' | '.' | 'e' | 'E' | '0'..='9')
                {
                    i += 1;
                }
                let token: String = chars[start..i].iter().collect();
                result.push_str(&format!("{}", token.with(Color::Yellow)));
            }
            't' | 'f' | 'n' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let token: String = chars[start..i].iter().collect();
                result.push_str(&format!("{}", token.with(Color::Magenta)));
            }
            _ => {
                result.push(c);
                i += 1;
            }
        }
    }

    result
}

/// A string token is a key if the next non-space character is a colon
fn is_object_key(rest: &[char]) -> bool {
    rest.iter()
        .find(|c| !c.is_whitespace())
        .map(|c| *c == ':')
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_ansi(input: &str) -> String {
        let mut out = String::new();
        let mut in_escape = false;
        for c in input.chars() {
            if c == '\x1b' {
                in_escape = true;
            } else if in_escape {
                if c == 'm' {
                    in_escape = false;
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_colorize_preserves_content() {
        let input = "{\n  \"id\": \"d-1\",\n  \"count\": -2.5e3,\n  \"done\": false\n}";
        let output = colorize_json(input);
        assert!(output.contains("\x1b["));
        assert_eq!(strip_ansi(&output), input);
    }

    #[test]
    fn test_escaped_quotes_stay_in_one_token() {
        let input = r#"{"title": "say \"hi\""}"#;
        let output = colorize_json(input);
        assert_eq!(strip_ansi(&output), input);
    }

    #[test]
    fn test_key_detection() {
        assert!(is_object_key(&[' ', ':', ' ']));
        assert!(!is_object_key(&[',', '\n']));
        assert!(!is_object_key(&[]));
    }
}
