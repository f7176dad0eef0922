// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `.env` file parser used by `envault import`.
//!
//! Accepts `KEY=value` lines, `#` comments, blank lines, and single or
//! double quoted values that may span several lines. Keys are validated
//! against `[A-Za-z0-9_]+` and upper-cased. Bad lines are collected with
//! their 1-based line number instead of aborting the parse.

use serde::Serialize;

/// Key name fragments that mark a variable as secret.
const SECRET_KEYWORDS: &[&str] = &[
    "SECRET",
    "PASSWORD",
    "TOKEN",
    "KEY",
    "API",
    "AUTH",
    "PRIVATE",
    "CREDENTIAL",
    "PASS",
    "PWD",
    "USER",
    "USERNAME",
    "VITE",
    "NEXT",
];

/// Characters whose presence makes a value look like a secret.
const SECRET_PUNCTUATION: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

/// Values longer than this many characters are treated as secrets.
const SECRET_MIN_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedVariable {
    pub key: String,
    pub value: String,
    pub is_secret: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    /// 1-based line number.
    pub line: usize,
    /// The raw line as it appeared in the file.
    pub content: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    pub variables: Vec<ParsedVariable>,
    pub errors: Vec<ParseError>,
}

/// Parse the contents of a `.env` file.
pub fn parse_env_content(content: &str) -> ParseResult {
    let mut result = ParseResult::default();
    let lines: Vec<&str> = content.split('\n').collect();

    let mut i = 0;
    while i < lines.len() {
        let raw = lines[i];
        let line_number = i + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            i += 1;
            continue;
        }

        let Some((key, rest)) = line.split_once('=') else {
            result.errors.push(line_error(line_number, raw, "Missing \"=\" separator"));
            i += 1;
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            result.errors.push(line_error(line_number, raw, "Empty key name"));
            i += 1;
            continue;
        }
        if !is_valid_key(key) {
            result.errors.push(line_error(
                line_number,
                raw,
                "Invalid key format (only alphanumeric and underscores allowed)",
            ));
            i += 1;
            continue;
        }

        let mut value = rest.trim().to_string();
        if let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') {
            let unquoted = &value[1..];
            value = match unquoted.find(quote) {
                Some(close) => unquoted[..close].to_string(),
                None => {
                    // Multiline: keep consuming lines until the closing quote.
                    let mut joined = unquoted.to_string();
                    i += 1;
                    while i < lines.len() {
                        let next = lines[i];
                        joined.push('\n');
                        match next.find(quote) {
                            Some(close) => {
                                joined.push_str(&next[..close]);
                                break;
                            }
                            None => joined.push_str(next),
                        }
                        i += 1;
                    }
                    joined
                }
            };
        }

        let is_secret = is_likely_secret(key, &value);
        result.variables.push(ParsedVariable {
            key: key.to_uppercase(),
            value,
            is_secret,
        });
        i += 1;
    }

    result
}

fn line_error(line: usize, content: &str, error: &str) -> ParseError {
    ParseError {
        line,
        content: content.to_string(),
        error: error.to_string(),
    }
}

fn is_valid_key(key: &str) -> bool {
    key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Heuristic: a keyword in the name, a long value, or punctuation in the value.
pub fn is_likely_secret(key: &str, value: &str) -> bool {
    let key_upper = key.to_uppercase();
    let has_keyword = SECRET_KEYWORDS.iter().any(|kw| key_upper.contains(kw));
    let looks_random = value.chars().count() > SECRET_MIN_LEN
        || value.chars().any(|c| SECRET_PUNCTUATION.contains(c));
    has_keyword || looks_random
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_pairs_and_skips_comments() {
        let result = parse_env_content("# database\nDB_HOST=localhost\n\nport=5432\n");
        assert!(result.errors.is_empty());
        assert_eq!(result.variables.len(), 2);
        assert_eq!(result.variables[0].key, "DB_HOST");
        assert_eq!(result.variables[0].value, "localhost");
        assert_eq!(result.variables[1].key, "PORT");
        assert_eq!(result.variables[1].value, "5432");
    }

    #[test]
    fn value_keeps_everything_after_first_equals() {
        let result = parse_env_content("URL=postgres://u:p@h/db?sslmode=require");
        assert_eq!(
            result.variables[0].value,
            "postgres://u:p@h/db?sslmode=require"
        );
    }

    #[test]
    fn quoted_values_are_unwrapped() {
        let result = parse_env_content("A=\"hello world\"\nB='single' trailing\n");
        assert_eq!(result.variables[0].value, "hello world");
        assert_eq!(result.variables[1].value, "single");
    }

    #[test]
    fn multiline_quoted_value_spans_lines() {
        let content = "CERT=\"-----BEGIN-----\nabc\n-----END-----\"\nNEXT_ONE=1\n";
        let result = parse_env_content(content);
        assert!(result.errors.is_empty());
        assert_eq!(result.variables.len(), 2);
        assert_eq!(result.variables[0].value, "-----BEGIN-----\nabc\n-----END-----");
        assert_eq!(result.variables[1].key, "NEXT_ONE");
    }

    #[test]
    fn unterminated_quote_consumes_rest_of_file() {
        let result = parse_env_content("A='open\nB=2\n");
        assert_eq!(result.variables.len(), 1);
        assert_eq!(result.variables[0].value, "open\nB=2\n");
    }

    #[test]
    fn errors_carry_line_numbers() {
        let content = "GOOD=1\nno separator\n=value\nBAD-KEY=x\n";
        let result = parse_env_content(content);
        assert_eq!(result.variables.len(), 1);
        let lines: Vec<usize> = result.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert_eq!(result.errors[0].error, "Missing \"=\" separator");
        assert_eq!(result.errors[1].error, "Empty key name");
        assert!(result.errors[2].error.starts_with("Invalid key format"));
        assert_eq!(result.errors[2].content, "BAD-KEY=x");
    }

    #[test]
    fn crlf_lines_are_trimmed() {
        let result = parse_env_content("A=1\r\nB=2\r\n");
        assert_eq!(result.variables[0].value, "1");
        assert_eq!(result.variables[1].value, "2");
    }

    #[test]
    fn secret_heuristic() {
        assert!(is_likely_secret("stripe_api_key", "x"));
        assert!(is_likely_secret("DB_PASSWORD", "hunter2"));
        assert!(is_likely_secret("NEXT_PUBLIC_URL", "x"));
        assert!(is_likely_secret("HOST", "abcdefghijklmnopqrstuvwxyz"));
        assert!(is_likely_secret("HOST", "a.b"));
        assert!(!is_likely_secret("PORT", "5432"));
        assert!(!is_likely_secret("DEBUG", "true"));
    }

    #[test]
    fn secret_flag_is_set_on_variables() {
        let result = parse_env_content("PORT=8080\nGITHUB_TOKEN=abc\n");
        assert!(!result.variables[0].is_secret);
        assert!(result.variables[1].is_secret);
    }
}
