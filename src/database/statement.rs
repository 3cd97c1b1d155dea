//! Statement text helpers shared by the driver backends.
//!
//! Query text uses named parameters (`@Name`). Drivers that only understand
//! positional placeholders get the text rewritten to `$1, $2, ...` together with
//! the values in bind order. Quoted literals, quoted identifiers and `--` comments
//! are copied through untouched.

use crate::constants::system::STATEMENT_SEPARATOR;
use crate::error::{SqlKitError, SqlKitResult};
use crate::params::Parameters;
use serde_json::Value;

/// A statement rewritten for positional binding
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalStatement {
    pub sql: String,
    /// Values in placeholder order (`$1` is `values[0]`)
    pub values: Vec<Value>,
}

#[derive(Clone, Copy, PartialEq)]
enum Lexeme {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
}

/// Split a batch on top-level `;`, dropping empty statements.
pub fn split_statements(batch: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut state = Lexeme::Code;
    let mut start = 0;
    let mut chars = batch.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        state = match (state, ch) {
            (Lexeme::Code, '\'') => Lexeme::SingleQuoted,
            (Lexeme::Code, '"') => Lexeme::DoubleQuoted,
            (Lexeme::Code, '-') if matches!(chars.peek(), Some((_, '-'))) => Lexeme::LineComment,
            (Lexeme::Code, c) if c == STATEMENT_SEPARATOR => {
                statements.push(&batch[start..index]);
                start = index + c.len_utf8();
                Lexeme::Code
            }
            (Lexeme::SingleQuoted, '\'') | (Lexeme::DoubleQuoted, '"') => Lexeme::Code,
            (Lexeme::LineComment, '\n') => Lexeme::Code,
            (current, _) => current,
        };
    }
    statements.push(&batch[start..]);

    statements
        .into_iter()
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .collect()
}

/// Rewrite `@Name` placeholders to `$n`, reusing the same index for repeated names.
///
/// Fails with a validation error when the text references a parameter that is
/// not in `params`.
pub fn to_positional(sql: &str, params: &Parameters) -> SqlKitResult<PositionalStatement> {
    let mut output = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut values = Vec::new();
    let mut state = Lexeme::Code;
    let mut previous: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            Lexeme::Code => {
                let starts_param = ch == '@'
                    && !previous.is_some_and(is_identifier_char)
                    && chars.peek().is_some_and(|c| c.is_ascii_alphabetic() || *c == '_');
                if starts_param {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if !is_identifier_char(next) {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    let position = match names.iter().position(|n| *n == name) {
                        Some(position) => position,
                        None => {
                            let value = params.get(&name).ok_or_else(|| {
                                SqlKitError::validation(format!(
                                    "Query references parameter @{name} which was not supplied"
                                ))
                            })?;
                            values.push(value.clone());
                            names.push(name);
                            names.len() - 1
                        }
                    };
                    output.push_str(&format!("${}", position + 1));
                    previous = Some('0');
                    continue;
                }
                state = match ch {
                    '\'' => Lexeme::SingleQuoted,
                    '"' => Lexeme::DoubleQuoted,
                    '-' if chars.peek() == Some(&'-') => Lexeme::LineComment,
                    _ => Lexeme::Code,
                };
            }
            Lexeme::SingleQuoted if ch == '\'' => state = Lexeme::Code,
            Lexeme::DoubleQuoted if ch == '"' => state = Lexeme::Code,
            Lexeme::LineComment if ch == '\n' => state = Lexeme::Code,
            _ => {}
        }
        output.push(ch);
        previous = Some(ch);
    }

    Ok(PositionalStatement {
        sql: output,
        values,
    })
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
