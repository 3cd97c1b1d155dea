//! # Conditional SQL Templates
//!
//! A tiny template language for switching fragments of a SQL string on and off at
//! call time, so one statement can serve several filter combinations.
//!
//! ## Syntax
//!
//! - `{fragment}`: kept (markers stripped) when its flag is `true`, removed when `false`
//! - `{when_true:when_false}`: keeps one branch or the other
//!
//! Blocks do not nest. Flags are paired with blocks strictly left to right.
//!
//! ```rust
//! use sqlkit::template::SqlTemplateExt;
//!
//! let name: Option<&str> = Some("ada");
//! let sql = "SELECT * FROM users WHERE 1 = 1{ AND name = @Name} ORDER BY {name:id}"
//!     .splice(&[name.is_some(), false]);
//! assert_eq!(sql, "SELECT * FROM users WHERE 1 = 1 AND name = @Name ORDER BY id");
//! ```
//!
//! ## Malformed templates
//!
//! An unmatched `{` (or a `{` without a later `}`) stops splicing. The string is
//! returned as rewritten up to that point, and no error is raised.

use crate::constants::template::{BLOCK_END, BLOCK_START, ELSE_SEPARATOR};
use tracing::trace;

/// Resolve the conditional blocks of `template` using `flags` in order.
///
/// Blocks past the last flag are left untouched.
pub fn splice(template: &str, flags: &[bool]) -> String {
    let mut sql = template.to_string();
    let mut cursor = 0;

    for (index, &flag) in flags.iter().enumerate() {
        let Some(start) = sql[cursor..].find(BLOCK_START).map(|i| i + cursor) else {
            trace!(block = index, "No further block start marker, splicing stopped");
            return sql;
        };
        let Some(end) = sql[start..].find(BLOCK_END).map(|i| i + start) else {
            trace!(block = index, start, "Unterminated block, splicing stopped");
            return sql;
        };

        let separator = sql[start..end].find(ELSE_SEPARATOR).map(|i| i + start);
        let kept = match (separator, flag) {
            (None, true) => &sql[start + 1..end],
            (None, false) => "",
            (Some(sep), true) => &sql[start + 1..sep],
            (Some(sep), false) => &sql[sep + 1..end],
        }
        .to_string();

        // Markers are ASCII, so `end + 1` is a char boundary.
        sql.replace_range(start..end + 1, &kept);
        cursor = start + kept.len();
    }

    sql
}

/// Like [`splice`], but each flag is produced by evaluating a callback first.
///
/// Every callback is evaluated, in order, before any rewriting happens.
pub fn splice_with(template: &str, conditions: &[&dyn Fn() -> bool]) -> String {
    let flags: Vec<bool> = conditions.iter().map(|condition| condition()).collect();
    splice(template, &flags)
}

/// Returns `fragment` when `condition` holds, otherwise an empty string.
pub fn when(fragment: &str, condition: bool) -> &str {
    if condition {
        fragment
    } else {
        ""
    }
}

/// Returns `fragment` when `condition` does not hold, otherwise an empty string.
pub fn unless(fragment: &str, condition: bool) -> &str {
    when(fragment, !condition)
}

/// Method-call sugar for the template helpers.
pub trait SqlTemplateExt {
    fn splice(&self, flags: &[bool]) -> String;

    fn splice_with(&self, conditions: &[&dyn Fn() -> bool]) -> String;

    fn when(&self, condition: bool) -> &str;

    fn when_with(&self, condition: impl FnOnce() -> bool) -> &str {
        self.when(condition())
    }

    fn unless(&self, condition: bool) -> &str;

    fn unless_with(&self, condition: impl FnOnce() -> bool) -> &str {
        self.unless(condition())
    }
}

impl SqlTemplateExt for str {
    fn splice(&self, flags: &[bool]) -> String {
        splice(self, flags)
    }

    fn splice_with(&self, conditions: &[&dyn Fn() -> bool]) -> String {
        splice_with(self, conditions)
    }

    fn when(&self, condition: bool) -> &str {
        when(self, condition)
    }

    fn unless(&self, condition: bool) -> &str {
        unless(self, condition)
    }
}
