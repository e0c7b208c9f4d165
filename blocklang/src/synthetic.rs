//! Synthetic temporaries.
//!
//! A top-level statement that is a bare expression (`x + 1;`, `5;`, `{1, 2};`)
//! is rewritten to `<temp> = <expr>;` before parsing, where `<temp>` is a fresh
//! name made of [`SYNTHETIC_PREFIX`] and 32 hex digits. The inserted text moves
//! every column on the statement's first line right by [`SYNTHETIC_PREFIX_WIDTH`].

use uuid::Uuid;

pub const SYNTHETIC_PREFIX: &str = "temp";

/// Names at or below this length are never synthetic, whatever their prefix.
pub const SYNTHETIC_MIN_LEN: usize = 35;

/// Width of the `"<temp> = "` text inserted ahead of a bare expression.
pub const SYNTHETIC_PREFIX_WIDTH: usize = SYNTHETIC_PREFIX.len() + 32 + " = ".len();

/// Generate a new synthetic temporary name.
pub fn fresh_temporary() -> String {
    format!("{}{}", SYNTHETIC_PREFIX, Uuid::new_v4().simple())
}

pub fn is_synthetic_temporary(name: &str) -> bool {
    name.starts_with(SYNTHETIC_PREFIX) && name.len() > SYNTHETIC_MIN_LEN
}
