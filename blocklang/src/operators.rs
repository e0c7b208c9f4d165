//! Reserved operator functions.
//!
//! Binary and unary operators never appear in the AST as their own node kind;
//! the parser lowers `a + b` to `%add(a, b)`, `-a` to `%neg(a)`, and so on.
//! The `%` prefix cannot start a user identifier, so these names never collide.

pub const ADD: &str = "%add";
pub const SUB: &str = "%sub";
pub const MUL: &str = "%mul";
pub const DIV: &str = "%div";
pub const MOD: &str = "%mod";
pub const EQ: &str = "%eq";
pub const NE: &str = "%ne";
pub const GT: &str = "%gt";
pub const LT: &str = "%lt";
pub const GE: &str = "%ge";
pub const LE: &str = "%le";
pub const AND: &str = "%and";
pub const OR: &str = "%or";
pub const NEG: &str = "%neg";
pub const NOT: &str = "%not";

pub fn is_operator(name: &str) -> bool {
    name.starts_with('%')
}
