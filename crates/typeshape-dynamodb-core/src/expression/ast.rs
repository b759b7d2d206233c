//! Rendered expression trees.
//!
//! These nodes hold alias tokens (`#aN`, `:vN`) rather than operands: they
//! are produced by lowering a builder tree against an interner, and their
//! `Display` implementations emit the exact wire-format text.

use std::fmt;

/// Condition AST node with every operand already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Comparison expression: `left op right`.
    Compare {
        /// Left-hand operand text.
        left: String,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand operand text.
        right: String,
    },
    /// Between expression: `value BETWEEN low AND high`.
    Between {
        /// Value to test.
        value: String,
        /// Lower bound (inclusive).
        low: String,
        /// Upper bound (inclusive).
        high: String,
    },
    /// In expression: `value IN (list...)`.
    In {
        /// Value to search for.
        value: String,
        /// Candidate values.
        list: Vec<String>,
    },
    /// Function call: `function_name(args...)`.
    Function {
        /// Function name.
        name: FunctionName,
        /// Rendered arguments.
        args: Vec<String>,
    },
    /// N-ary logical combination.
    Logical {
        /// Logical operator joining the children.
        op: LogicalOp,
        /// Children in source order.
        children: Vec<Expr>,
    },
    /// Logical negation, always rendered as `NOT (...)`.
    Not(Box<Expr>),
}

impl Expr {
    /// The logical operator of a composite node.
    #[must_use]
    pub fn logical_op(&self) -> Option<LogicalOp> {
        match self {
            Self::Logical { op, .. } => Some(*op),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { left, op, right } => write!(f, "{left} {op} {right}"),
            Self::Between { value, low, high } => write!(f, "{value} BETWEEN {low} AND {high}"),
            Self::In { value, list } => write!(f, "{value} IN ({})", list.join(", ")),
            Self::Function { name, args } => write!(f, "{name}({})", args.join(", ")),
            Self::Logical { op, children } => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {op} ")?;
                    }
                    // Same-kind children splice in; other composites need grouping.
                    match child.logical_op() {
                        Some(child_op) if child_op != *op => write!(f, "({child})")?,
                        _ => write!(f, "{child}")?,
                    }
                }
                Ok(())
            }
            Self::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (`=`).
    Eq,
    /// Not equal (`<>`).
    Ne,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "<>"),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
}

impl LogicalOp {
    /// Keyword as emitted.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in DynamoDB condition function names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionName {
    /// `attribute_exists(path)` - true if the attribute exists.
    AttributeExists,
    /// `attribute_not_exists(path)` - true if the attribute does not exist.
    AttributeNotExists,
    /// `attribute_type(path, type)` - true if the attribute is of the given type.
    AttributeType,
    /// `begins_with(path, substr)` - true if the string begins with the prefix.
    BeginsWith,
    /// `contains(path, operand)` - true if string contains substring or set contains element.
    Contains,
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeExists => write!(f, "attribute_exists"),
            Self::AttributeNotExists => write!(f, "attribute_not_exists"),
            Self::AttributeType => write!(f, "attribute_type"),
            Self::BeginsWith => write!(f, "begins_with"),
            Self::Contains => write!(f, "contains"),
        }
    }
}

/// Arithmetic operators allowed in `SET` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// Addition (`+`).
    Plus,
    /// Subtraction (`-`).
    Minus,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
        }
    }
}

/// A single rendered SET action: `path = value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetAction {
    /// Target path alias.
    pub path: String,
    /// Rendered value.
    pub value: String,
}

impl fmt::Display for SetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.path, self.value)
    }
}

/// Rendered update expression: SET actions, then REMOVE paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateExpr {
    /// SET actions in emission order.
    pub set_actions: Vec<SetAction>,
    /// REMOVE path aliases in emission order.
    pub remove_paths: Vec<String>,
}

impl UpdateExpr {
    /// Returns `true` if neither clause has any action.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set_actions.is_empty() && self.remove_paths.is_empty()
    }
}

impl fmt::Display for UpdateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote_clause = false;
        if !self.set_actions.is_empty() {
            f.write_str("SET ")?;
            for (i, action) in self.set_actions.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{action}")?;
            }
            wrote_clause = true;
        }
        if !self.remove_paths.is_empty() {
            if wrote_clause {
                f.write_str(" ")?;
            }
            write!(f, "REMOVE {}", self.remove_paths.join(", "))?;
        }
        Ok(())
    }
}
