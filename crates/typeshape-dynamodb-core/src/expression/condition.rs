//! Condition builder trees and their lowering.
//!
//! A builder returns a [`Condition`]: a single predicate or an AND/OR/NOT
//! composition. Lowering walks the tree left to right, allocating aliases
//! as operands are met, and produces a [`CompiledCondition`] whose text has
//! same-kind composites spliced and other-kind composites parenthesized.

use std::ops::Not;

use tracing::debug;
use typeshape_dynamodb_model::FieldType;

use super::ast::{CompareOp, Expr, FunctionName, LogicalOp};
use super::interner::AttributeInterner;
use super::operand::{Operand, Path, Position};
use crate::error::{CompileError, CompileResult};

/// Left side of a comparison together with what it contributes to lowering.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub(crate) left: Operand,
    pub(crate) subject: String,
    pub(crate) context: FieldType,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PredicateForm {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    Between {
        value: Operand,
        low: Operand,
        high: Operand,
    },
    In {
        value: Operand,
        list: Vec<Operand>,
    },
    Function {
        name: FunctionName,
        args: Vec<Operand>,
    },
}

/// A single comparison, range, membership or function test.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Raw attribute the predicate constrains.
    subject: String,
    /// Type inputs on the right-hand side bind to.
    context: FieldType,
    form: PredicateForm,
}

/// Boolean predicate tree as returned by a builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Leaf test.
    Predicate(Predicate),
    /// All children must hold.
    And(Vec<Condition>),
    /// Any child must hold.
    Or(Vec<Condition>),
    /// Negation.
    Not(Box<Condition>),
}

impl Condition {
    pub(crate) fn predicate(subject: String, context: FieldType, form: PredicateForm) -> Self {
        Self::Predicate(Predicate {
            subject,
            context,
            form,
        })
    }

    pub(crate) fn compare(target: Target, op: CompareOp, right: Operand) -> Self {
        Self::predicate(
            target.subject,
            target.context,
            PredicateForm::Compare {
                left: target.left,
                op,
                right,
            },
        )
    }

    pub(crate) fn between(target: Target, low: Operand, high: Operand) -> Self {
        Self::predicate(
            target.subject,
            target.context,
            PredicateForm::Between {
                value: target.left,
                low,
                high,
            },
        )
    }

    pub(crate) fn within(target: Target, list: Vec<Operand>) -> Self {
        Self::predicate(
            target.subject,
            target.context,
            PredicateForm::In {
                value: target.left,
                list,
            },
        )
    }

    /// AND over `children`. A single child stands for itself.
    pub fn and(children: impl IntoIterator<Item = Condition>) -> Self {
        Self::And(children.into_iter().collect())
    }

    /// OR over `children`. A single child stands for itself.
    pub fn or(children: impl IntoIterator<Item = Condition>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    /// Lower the tree against `interner`.
    pub fn compile(self, interner: &mut AttributeInterner) -> CompileResult<CompiledCondition> {
        match self {
            Self::Predicate(predicate) => predicate.compile(interner),
            Self::And(children) => compile_composite(LogicalOp::And, children, interner),
            Self::Or(children) => compile_composite(LogicalOp::Or, children, interner),
            Self::Not(inner) => {
                let inner = inner.compile(interner)?;
                Ok(CompiledCondition {
                    expr: Expr::Not(Box::new(inner.expr)),
                    comparands: inner.comparands,
                })
            }
        }
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

impl Predicate {
    fn compile(self, interner: &mut AttributeInterner) -> CompileResult<CompiledCondition> {
        let Self {
            subject,
            context,
            form,
        } = self;

        let expr = match form {
            PredicateForm::Compare { left, op, right } => {
                let operation = compare_op_name(op);
                let left = left.resolve(interner, &context, Position::Condition, operation)?;
                let right = right.resolve(interner, &context, Position::Condition, operation)?;
                Expr::Compare { left, op, right }
            }
            PredicateForm::Between { value, low, high } => Expr::Between {
                value: value.resolve(interner, &context, Position::Condition, "BETWEEN")?,
                low: low.resolve(interner, &context, Position::Condition, "BETWEEN")?,
                high: high.resolve(interner, &context, Position::Condition, "BETWEEN")?,
            },
            PredicateForm::In { value, list } => {
                let value = value.resolve(interner, &context, Position::Condition, "IN")?;
                if list.is_empty() {
                    return Err(CompileError::MissingOperand { operation: "IN" });
                }
                let list = list
                    .into_iter()
                    .map(|candidate| {
                        candidate.resolve(interner, &context, Position::Condition, "IN")
                    })
                    .collect::<CompileResult<Vec<_>>>()?;
                Expr::In { value, list }
            }
            PredicateForm::Function { name, args } => {
                let operation = function_name(name);
                let args = args
                    .into_iter()
                    .map(|arg| arg.resolve(interner, &context, Position::Condition, operation))
                    .collect::<CompileResult<Vec<_>>>()?;
                Expr::Function { name, args }
            }
        };

        Ok(CompiledCondition {
            expr,
            comparands: vec![subject],
        })
    }
}

fn compile_composite(
    op: LogicalOp,
    children: Vec<Condition>,
    interner: &mut AttributeInterner,
) -> CompileResult<CompiledCondition> {
    if children.len() <= 1 {
        return children
            .into_iter()
            .next()
            .ok_or(CompileError::InvalidComposite { kind: op.as_str() })?
            .compile(interner);
    }

    let compiled = children
        .into_iter()
        .map(|child| child.compile(interner))
        .collect::<CompileResult<Vec<_>>>()?;
    Ok(CompiledCondition::join(op, compiled))
}

fn compare_op_name(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "<>",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

fn function_name(name: FunctionName) -> &'static str {
    match name {
        FunctionName::AttributeExists => "attribute_exists",
        FunctionName::AttributeNotExists => "attribute_not_exists",
        FunctionName::AttributeType => "attribute_type",
        FunctionName::BeginsWith => "begins_with",
        FunctionName::Contains => "contains",
    }
}

/// A lowered condition: rendered tree plus the raw attributes it constrains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCondition {
    /// Rendered tree.
    pub expr: Expr,
    /// Raw attribute keys of every predicate, in order, repeats kept.
    pub comparands: Vec<String>,
}

impl CompiledCondition {
    /// Join already lowered conditions under `op`.
    #[must_use]
    pub fn join(op: LogicalOp, children: Vec<CompiledCondition>) -> Self {
        let mut exprs = Vec::with_capacity(children.len());
        let mut comparands = Vec::new();
        for child in children {
            comparands.extend(child.comparands);
            exprs.push(child.expr);
        }
        Self {
            expr: Expr::Logical {
                op,
                children: exprs,
            },
            comparands,
        }
    }

    /// Whether any predicate constrains `raw_key`.
    #[must_use]
    pub fn constrains(&self, raw_key: &str) -> bool {
        self.comparands.iter().any(|key| key == raw_key)
    }

    /// Expression text.
    #[must_use]
    pub fn text(&self) -> String {
        self.expr.to_string()
    }
}

/// Lower a key condition, making sure it constrains the partition key.
///
/// The user condition (if any) is lowered first. When it does not mention
/// `partition_key`, `partition_key = key_value` is prepended under AND;
/// otherwise the user condition is returned unchanged.
pub fn compile_key_condition(
    interner: &mut AttributeInterner,
    user: Option<Condition>,
    partition_key: &Path,
    key_value: impl Into<Operand>,
) -> CompileResult<CompiledCondition> {
    let user = user.map(|condition| condition.compile(interner)).transpose()?;

    match user {
        Some(condition) if condition.constrains(partition_key.key()) => Ok(condition),
        user => {
            debug!(
                partition_key = partition_key.key(),
                "synthesizing partition key equality"
            );
            let key_eq = partition_key.eq(key_value).compile(interner)?;
            Ok(match user {
                Some(condition) => CompiledCondition::join(LogicalOp::And, vec![key_eq, condition]),
                None => key_eq,
            })
        }
    }
}
