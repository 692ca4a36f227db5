//! Expression syntax tree.

use serde::{Deserialize, Serialize};

use dbc_core::Value;

/// Name bound to the method's return value in postconditions.
pub const RESULT: &str = "result";
/// Name bound to the pre-call snapshot in postconditions.
pub const PRIOR_STATE: &str = "priorState";
/// Name bound to the structure instance.
pub const THIS: &str = "this";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

/// A parsed constraint expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Value),
    Identifier(String),
    /// `target.member`
    Member { target: Box<Expr>, member: String },
    /// `name(args)` or `receiver.name(args)`. A call without a receiver is a
    /// builtin or a predicate on `this`.
    Call {
        receiver: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    /// `target[index]`
    Index { target: Box<Expr>, index: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// How an expression reads `priorState`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorStateUsage {
    /// `priorState` appears at all.
    pub referenced: bool,
    /// Members read as `priorState.name`, first-use order, deduplicated.
    pub members: Vec<String>,
    /// Predicates called as `priorState.name(...)`.
    pub predicates: Vec<String>,
}

impl PriorStateUsage {
    pub fn merge(&mut self, other: &PriorStateUsage) {
        self.referenced |= other.referenced;
        for m in &other.members {
            push_unique(&mut self.members, m);
        }
        for p in &other.predicates {
            push_unique(&mut self.predicates, p);
        }
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

impl Expr {
    /// Visits every node, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) | Expr::Identifier(_) => {}
            Expr::Member { target, .. } => target.walk(visit),
            Expr::Call { receiver, args, .. } => {
                if let Some(r) = receiver {
                    r.walk(visit);
                }
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Index { target, index } => {
                target.walk(visit);
                index.walk(visit);
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
        }
    }

    /// Bare identifiers the expression reads, deduplicated, in first-use
    /// order.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        self.walk(&mut |node| {
            if let Expr::Identifier(name) = node {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        });
        names
    }

    pub fn references(&self, name: &str) -> bool {
        self.identifiers().contains(&name)
    }

    pub fn prior_state_usage(&self) -> PriorStateUsage {
        let mut usage = PriorStateUsage::default();
        self.walk(&mut |node| match node {
            Expr::Identifier(name) if name == PRIOR_STATE => usage.referenced = true,
            Expr::Member { target, member } if is_prior_state(target) => {
                push_unique(&mut usage.members, member);
            }
            Expr::Call {
                receiver: Some(r),
                name,
                ..
            } if is_prior_state(r) => push_unique(&mut usage.predicates, name),
            _ => {}
        });
        usage
    }
}

fn is_prior_state(expr: &Expr) -> bool {
    matches!(expr, Expr::Identifier(name) if name == PRIOR_STATE)
}
