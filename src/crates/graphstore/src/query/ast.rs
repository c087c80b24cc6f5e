//! Query AST

use crate::model::PropertyValue;

/// A full query: one or more selects joined by UNION
#[derive(Debug, Clone)]
pub struct Query {
    pub selects: Vec<Select>,
}

/// One MATCH ... WHERE ... RETURN block
#[derive(Debug, Clone)]
pub struct Select {
    pub patterns: Vec<Pattern>,
    pub filter: Option<Expr>,
    pub distinct: bool,
    pub items: Vec<ReturnItem>,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<usize>,
}

/// A linear path pattern: nodes joined by hops
///
/// `nodes.len() == hops.len() + 1`.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub nodes: Vec<NodePattern>,
    pub hops: Vec<Hop>,
}

/// One parenthesized node
#[derive(Debug, Clone)]
pub struct NodePattern {
    pub var: Option<String>,
    pub label: Option<String>,
}

/// Hop direction relative to the written order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `(a)-[:REL]->(b)`: edge from a to b
    Out,
    /// `(a)<-[:REL]-(b)`: edge from b to a
    In,
}

/// One relationship hop
#[derive(Debug, Clone)]
pub struct Hop {
    pub rel: String,
    pub direction: Direction,
}

/// A value source inside WHERE or RETURN
#[derive(Debug, Clone)]
pub enum Operand {
    /// `var.prop`
    Property { var: String, prop: String },
    /// A literal value
    Literal(PropertyValue),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// WHERE expression tree. AND binds tighter than OR.
#[derive(Debug, Clone)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Cmp {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    /// Substring match; on list values, matches any element
    Contains { left: Operand, right: Operand },
    /// Prefix match
    StartsWith { left: Operand, right: Operand },
    /// Membership in a literal list
    In {
        left: Operand,
        list: Vec<PropertyValue>,
    },
    /// IS NULL / IS NOT NULL
    IsNull { operand: Operand, negated: bool },
}

/// One projected column
#[derive(Debug, Clone)]
pub struct ReturnItem {
    pub operand: Operand,
    pub alias: Option<String>,
}

impl ReturnItem {
    /// Output column name: the alias, or `var.prop`
    pub fn column_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.operand {
            Operand::Property { var, prop } => format!("{}.{}", var, prop),
            Operand::Literal(value) => format!("{:?}", value),
        }
    }
}

/// One ORDER BY key, referencing an output column
#[derive(Debug, Clone)]
pub struct OrderKey {
    pub column: String,
    pub descending: bool,
}
