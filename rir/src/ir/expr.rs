use crate::frontend::Location;
use crate::frontend::Parser;
use crate::ir::node::display_via_print;
use crate::ir::node::print_hook;
use crate::ir::node::print_hook_list;
use crate::ir::visit_list;
use crate::ir::Annotations;
use crate::ir::Node;
use crate::ir::NodeKind;
use crate::ir::Visitor;
use anyhow::Result;
use std::fmt;

const COMPARISON_OPS: [&str; 6] = ["==", "!=", ">=", "<=", "<", ">"];
const BOOL_OPS: [&str; 6] = ["&&", "&", "||", "|", "!", "^"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprKind {
    /// Placeholder, for example an empty loop clause.
    Nil,
    /// Operator or punctuation leaf.
    Op,
    Lit,
    Ident,
    /// Token chain such as `i = i + 1`.
    Chain,
    /// Function call; the last part holds the arguments.
    Call,
    /// Comma separated arguments.
    Args,
    Keyword,
}

impl ExprKind {
    fn node_kind(&self) -> NodeKind {
        match self {
            ExprKind::Nil => NodeKind::ExprNil,
            ExprKind::Op => NodeKind::ExprOp,
            ExprKind::Lit => NodeKind::ExprLit,
            ExprKind::Ident => NodeKind::ExprIdent,
            ExprKind::Chain => NodeKind::ExprChain,
            ExprKind::Call => NodeKind::ExprCall,
            ExprKind::Args => NodeKind::ExprArgs,
            ExprKind::Keyword => NodeKind::ExprKeyword,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    kind: ExprKind,
    str: String,
    parts: Vec<Expr>,
    annotations: Annotations,
}

impl Default for Expr {
    fn default() -> Self {
        Expr::nil()
    }
}

impl Expr {
    pub fn new(kind: ExprKind, str: &str) -> Self {
        Expr {
            kind,
            str: str.to_string(),
            parts: vec![],
            annotations: Annotations::default(),
        }
    }
    pub fn with_parts(kind: ExprKind, parts: Vec<Expr>) -> Self {
        Expr {
            kind,
            str: "".to_string(),
            parts,
            annotations: Annotations::default(),
        }
    }
    pub fn nil() -> Self {
        Expr::new(ExprKind::Nil, "")
    }
    pub fn op(str: &str) -> Self {
        Expr::new(ExprKind::Op, str)
    }
    pub fn lit(str: &str) -> Self {
        Expr::new(ExprKind::Lit, str)
    }
    pub fn ident(str: &str) -> Self {
        Expr::new(ExprKind::Ident, str)
    }
    pub fn keyword(str: &str) -> Self {
        Expr::new(ExprKind::Keyword, str)
    }
    pub fn chain(parts: Vec<Expr>) -> Self {
        Expr::with_parts(ExprKind::Chain, parts)
    }
    pub fn call(callee: Expr, args: Expr) -> Self {
        Expr::with_parts(ExprKind::Call, vec![callee, args])
    }
    pub fn args(parts: Vec<Expr>) -> Self {
        Expr::with_parts(ExprKind::Args, parts)
    }
    /// Parse a single expression from fragment text, such as `i += 2`.
    pub fn parse(text: &str, pos: &Location) -> Result<Expr> {
        Parser::parse_expr(text, pos)
    }
    pub fn expr_kind(&self) -> ExprKind {
        self.kind
    }
    pub fn str(&self) -> &str {
        &self.str
    }
    pub fn parts(&self) -> &Vec<Expr> {
        &self.parts
    }
    pub fn parts_mut(&mut self) -> &mut Vec<Expr> {
        &mut self.parts
    }
    pub fn parts_number(&self) -> usize {
        self.parts.len()
    }
    pub fn part(&self, n: usize) -> &Expr {
        assert!(
            n < self.parts.len(),
            "part {n} out of range for {} parts in `{self}`",
            self.parts.len()
        );
        &self.parts[n]
    }
    pub fn part_mut(&mut self, n: usize) -> &mut Expr {
        let len = self.parts.len();
        assert!(n < len, "part {n} out of range for {len} parts");
        &mut self.parts[n]
    }
    pub fn add_sub_expr(&mut self, expr: Expr) {
        self.parts.push(expr);
    }
    pub fn prepend_sub_expr(&mut self, expr: Expr) {
        self.parts.insert(0, expr);
    }
    pub fn is_nil(&self) -> bool {
        self.kind == ExprKind::Nil
    }
    pub fn is_leaf(&self) -> bool {
        self.parts.is_empty()
    }
    /// Whether this is a leaf with exactly the given text.
    pub fn is_leaf_str(&self, val: &str) -> bool {
        self.is_leaf() && self.str == val
    }
    /// Whether the given leaf occurs anywhere in this subtree.
    pub fn contains_leaf(&self, val: &str) -> bool {
        self.is_leaf_str(val) || self.parts.iter().any(|part| part.contains_leaf(val))
    }
    /// Whether one of the direct parts is the given leaf.
    pub fn has_top_level_leaf(&self, val: &str) -> bool {
        self.parts.iter().any(|part| part.is_leaf_str(val))
    }
    pub fn is_assignment(&self) -> bool {
        self.contains_leaf("=")
    }
    /// The first comparison operator in the expression, if any.
    ///
    /// Only a single comparison is supported; in `(a == b) && (c < d)` this
    /// returns `==`.
    pub fn comparison_op(&self) -> Option<&'static str> {
        COMPARISON_OPS
            .iter()
            .find(|op| self.contains_leaf(op))
            .copied()
    }
    pub fn is_comparison(&self) -> bool {
        self.comparison_op().is_some()
    }
    pub fn contains_bool_op(&self) -> bool {
        BOOL_OPS.iter().any(|op| self.contains_leaf(op))
    }
    pub fn contains_ternary_op(&self) -> bool {
        self.contains_leaf("?")
    }
    fn assert_splittable(&self, split: &str) {
        assert!(
            self.is_assignment() || self.is_comparison() || self.contains_leaf(","),
            "`{self}` is neither an assignment, a comparison nor a comma chain"
        );
        assert!(
            self.has_top_level_leaf(split),
            "`{split}` is not a top-level part of `{self}`"
        );
    }
    /// Parts before the first top-level `split` leaf.
    pub fn get_lhs(&self, split: &str) -> Expr {
        self.assert_splittable(split);
        let parts = self
            .parts
            .iter()
            .take_while(|part| !part.is_leaf_str(split))
            .cloned()
            .collect();
        Expr::chain(parts)
    }
    /// Parts after the first top-level `split` leaf.
    pub fn get_rhs(&self, split: &str) -> Expr {
        self.assert_splittable(split);
        let parts = self
            .parts
            .iter()
            .skip_while(|part| !part.is_leaf_str(split))
            .skip(1)
            .cloned()
            .collect();
        Expr::chain(parts)
    }
}

impl Node for Expr {
    fn kind(&self) -> NodeKind {
        self.kind.node_kind()
    }
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
    fn children(&self) -> Vec<&dyn Node> {
        self.parts.iter().map(|part| part as &dyn Node).collect()
    }
    fn accept(&mut self, visitor: &mut dyn Visitor) -> Result<()> {
        visit_list(visitor, &mut self.parts)
    }
    fn print(
        &mut self,
        out: &mut dyn fmt::Write,
        visitor: Option<&mut dyn Visitor>,
    ) -> Result<()> {
        let mut visitor = visitor;
        match self.kind {
            ExprKind::Args => print_hook_list(&mut self.parts, out, &mut visitor, ", "),
            ExprKind::Call => {
                assert!(
                    self.parts.len() >= 2,
                    "call expression needs a callee and arguments"
                );
                let last = self.parts.len() - 1;
                for part in self.parts[..last].iter_mut() {
                    print_hook(part, out, &mut visitor)?;
                }
                write!(out, "(")?;
                print_hook(&mut self.parts[last], out, &mut visitor)?;
                write!(out, ")")?;
                Ok(())
            }
            _ => {
                write!(out, "{}", self.str)?;
                print_hook_list(&mut self.parts, out, &mut visitor, " ")
            }
        }
    }
    fn debug_str(&self) -> String {
        if self.str.is_empty() {
            self.type_str().to_string()
        } else {
            format!("{} {}", self.type_str(), self.str)
        }
    }
}

display_via_print!(Expr);
