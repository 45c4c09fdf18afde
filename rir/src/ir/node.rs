use crate::ir::Annotations;
use crate::ir::Visitor;
use anyhow::Result;
use std::fmt;
use std::fmt::Display;

/// The kind of a node; set at construction and never changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    ExprNil,
    ExprOp,
    ExprLit,
    ExprIdent,
    ExprChain,
    ExprCall,
    ExprArgs,
    ExprKeyword,
    StmtBasic,
    StmtBlock,
    StmtRaw,
    StmtLoop,
    StmtCond,
    StmtSwitch,
    Block,
}

impl NodeKind {
    pub fn type_str(&self) -> &'static str {
        match self {
            NodeKind::ExprNil => "EXPR_NIL",
            NodeKind::ExprOp => "EXPR_OP",
            NodeKind::ExprLit => "EXPR_LIT",
            NodeKind::ExprIdent => "EXPR_IDENT",
            NodeKind::ExprChain => "EXPR_CHAIN",
            NodeKind::ExprCall => "EXPR_CALL",
            NodeKind::ExprArgs => "EXPR_ARGS",
            NodeKind::ExprKeyword => "EXPR_KEYWORD",
            NodeKind::StmtBasic => "STMT_BASIC",
            NodeKind::StmtBlock => "STMT_BLOCK",
            NodeKind::StmtRaw => "STMT_RAW",
            NodeKind::StmtLoop => "STMT_LOOP",
            NodeKind::StmtCond => "STMT_COND",
            NodeKind::StmtSwitch => "STMT_SWITCH",
            NodeKind::Block => "BLOCK",
        }
    }
    pub fn is_expr(&self) -> bool {
        matches!(
            self,
            NodeKind::ExprNil
                | NodeKind::ExprOp
                | NodeKind::ExprLit
                | NodeKind::ExprIdent
                | NodeKind::ExprChain
                | NodeKind::ExprCall
                | NodeKind::ExprArgs
                | NodeKind::ExprKeyword
        )
    }
    pub fn is_stmt(&self) -> bool {
        matches!(
            self,
            NodeKind::StmtBasic
                | NodeKind::StmtBlock
                | NodeKind::StmtRaw
                | NodeKind::StmtLoop
                | NodeKind::StmtCond
                | NodeKind::StmtSwitch
        )
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_str())
    }
}

/// Shared interface of expressions, statements and blocks.
///
/// Cloning a node deep-copies its subtree, so a node is never owned by two
/// trees at the same time.
pub trait Node: Display {
    fn kind(&self) -> NodeKind;
    fn annotations(&self) -> &Annotations;
    fn annotations_mut(&mut self) -> &mut Annotations;
    /// Direct children in print order.
    fn children(&self) -> Vec<&dyn Node>;
    /// Drive the visitor over the children of this node.
    ///
    /// The hooks for the node itself are called by whoever owns the node
    /// (see [crate::ir::visit_list]).
    fn accept(&mut self, visitor: &mut dyn Visitor) -> Result<()>;
    /// Write this node as source-like text.
    ///
    /// When a visitor is given, the children are not printed but handed to
    /// the visitor instead.
    fn print(&mut self, out: &mut dyn fmt::Write, visitor: Option<&mut dyn Visitor>)
        -> Result<()>;
    fn type_str(&self) -> &'static str {
        self.kind().type_str()
    }
    fn debug_str(&self) -> String {
        self.type_str().to_string()
    }
    /// Number of nodes of the given kind in this subtree, including `self`.
    fn subnode_count(&self, kind: NodeKind) -> usize {
        let own = if self.kind() == kind { 1 } else { 0 };
        let nested: usize = self
            .children()
            .iter()
            .map(|child| child.subnode_count(kind))
            .sum();
        own + nested
    }
    /// Number of operator leaves, which approximates the cost of the code.
    fn ops_number(&self) -> usize {
        self.subnode_count(NodeKind::ExprOp)
    }
    fn is_expr(&self) -> bool {
        self.kind().is_expr()
    }
    fn is_stmt(&self) -> bool {
        self.kind().is_stmt()
    }
    fn is_block(&self) -> bool {
        self.kind() == NodeKind::Block
    }
    fn add_annotation(&mut self, name: &str) {
        self.annotations_mut().add(name, None);
    }
    fn add_annotation_with_value(&mut self, name: &str, value: &str) {
        self.annotations_mut().add(name, Some(value));
    }
    fn has_annotation(&self, name: &str) -> bool {
        self.annotations().has(name)
    }
    fn get_annotation(&self, name: &str) -> Option<&str> {
        self.annotations().get(name)
    }
    fn remove_annotation(&mut self, name: &str) {
        self.annotations_mut().remove(name);
    }
}

/// Print a child, or hand it to the visitor when there is one.
pub(crate) fn print_hook(
    node: &mut dyn Node,
    out: &mut dyn fmt::Write,
    visitor: &mut Option<&mut dyn Visitor>,
) -> Result<()> {
    match visitor {
        Some(visitor) => node.accept(&mut **visitor),
        None => node.print(out, None),
    }
}

/// Print a list of children separated by `delim`.
pub(crate) fn print_hook_list<T: Node>(
    nodes: &mut [T],
    out: &mut dyn fmt::Write,
    visitor: &mut Option<&mut dyn Visitor>,
    delim: &str,
) -> Result<()> {
    for (i, node) in nodes.iter_mut().enumerate() {
        if i > 0 {
            write!(out, "{delim}")?;
        }
        print_hook(node, out, visitor)?;
    }
    Ok(())
}

/// Implement [Display] for a node type via [Node::print].
macro_rules! display_via_print {
    ($ty:ty) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut node = self.clone();
                let mut out = String::new();
                crate::ir::Node::print(&mut node, &mut out, None).map_err(|_| std::fmt::Error)?;
                write!(f, "{out}")
            }
        }
    };
}

pub(crate) use display_via_print;
