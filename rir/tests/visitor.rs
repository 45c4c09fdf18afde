extern crate rir;

use anyhow::Result;
use indoc::indoc;
use rir::convert::apply_visitor;
use rir::frontend::Location as SourceLocation;
use rir::ir::Block;
use rir::ir::Expr;
use rir::ir::Node;
use rir::ir::NodeKind;
use rir::ir::Splicer;
use rir::ir::Stmt;
use rir::ir::Visitor;
use rir::tester::Tester;
use std::panic::Location;

fn stmt(src: &str) -> Stmt {
    Stmt::parse(src, &SourceLocation::default()).unwrap()
}

/// Deletes every third statement that it sees.
#[derive(Default)]
struct DeleteEveryThird {
    seen: usize,
}

impl Visitor for DeleteEveryThird {
    fn before_stmt(&mut self, stmt: &mut Option<Stmt>, _splicer: &mut Splicer<Stmt>) -> Result<()> {
        self.seen += 1;
        if self.seen % 3 == 0 {
            *stmt = None;
        }
        Ok(())
    }
}

#[test]
fn delete_during_traversal() {
    Tester::init_tracing();
    let src = indoc! {"
    x0 = 0;
    x1 = 1;
    x2 = 2;
    x3 = 3;
    x4 = 4;
    x5 = 5;
    x6 = 6;
    x7 = 7;
    x8 = 8;
    "};
    let (mut block, _) = Tester::parse(src);
    assert_eq!(block.len(), 9);
    let mut visitor = DeleteEveryThird::default();
    apply_visitor(&mut block, &mut visitor).unwrap();
    assert_eq!(visitor.seen, 9);
    assert_eq!(block.len(), 6);
    let expected = indoc! {"
    x0 = 0;
    x1 = 1;
    x3 = 3;
    x4 = 4;
    x6 = 6;
    x7 = 7;
    "};
    Tester::check_lines_exact(&block.to_string(), expected, Location::caller());
}

/// Surrounds statements that mention `y` with new statements.
#[derive(Default)]
struct Surround {
    visited: Vec<String>,
}

impl Visitor for Surround {
    fn before_stmt(&mut self, stmt: &mut Option<Stmt>, splicer: &mut Splicer<Stmt>) -> Result<()> {
        if let Some(current) = stmt {
            self.visited.push(current.to_string());
            if current.contains_leaf("y") {
                splicer.insert_before(Stmt::parse("before = 1;", &Default::default())?);
                splicer.insert_after(Stmt::parse("after = 1;", &Default::default())?);
            }
        }
        Ok(())
    }
}

#[test]
fn insert_during_traversal() {
    let (mut block, _) = Tester::parse("x = 1;\ny = 2;\nz = 3;");
    let mut visitor = Surround::default();
    apply_visitor(&mut block, &mut visitor).unwrap();
    let expected = indoc! {"
    x = 1;
    before = 1;
    y = 2;
    after = 1;
    z = 3;
    "};
    Tester::check_lines_exact(&block.to_string(), expected, Location::caller());
    // Inserted after the current node means visited next; inserted before
    // means not visited at all.
    assert_eq!(visitor.visited, vec!["x = 1;", "y = 2;", "after = 1;", "z = 3;"]);
}

/// Replaces every identifier `a` by `b`.
struct Rename;

impl Visitor for Rename {
    fn after_expr(&mut self, expr: &mut Option<Expr>, _splicer: &mut Splicer<Expr>) -> Result<()> {
        if let Some(current) = expr {
            if current.kind() == NodeKind::ExprIdent && current.str() == "a" {
                *expr = Some(Expr::ident("b"));
            }
        }
        Ok(())
    }
}

#[test]
fn replace_expressions() {
    let (mut block, _) = Tester::parse("x = a + f(a, c[a]);\nfor(a = 0; a < n; a ++) s += a;");
    apply_visitor(&mut block, &mut Rename).unwrap();
    let expected = indoc! {"
    x = b + f(b, c [ b ]);
    for(b = 0; b < n; b ++) s += b;
    "};
    Tester::check_lines_exact(&block.to_string(), expected, Location::caller());
}

/// Deletes basic statements that assign to `x`.
struct DeleteX;

impl Visitor for DeleteX {
    fn after_stmt(&mut self, stmt: &mut Option<Stmt>, _splicer: &mut Splicer<Stmt>) -> Result<()> {
        let is_x = match stmt {
            Some(current) => current.kind() == NodeKind::StmtBasic && current.contains_leaf("x"),
            None => false,
        };
        if is_x {
            *stmt = None;
        }
        Ok(())
    }
}

#[test]
fn delete_single_statement_slot() {
    let mut block = Block::new(vec![stmt("for(i = 0; i < n; i ++) x = i;")]);
    apply_visitor(&mut block, &mut DeleteX).unwrap();
    assert_eq!(block.to_string(), "for(i = 0; i < n; i ++) ;");
    Tester::verify(&block);
}

/// Duplicates the body of each `if`.
struct Duplicate;

impl Visitor for Duplicate {
    fn after_stmt(&mut self, stmt: &mut Option<Stmt>, splicer: &mut Splicer<Stmt>) -> Result<()> {
        if let Some(current) = stmt {
            if current.kind() == NodeKind::StmtBasic && current.contains_leaf("y") {
                splicer.insert_before(current.clone());
            }
        }
        Ok(())
    }
}

#[test]
fn expand_single_statement_slot() {
    let mut block = Block::new(vec![stmt("if(c) y = 1;")]);
    apply_visitor(&mut block, &mut Duplicate).unwrap();
    let expected = indoc! {"
    if(c)
    {
    y = 1;
    y = 1;
    }
    "};
    Tester::check_lines_exact(&block.to_string(), expected, Location::caller());
    Tester::verify(&block);
}

/// Skips the subtrees of loops.
#[derive(Default)]
struct Shallow {
    exprs: usize,
}

impl Visitor for Shallow {
    fn before_expr(&mut self, _expr: &mut Option<Expr>, _splicer: &mut Splicer<Expr>) -> Result<()> {
        self.exprs += 1;
        Ok(())
    }
    fn should_descend(&mut self, node: &dyn Node) -> bool {
        node.kind() != NodeKind::StmtLoop
    }
}

#[test]
fn skip_subtrees() {
    let (mut block, _) = Tester::parse("x = 1;\nfor(i = 0; i < n; i ++) s += i;");
    let mut visitor = Shallow::default();
    apply_visitor(&mut block, &mut visitor).unwrap();
    // `x = 1` and its three leaves.
    assert_eq!(visitor.exprs, 4);
}

/// Fails on the second statement.
#[derive(Default)]
struct FailSecond {
    seen: usize,
    open_lists: i32,
}

impl Visitor for FailSecond {
    fn push_stmt_splicer(&mut self, _splicer: &mut Splicer<Stmt>) {
        self.open_lists += 1;
    }
    fn pop_stmt_splicer(&mut self, _splicer: &mut Splicer<Stmt>) {
        self.open_lists -= 1;
    }
    fn before_stmt(&mut self, stmt: &mut Option<Stmt>, _splicer: &mut Splicer<Stmt>) -> Result<()> {
        self.seen += 1;
        if self.seen == 2 {
            *stmt = None;
            anyhow::bail!("failed");
        }
        Ok(())
    }
}

#[test]
fn errors_stop_traversal() {
    let (mut block, _) = Tester::parse("x = 1;\ny = 2;\nz = 3;");
    let mut visitor = FailSecond::default();
    let result = apply_visitor(&mut block, &mut visitor);
    assert!(result.is_err());
    assert_eq!(visitor.seen, 2);
    // Every list that was entered is left again.
    assert_eq!(visitor.open_lists, 0);
    // The statements that were not visited are still in place.
    assert_eq!(block.to_string(), "x = 1;\nz = 3;");
}

/// Records identifiers and renames `i` to `k`.
#[derive(Default)]
struct RenameInduction {
    names: Vec<String>,
}

impl Visitor for RenameInduction {
    fn after_expr(&mut self, expr: &mut Option<Expr>, _splicer: &mut Splicer<Expr>) -> Result<()> {
        if let Some(current) = expr {
            if current.kind() == NodeKind::ExprIdent {
                self.names.push(current.str().to_string());
                if current.str() == "i" {
                    *expr = Some(Expr::ident("k"));
                }
            }
        }
        Ok(())
    }
}

#[test]
fn print_hands_children_to_visitor() {
    let mut the_loop = stmt("for(i = 0; i < n; i ++) x = i;");
    let mut out = String::new();
    let mut visitor = RenameInduction::default();
    the_loop
        .print(&mut out, Some(&mut visitor as &mut dyn Visitor))
        .unwrap();
    // Only the punctuation of the loop itself is written.
    assert_eq!(out, "for(; ; ) ");
    assert_eq!(visitor.names, vec!["i", "i", "n", "i", "x", "i"]);
    assert_eq!(the_loop.to_string(), "for(k = 0; k < n; k ++) x = k;");
}
