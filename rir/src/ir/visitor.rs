use crate::ir::Block;
use crate::ir::Expr;
use crate::ir::Node;
use crate::ir::Stmt;
use anyhow::Result;
use std::collections::VecDeque;

/// Hooks that a pass implements to walk and rewrite the IR.
///
/// For every expression and statement in a list, the traversal calls the
/// `before` hook, descends into the node when [Visitor::should_descend]
/// holds, and then calls the `after` hook. Both hooks receive the slot that
/// holds the node:
///
/// - Setting the slot to `None` deletes the node.
/// - Assigning a new node replaces it.
/// - [Splicer::insert_before] and [Splicer::insert_after] add siblings.
///
/// Traversal is depth-first; `before` hooks run in pre-order and `after`
/// hooks in post-order.
pub trait Visitor {
    fn before_expr(&mut self, _expr: &mut Option<Expr>, _splicer: &mut Splicer<Expr>) -> Result<()> {
        Ok(())
    }
    fn after_expr(&mut self, _expr: &mut Option<Expr>, _splicer: &mut Splicer<Expr>) -> Result<()> {
        Ok(())
    }
    fn before_stmt(&mut self, _stmt: &mut Option<Stmt>, _splicer: &mut Splicer<Stmt>) -> Result<()> {
        Ok(())
    }
    fn after_stmt(&mut self, _stmt: &mut Option<Stmt>, _splicer: &mut Splicer<Stmt>) -> Result<()> {
        Ok(())
    }
    fn before_block(&mut self, _block: &mut Block) -> Result<()> {
        Ok(())
    }
    fn after_block(&mut self, _block: &mut Block) -> Result<()> {
        Ok(())
    }
    /// Whether to walk the children of a node.
    ///
    /// The hooks of the node itself are called either way.
    fn should_descend(&mut self, _node: &dyn Node) -> bool {
        true
    }
    /// Called when the traversal enters a list of expressions.
    fn push_expr_splicer(&mut self, _splicer: &mut Splicer<Expr>) {}
    /// Called when the traversal leaves a list of expressions.
    fn pop_expr_splicer(&mut self, _splicer: &mut Splicer<Expr>) {}
    fn push_stmt_splicer(&mut self, _splicer: &mut Splicer<Stmt>) {}
    fn pop_stmt_splicer(&mut self, _splicer: &mut Splicer<Stmt>) {}
}

/// Work queues of the list that is being visited.
///
/// `done` holds the nodes that will form the new list and `pending` the
/// nodes that still have to be visited. The list itself is only replaced
/// once every node has been visited.
#[derive(Debug)]
pub struct Splicer<T> {
    done: Vec<T>,
    pending: VecDeque<T>,
}

impl<T> Splicer<T> {
    fn new(items: Vec<T>) -> Self {
        Splicer {
            done: Vec::with_capacity(items.len()),
            pending: items.into(),
        }
    }
    fn next(&mut self) -> Option<T> {
        self.pending.pop_front()
    }
    fn finish(self) -> Vec<T> {
        let mut result = self.done;
        result.extend(self.pending);
        result
    }
    /// Insert a node before the current one. The node is not visited.
    pub fn insert_before(&mut self, node: T) {
        self.done.push(node);
    }
    /// Insert a node right after the current one. The node is visited next.
    pub fn insert_after(&mut self, node: T) {
        self.pending.push_front(node);
    }
    /// Take the next node out of the list before it is visited.
    pub fn remove_next(&mut self) -> Option<T> {
        self.pending.pop_front()
    }
    pub fn done(&self) -> &Vec<T> {
        &self.done
    }
    pub fn pending(&self) -> &VecDeque<T> {
        &self.pending
    }
}

/// Node types that can be spliced while a list of them is visited.
pub trait Spliceable: Node + Sized {
    fn push_splicer(visitor: &mut dyn Visitor, splicer: &mut Splicer<Self>);
    fn pop_splicer(visitor: &mut dyn Visitor, splicer: &mut Splicer<Self>);
    fn before(
        visitor: &mut dyn Visitor,
        node: &mut Option<Self>,
        splicer: &mut Splicer<Self>,
    ) -> Result<()>;
    fn after(
        visitor: &mut dyn Visitor,
        node: &mut Option<Self>,
        splicer: &mut Splicer<Self>,
    ) -> Result<()>;
}

impl Spliceable for Expr {
    fn push_splicer(visitor: &mut dyn Visitor, splicer: &mut Splicer<Self>) {
        visitor.push_expr_splicer(splicer);
    }
    fn pop_splicer(visitor: &mut dyn Visitor, splicer: &mut Splicer<Self>) {
        visitor.pop_expr_splicer(splicer);
    }
    fn before(
        visitor: &mut dyn Visitor,
        node: &mut Option<Self>,
        splicer: &mut Splicer<Self>,
    ) -> Result<()> {
        visitor.before_expr(node, splicer)
    }
    fn after(
        visitor: &mut dyn Visitor,
        node: &mut Option<Self>,
        splicer: &mut Splicer<Self>,
    ) -> Result<()> {
        visitor.after_expr(node, splicer)
    }
}

impl Spliceable for Stmt {
    fn push_splicer(visitor: &mut dyn Visitor, splicer: &mut Splicer<Self>) {
        visitor.push_stmt_splicer(splicer);
    }
    fn pop_splicer(visitor: &mut dyn Visitor, splicer: &mut Splicer<Self>) {
        visitor.pop_stmt_splicer(splicer);
    }
    fn before(
        visitor: &mut dyn Visitor,
        node: &mut Option<Self>,
        splicer: &mut Splicer<Self>,
    ) -> Result<()> {
        visitor.before_stmt(node, splicer)
    }
    fn after(
        visitor: &mut dyn Visitor,
        node: &mut Option<Self>,
        splicer: &mut Splicer<Self>,
    ) -> Result<()> {
        visitor.after_stmt(node, splicer)
    }
}

fn visit_node<T: Spliceable>(
    visitor: &mut dyn Visitor,
    slot: &mut Option<T>,
    splicer: &mut Splicer<T>,
) -> Result<()> {
    T::before(visitor, slot, splicer)?;
    if let Some(node) = slot.as_mut() {
        if visitor.should_descend(&*node) {
            node.accept(visitor)?;
        }
    }
    T::after(visitor, slot, splicer)
}

/// Visit every node of a list and replace the list by the result.
///
/// Nodes are taken one by one from the front of the pending queue. A node
/// that is still present after its `after` hook is appended to the result.
/// On error, the nodes are put back so that the tree stays complete.
pub fn visit_list<T: Spliceable>(visitor: &mut dyn Visitor, list: &mut Vec<T>) -> Result<()> {
    let mut splicer = Splicer::new(std::mem::take(list));
    T::push_splicer(visitor, &mut splicer);
    while let Some(node) = splicer.next() {
        let mut slot = Some(node);
        let result = visit_node(visitor, &mut slot, &mut splicer);
        if let Some(node) = slot {
            splicer.done.push(node);
        }
        if let Err(err) = result {
            T::pop_splicer(visitor, &mut splicer);
            *list = splicer.finish();
            return Err(err);
        }
    }
    T::pop_splicer(visitor, &mut splicer);
    *list = splicer.finish();
    Ok(())
}

/// Visit a statement that sits in a single-statement slot such as a loop
/// body.
///
/// If the visitor deletes the statement, the slot becomes the empty
/// statement. If the visitor leaves several statements, they are wrapped in
/// a block statement.
pub fn visit_slot(visitor: &mut dyn Visitor, slot: &mut Box<Stmt>) -> Result<()> {
    let stmt = std::mem::take(&mut **slot);
    let mut list = vec![stmt];
    let result = visit_list(visitor, &mut list);
    **slot = if list.len() == 1 {
        list.remove(0)
    } else if list.is_empty() {
        Stmt::default()
    } else {
        Stmt::from_block(Block::new(list))
    };
    result
}

/// Visit a block that is owned directly by a statement.
pub fn visit_block(visitor: &mut dyn Visitor, block: &mut Block) -> Result<()> {
    visitor.before_block(block)?;
    if visitor.should_descend(&*block) {
        block.accept(visitor)?;
    }
    visitor.after_block(block)
}
