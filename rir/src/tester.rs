use crate::convert::RewriteResult;
use crate::frontend::Location as SourceLocation;
use crate::heuristic::Constant;
use crate::heuristic::HeuristicManager;
use crate::heuristic::UNROLLING_NUMBER;
use crate::init_subscriber;
use crate::ir::Block;
use crate::ir::Stmt;
use crate::transform;
use crate::DefaultTransformDispatch;
use crate::Passes;
use crate::TransformOptions;
use std::cmp::max;
use std::panic::Location;
use std::sync::Arc;
use tracing::info;

pub struct Tester;

impl Tester {
    /// Initialize the subscriber for the tests.
    ///
    /// Cannot pass options, since the tests run concurrently.
    pub fn init_tracing() {
        let level = tracing::Level::INFO;
        match init_subscriber(level) {
            Ok(_) => (),
            Err(_e) => (),
        }
    }
    fn point_to_missing_line(expected: &str, index: usize) -> String {
        let mut result = String::new();
        result.push_str("A line is missing from the output:\n");
        result.push_str("```");
        for (i, line) in expected.lines().enumerate() {
            if i == index {
                let msg = format!("{line}   <== missing");
                result.push_str(&format!("\n{msg}"));
            } else {
                result.push_str(&format!("\n{line}"));
            }
        }
        result.push_str("\n```");
        result
    }
    pub fn check_lines_exact(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual = actual.trim();
        let expected = expected.trim();
        let l = max(actual.lines().count(), expected.lines().count());
        for i in 0..l {
            let actual_line = match actual.lines().nth(i) {
                None => {
                    panic!("Line {i} not found in actual output: called from {caller}");
                }
                Some(actual_line) => actual_line,
            };
            let expected_line = match expected.lines().nth(i) {
                None => {
                    panic!("Line {i} not found in expected output: called from {caller}");
                }
                Some(expected_line) => expected_line,
            };
            assert_eq!(
                actual_line.trim(),
                expected_line.trim(),
                "called from {caller}"
            );
        }
    }
    /// Check whether the expected lines are present in the actual output.
    ///
    /// The actual output may contain additional lines that are not in the expected output.
    pub fn check_lines_contain(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual = actual.trim();
        let expected = expected.trim();
        let mut actual_index = 0;
        'outer: for (i, expected_line) in expected.lines().enumerate() {
            let expected_line = expected_line.trim();
            // An empty line would match any line.
            if expected_line.is_empty() {
                continue;
            }
            for (j, actual_line) in actual.lines().enumerate().skip(actual_index) {
                if actual_line.contains(expected_line) {
                    actual_index = j + 1;
                    continue 'outer;
                }
            }
            let msg = Self::point_to_missing_line(expected, i);
            panic!("{msg}\nwhen called from {caller}");
        }
    }
    fn print_heading(msg: &str, src: &str) {
        info!("{msg}:\n```\n{src}\n```\n");
    }
    pub fn parse(src: &str) -> (Block, String) {
        let src = src.trim();
        Self::print_heading("Before parse", src);
        let block = Block::parse(src, &SourceLocation::default()).unwrap();
        let actual = block.to_string();
        Self::print_heading("After parse", &actual);
        (block, actual)
    }
    /// Heuristics that unroll every loop by the given factor.
    pub fn unroll_factor(factor: u32) -> HeuristicManager {
        let heuristics = HeuristicManager::with_defaults();
        heuristics.set_override(UNROLLING_NUMBER, Arc::new(Constant(factor as f64)));
        heuristics
    }
    /// Run the passes and return the block together with its printed form.
    ///
    /// Does not require the passes to change the block.
    pub fn transform_with(
        heuristics: &HeuristicManager,
        arguments: Vec<&str>,
        src: &str,
    ) -> (Block, RewriteResult, String) {
        let src = src.trim();
        let mut block = Block::parse(src, &SourceLocation::default()).unwrap();
        let msg = format!("Before (transform {arguments:?})");
        Self::print_heading(&msg, src);

        for arg in arguments.iter() {
            assert!(arg.starts_with("--"), "passes should be prefixed with `--`");
        }
        let options = TransformOptions::from_passes(Passes::from_vec(arguments.clone()));
        let result =
            transform::<DefaultTransformDispatch>(&mut block, &options, heuristics).unwrap();
        let actual = block.to_string();
        let msg = format!("After (transform {arguments:?})");
        Self::print_heading(&msg, &actual);
        Self::verify(&block);
        (block, result, actual)
    }
    /// Run the passes and expect them to change the block.
    pub fn transform(
        heuristics: &HeuristicManager,
        arguments: Vec<&str>,
        src: &str,
    ) -> (Block, String) {
        let (block, result, actual) = Self::transform_with(heuristics, arguments, src);
        if !result.is_changed() {
            panic!("Expected changes");
        }
        (block, actual)
    }
    fn verify_stmt(stmt: &Stmt) {
        let parts = stmt.num_exprs();
        match stmt {
            Stmt::Loop(the_loop) => {
                assert!(parts >= 3, "loop with {parts} parts:\n{stmt}");
                Self::verify_stmt(the_loop.body());
            }
            Stmt::Cond(cond) => {
                assert_eq!(parts, 1, "if with {parts} parts:\n{stmt}");
                Self::verify_stmt(cond.then());
                if let Some(otherwise) = cond.otherwise() {
                    Self::verify_stmt(otherwise);
                }
            }
            Stmt::Switch(switch) => {
                assert_eq!(parts, 1, "switch with {parts} parts:\n{stmt}");
                Self::verify_stmt(switch.body());
            }
            Stmt::Block(block) => {
                assert_eq!(parts, 0, "block statement with {parts} parts:\n{stmt}");
                Self::verify(block.block());
            }
            Stmt::Raw(_) => {
                assert_eq!(parts, 0, "raw statement with {parts} parts:\n{stmt}");
            }
            Stmt::Basic(_) => (),
        }
    }
    /// Run some extra verification on the IR.
    ///
    /// Catches structural problems that are not visible in the textual
    /// representation, such as a loop that lost one of its clauses.
    pub fn verify(block: &Block) {
        for stmt in block.stmts() {
            Self::verify_stmt(stmt);
        }
    }
}
