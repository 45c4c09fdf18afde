extern crate rir;

use indoc::indoc;
use rir::convert::RewriteResult;
use rir::convert::JUST_UNROLLED;
use rir::heuristic::HeuristicManager;
use rir::heuristic::ValueMap;
use rir::heuristic::UNROLLING_NUMBER;
use rir::ir::Block;
use rir::ir::IrError;
use rir::ir::Node;
use rir::tester::Tester;
use rir::transform;
use rir::DefaultTransformDispatch;
use rir::Passes;
use rir::TransformOptions;
use std::panic::Location;
use std::sync::Arc;

fn flags() -> Vec<&'static str> {
    vec!["--unroll-loops"]
}

fn run_again(block: &mut Block, heuristics: &HeuristicManager) -> RewriteResult {
    let options = TransformOptions::from_passes(Passes::from_vec(flags()));
    transform::<DefaultTransformDispatch>(block, &options, heuristics).unwrap()
}

#[test]
fn unroll_by_four() {
    Tester::init_tracing();
    let src = indoc! {"
    for(i = 0; i < 20; i ++) {
    s += a[i];
    }
    "};
    let expected = indoc! {"
    {
    i = 0;
    for(; i + 4 < 20; ) {
    {
    s += a [ i ];
    }
    i ++;
    {
    s += a [ i ];
    }
    i ++;
    {
    s += a [ i ];
    }
    i ++;
    {
    s += a [ i ];
    }
    i ++;
    }
    for(; i < 20; i ++) {
    s += a [ i ];
    }
    }
    "};
    let heuristics = Tester::unroll_factor(4);
    let (block, actual) = Tester::transform(&heuristics, flags(), src);
    Tester::check_lines_exact(&actual, expected, Location::caller());

    let stmts = block.stmts()[0].as_block().unwrap().stmts();
    assert_eq!(stmts.len(), 3);
    assert!(!stmts[0].has_annotation(JUST_UNROLLED));
    assert!(stmts[1].has_annotation(JUST_UNROLLED));
    assert!(stmts[2].has_annotation(JUST_UNROLLED));
    assert_eq!(heuristics.used_heuristics(), vec![UNROLLING_NUMBER.to_string()]);
}

#[test]
fn second_run_only_removes_tags() {
    let src = "for(i = 0; i < 20; i ++) s += a[i];";
    let heuristics = Tester::unroll_factor(4);
    let (mut block, first) = Tester::transform(&heuristics, flags(), src);

    let result = run_again(&mut block, &heuristics);
    assert_eq!(result, RewriteResult::Unchanged);
    assert_eq!(block.to_string(), first);
    let stmts = block.stmts()[0].as_block().unwrap().stmts();
    assert!(!stmts[1].has_annotation(JUST_UNROLLED));
    assert!(!stmts[2].has_annotation(JUST_UNROLLED));
}

#[test]
fn boolean_test_is_not_unrolled() {
    let src = "for(i = 0; i < 10 && flag; i ++) x += i;";
    let heuristics = Tester::unroll_factor(4);
    let (_, result, actual) = Tester::transform_with(&heuristics, flags(), src);
    assert_eq!(result, RewriteResult::Unchanged);
    assert_eq!(actual, "for(i = 0; i < 10 && flag; i ++) x += i;");
    // Rejected before the heuristic was asked.
    assert!(heuristics.used_heuristics().is_empty());
}

#[test]
fn indirect_test_is_not_unrolled() {
    let src = "for(i = 0; i + 1 < n; i ++) x += i;";
    let heuristics = Tester::unroll_factor(4);
    let (_, result, actual) = Tester::transform_with(&heuristics, flags(), src);
    assert_eq!(result, RewriteResult::Unchanged);
    assert_eq!(actual, src);
}

#[test]
fn default_factor_keeps_loops() {
    let src = "for(i = 0; i < n; i ++) x += i;";
    let heuristics = HeuristicManager::with_defaults();
    let (_, result, actual) = Tester::transform_with(&heuristics, flags(), src);
    assert_eq!(result, RewriteResult::Unchanged);
    assert_eq!(actual, src);
    assert_eq!(heuristics.used_heuristics(), vec![UNROLLING_NUMBER.to_string()]);
}

#[test]
fn step_and_direction() {
    let heuristics = Tester::unroll_factor(3);
    let src = "for(i = 0; i < n; i += 2) s += i;";
    let (_, actual) = Tester::transform(&heuristics, flags(), src);
    let expected = indoc! {"
    i = 0;
    for(; i + 6 < n; ) {
    s += i;
    i += 2;
    s += i;
    i += 2;
    s += i;
    i += 2;
    }
    for(; i < n; i += 2) s += i;
    "};
    Tester::check_lines_contain(&actual, expected, Location::caller());

    let src = "for(i = n; i > 0; i --) s += i;";
    let (_, actual) = Tester::transform(&heuristics, flags(), src);
    let expected = indoc! {"
    i = n;
    for(; i - 3 >= 0; ) {
    i --;
    }
    for(; i > 0; i --) s += i;
    "};
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn huge_step_keeps_the_product_symbolic() {
    let heuristics = Tester::unroll_factor(4);
    let src = "for(i = 0; i < n; i += 4611686018427387904) x += i;";
    let (_, result, actual) = Tester::transform_with(&heuristics, flags(), src);
    assert_eq!(result, RewriteResult::Changed);
    assert!(actual.contains("for(; i + 4 * ( 4611686018427387904 ) < n; )"));
    assert!(actual.contains("for(; i < n; i += 4611686018427387904) x += i;"));
}

#[test]
fn while_loop_moves_variable_in_body() {
    let heuristics = Tester::unroll_factor(2);
    let src = indoc! {"
    while(i < n) {
    s += a[i];
    i ++;
    }
    "};
    let (block, actual) = Tester::transform(&heuristics, flags(), src);
    let expected = indoc! {"
    {
    for(; i + 2 < n; ) {
    {
    s += a [ i ];
    i ++;
    }
    {
    s += a [ i ];
    i ++;
    }
    }
    for(; i < n; ) {
    s += a [ i ];
    i ++;
    }
    }
    "};
    Tester::check_lines_exact(&actual, expected, Location::caller());
    // Nothing to hoist without declaration.
    assert_eq!(block.stmts()[0].as_block().unwrap().len(), 2);
}

#[test]
fn nested_loops_use_nesting_level() {
    let heuristics = HeuristicManager::with_defaults();
    let formula = |features: &ValueMap| {
        if features["loopNestingLevel"] > 1.0 {
            1.0
        } else {
            2.0
        }
    };
    heuristics.set_override(UNROLLING_NUMBER, Arc::new(formula));
    let src = indoc! {"
    for(i = 0; i < n; i ++) {
    for(j = 0; j < m; j ++) {
    x += b[j];
    }
    }
    "};
    let (_, actual) = Tester::transform(&heuristics, flags(), src);
    let expected = indoc! {"
    i = 0;
    for(; i + 2 < n; ) {
    for(j = 0; j < m; j ++) {
    i ++;
    for(j = 0; j < m; j ++) {
    i ++;
    }
    for(; i < n; i ++) {
    for(j = 0; j < m; j ++) {
    "};
    Tester::check_lines_contain(&actual, expected, Location::caller());
    assert_eq!(actual.matches("for(").count(), 5);
}

#[test]
fn nested_loops_unroll_bottom_up() {
    let heuristics = Tester::unroll_factor(2);
    let src = "for(i = 0; i < n; i ++) for(j = 0; j < m; j ++) x += b[j];";
    let (block, actual) = Tester::transform(&heuristics, flags(), src);
    // Inner loop becomes two loops; the outer loop holds three copies of
    // those.
    assert_eq!(actual.matches("for(; j + 2 < m; )").count(), 3);
    assert_eq!(actual.matches("for(; i + 2 < n; )").count(), 1);
    assert_eq!(actual.matches("for(").count(), 8);
    Tester::verify(&block);
}

#[test]
fn unsupported_increment_stops_the_pass() {
    let src = "for(i = 0; i < n; i = next(i)) x = i;";
    let mut block = Block::parse(src, &Default::default()).unwrap();
    let options = TransformOptions::from_passes(Passes::from_vec(flags()));
    let heuristics = Tester::unroll_factor(4);
    let err = transform::<DefaultTransformDispatch>(&mut block, &options, &heuristics).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IrError>(),
        Some(IrError::UnsupportedConstruct { .. })
    ));
    // The loop is left as it was.
    assert_eq!(block.to_string(), src);
}
