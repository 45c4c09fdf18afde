use anyhow::Result;
use clap::ArgMatches;
use clap::Args;
use clap::Command;
use rir::frontend::Location;
use rir::heuristic::HeuristicManager;
use rir::ir::Block;
use rir::transform;
use rir::DefaultTransformDispatch;
use rir::TransformOptions;
use std::io::Read;
use tracing::Level;

/// A compiler driver that optimizes rule bodies
#[derive(Args, Debug)]
#[command(version, about)]
struct RircArgs {
    /// The input file (- is interpreted as stdin)
    #[arg(default_value = "-")]
    input: String,
    /// Print debug logs to stdout
    #[arg(long)]
    debug: bool,
}

fn cli() -> Command {
    let cli = Command::new("rirc").args(rir::default_arguments());
    let cli = RircArgs::augment_args(cli);
    cli
}

fn parse_and_transform(
    src: &str,
    options: &TransformOptions,
    heuristics: &HeuristicManager,
) -> Result<String> {
    let mut block = Block::parse(src, &Location::default())?;
    transform::<DefaultTransformDispatch>(&mut block, options, heuristics)?;
    Ok(block.to_string())
}

fn run(args: &[String], matches: &ArgMatches, input_text: &str) -> Result<String> {
    let heuristics = HeuristicManager::with_defaults();
    rir::configure_heuristics(matches, &heuristics)?;
    let options = rir::options_from_matches(args, matches);
    parse_and_transform(input_text, &options, &heuristics)
}

fn read_input(input: &str) -> Result<String> {
    let input_text = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(input)?
    };
    Ok(input_text)
}

fn main() -> Result<()> {
    let cli = cli();
    let args: Vec<String> = std::env::args().collect();
    let matches = cli.get_matches();

    let level = if matches.get_flag("debug") {
        Level::DEBUG
    } else {
        Level::INFO
    };
    rir::init_subscriber(level)?;

    let input = match matches.get_one::<String>("input") {
        Some(input) => input.clone(),
        None => "-".to_string(),
    };
    let input_text = read_input(&input)?;
    let result = run(&args, &matches, &input_text)?;
    println!("{result}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use rir::tester::Tester;
    use std::panic::Location;

    fn run_app(args: Vec<&str>, input_text: &str) -> Result<String> {
        let cli = cli();
        let args_owned: Vec<String> = args.iter().map(|&s| s.to_string()).collect();
        let matches = cli.try_get_matches_from(args_owned.clone())?;
        run(&args_owned, &matches, input_text)
    }

    #[test]
    fn test_help() {
        let args = vec!["rirc", "--help"];
        let result = run_app(args, "");
        let err = match result {
            Ok(_) => panic!("Expected an error"),
            Err(e) => e,
        };
        let result = err.to_string();
        assert!(result.contains("Usage: rirc"));
        assert!(result.contains("--unroll-loops"));
        assert!(result.contains("--unroll-factor"));
    }

    #[test]
    fn test_invalid_args() {
        let result = run_app(vec!["rirc", "--invalid-flag"], "");
        assert!(result.is_err());
        let result = run_app(vec!["rirc", "--unroll-factor", "many"], "");
        assert!(result.is_err());
        let result = run_app(vec!["rirc", "--heuristic", "factor"], "x = 1;");
        assert!(result.is_err());
    }

    #[test]
    fn test_without_passes() {
        let src = "for(i = 0; i < n; i ++) x += i;";
        let result = run_app(vec!["rirc"], src).unwrap();
        assert_eq!(result, src);
    }

    #[test]
    fn test_unroll() {
        Tester::init_tracing();
        let src = indoc! {"
        for(i = 0; i < n; i ++) {
        x += i;
        }
        "};
        let args = vec!["rirc", "--unroll-loops", "--unroll-factor", "2"];
        let result = run_app(args, src).unwrap();
        let expected = indoc! {"
        i = 0;
        for(; i + 2 < n; ) {
        x += i;
        i ++;
        x += i;
        i ++;
        for(; i < n; i ++) {
        "};
        Tester::check_lines_contain(&result, expected, Location::caller());
    }

    #[test]
    fn test_heuristic_override() {
        let src = "for(i = 0; i < n; i ++) x += i;";
        let args = vec![
            "rirc",
            "--unroll-loops",
            "--heuristic",
            "UnrollingOptimizer_unrollingNumber=3",
            "--print-ir-before-all",
        ];
        let result = run_app(args, src).unwrap();
        assert!(result.contains("for(; i + 3 < n; )"));
    }
}
