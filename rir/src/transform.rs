use crate::convert::DebugPrint;
use crate::convert::Pass;
use crate::convert::RewriteResult;
use crate::convert::UnrollLoops;
use crate::heuristic::Constant;
use crate::heuristic::HeuristicManager;
use crate::heuristic::UNROLLING_NUMBER;
use crate::ir::Block;
use anyhow::Result;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use std::fmt;
use std::fmt::Display;
use std::sync::Arc;
use tracing::info;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;

/// A transformation pass (e.g., `--unroll-loops`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinglePass {
    pass: String,
}

impl Display for SinglePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pass)
    }
}

impl SinglePass {
    pub fn new(pass: &str) -> SinglePass {
        let pass = pass.strip_prefix("--").unwrap_or(pass);
        SinglePass {
            pass: pass.to_string(),
        }
    }
    pub fn name(&self) -> &str {
        &self.pass
    }
}

/// Flags that select a pass.
const PASS_FLAGS: [&str; 2] = [UnrollLoops::NAME, DebugPrint::NAME];

/// A collection of [SinglePass]es.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Passes {
    passes: Vec<SinglePass>,
}

impl Display for Passes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.passes
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<String>>()
                .join(" ")
        )
    }
}

impl Passes {
    pub fn from_vec(passes: Vec<&str>) -> Passes {
        Passes {
            passes: passes.iter().map(|p| SinglePass::new(p)).collect(),
        }
    }
    /// Extract the pass flags (such as `--unroll-loops`) from the given args,
    /// in the order in which they were given.
    pub fn from_args<I, S>(args: I) -> Passes
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut passes = vec![];
        for arg in args {
            let arg = arg.as_ref();
            if let Some(name) = arg.strip_prefix("--") {
                if PASS_FLAGS.contains(&name) {
                    passes.push(SinglePass::new(name));
                }
            }
        }
        Passes { passes }
    }
    pub fn vec(&self) -> &Vec<SinglePass> {
        &self.passes
    }
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// Options for [transform].
#[derive(Clone, Debug, Default)]
pub struct TransformOptions {
    pub passes: Passes,
    pub print_ir_before_all: bool,
}

impl TransformOptions {
    pub fn from_passes(passes: Passes) -> Self {
        TransformOptions {
            passes,
            print_ir_before_all: false,
        }
    }
    pub fn set_print_ir_before_all(&mut self, print_ir_before_all: bool) {
        self.print_ir_before_all = print_ir_before_all;
    }
}

/// Interface to add custom passes to the compiler.
pub trait TransformDispatch {
    fn dispatch(
        block: &mut Block,
        pass: &SinglePass,
        heuristics: &HeuristicManager,
    ) -> Result<RewriteResult>;
}

/// Default implementation of [TransformDispatch].
///
/// Knows only the passes that are implemented in this crate.
pub struct DefaultTransformDispatch;

/// Initialize logging with the given level.
pub fn init_subscriber(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_test_writer()
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

impl TransformDispatch for DefaultTransformDispatch {
    fn dispatch(
        block: &mut Block,
        pass: &SinglePass,
        heuristics: &HeuristicManager,
    ) -> Result<RewriteResult> {
        match pass.name() {
            UnrollLoops::NAME => UnrollLoops::convert(block, heuristics),
            DebugPrint::NAME => DebugPrint::convert(block, heuristics),
            _ => Err(anyhow::anyhow!("Unknown pass: {}", pass)),
        }
    }
}

/// Default arguments of the library.
///
/// This includes the passes such as `--unroll-loops` and the options that
/// configure them. `--debug` is not included to allow downstream projects to
/// handle the logging differently.
pub fn default_arguments() -> Vec<Arg> {
    vec![
        Arg::new(UnrollLoops::NAME)
            .long(UnrollLoops::NAME)
            .help("Unroll loops with a recognized induction variable")
            .action(ArgAction::SetTrue),
        Arg::new(DebugPrint::NAME)
            .long(DebugPrint::NAME)
            .help("Log the tree structure of the IR")
            .action(ArgAction::SetTrue),
        Arg::new("print-ir-before-all")
            .long("print-ir-before-all")
            .help("Print the IR before each pass")
            .action(ArgAction::SetTrue),
        Arg::new("unroll-factor")
            .long("unroll-factor")
            .value_name("N")
            .help("Unroll factor for every loop (overrides the heuristic)")
            .value_parser(clap::value_parser!(u32)),
        Arg::new("heuristic")
            .long("heuristic")
            .value_name("NAME=VALUE")
            .help("Replace a heuristic by a constant")
            .action(ArgAction::Append),
    ]
}

/// Parse a `NAME=VALUE` heuristic override.
fn parse_override(text: &str) -> Result<(&str, f64)> {
    let (name, value) = match text.split_once('=') {
        Some((name, value)) if !name.is_empty() => (name, value),
        _ => return Err(anyhow::anyhow!("Expected NAME=VALUE but got `{text}`")),
    };
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|_| anyhow::anyhow!("Invalid value for heuristic {name}: `{value}`"))?;
    Ok((name.trim(), value))
}

/// Install the heuristic overrides from the [default_arguments].
pub fn configure_heuristics(matches: &ArgMatches, heuristics: &HeuristicManager) -> Result<()> {
    if let Some(factor) = matches.get_one::<u32>("unroll-factor") {
        heuristics.set_override(UNROLLING_NUMBER, Arc::new(Constant(*factor as f64)));
    }
    if let Some(overrides) = matches.get_many::<String>("heuristic") {
        for text in overrides {
            let (name, value) = parse_override(text)?;
            heuristics.set_override(name, Arc::new(Constant(value)));
        }
    }
    Ok(())
}

/// Options for [transform] from the [default_arguments].
pub fn options_from_matches(args: &[String], matches: &ArgMatches) -> TransformOptions {
    let mut options = TransformOptions::from_passes(Passes::from_args(args));
    options.set_print_ir_before_all(matches.get_flag("print-ir-before-all"));
    options
}

/// Transform the given rule body via the given passes.
///
/// Passes run in order and each one mutates the block in place.
pub fn transform<T: TransformDispatch>(
    block: &mut Block,
    options: &TransformOptions,
    heuristics: &HeuristicManager,
) -> Result<RewriteResult> {
    let mut result = RewriteResult::Unchanged;
    for pass in options.passes.vec() {
        if options.print_ir_before_all {
            info!("IR before {pass}:\n{block}\n");
        }
        let new_result = T::dispatch(block, pass, heuristics)?;
        if new_result.is_changed() {
            result = new_result;
        }
    }
    Ok(result)
}
