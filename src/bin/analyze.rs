//! A thin demonstration harness (`§6`): loads a JSON-encoded [`Program`],
//! runs one named analysis pass from an entry method, and prints the
//! result. Not a deliverable in its own right -- grounded on the
//! teacher's `examples/disassembler` CLI (`clap::Parser` args,
//! `thiserror`-derived CLI error enum, a small dispatch function per
//! subcommand).

use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use latticework::{
    cha::ChaBuilder,
    config::TaintConfig,
    dataflow::{const_prop::ConstantPropagation, live_vars::LiveVariables, solve},
    dead_code,
    errors::{AnalysisError, ConfigError},
    hierarchy::ClassHierarchy,
    icfg::build_icfg,
    interprop::InterProcConstProp,
    ir::{ClassId, MethodId, Program, Subsignature},
    pta::{
        context::{Context, CsMethod, KCallSiteSensitivity},
        heap::AllocSiteHeapModel,
        CiPta, CsPta,
    },
    taint::TaintAnalysis,
};

/// Which analysis to run and print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Pass {
    /// CHA call-graph construction.
    Cha,
    /// Context-insensitive pointer analysis.
    PtaCi,
    /// Context-sensitive pointer analysis.
    PtaCs,
    /// Per-method constant propagation.
    ConstProp,
    /// Per-method live-variable analysis.
    LiveVars,
    /// Inter-procedural constant propagation over the ICFG.
    InterConstProp,
    /// The taint-propagation overlay; requires `--taint-config`.
    Taint,
    /// Dead-code detection.
    DeadCode,
}

/// Runs one whole-program static-analysis pass over a JSON-encoded program.
#[derive(Debug, Parser)]
#[command(name = "analyze", about = "Runs one latticework pass and prints its result")]
struct Args {
    /// Path to a JSON-encoded `Program`.
    program: PathBuf,

    /// Declaring class of the entry method, e.g. `Main`.
    #[arg(long)]
    entry_class: String,

    /// Subsignature of the entry method, e.g. `main()`.
    #[arg(long)]
    entry_method: String,

    /// Which pass to run.
    #[arg(long, value_enum)]
    pass: Pass,

    /// k for k-call-site-sensitive context sensitivity (`pta-cs`,
    /// `inter-constprop`, `taint`).
    #[arg(long, default_value_t = 1)]
    k: usize,

    /// Path to a JSON-encoded taint configuration (`taint` only).
    #[arg(long)]
    taint_config: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed program JSON in {path}: {source}")]
    Program {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("entry method {0} not found in the program")]
    UnknownEntry(MethodId),
    #[error("--taint-config is required for the taint pass")]
    MissingTaintConfig,
    #[error("malformed taint config {path}: {source}")]
    TaintConfig {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

fn load_program(path: &PathBuf) -> Result<Program, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Program {
        path: path.clone(),
        source,
    })
}

fn entry_method_id(args: &Args) -> MethodId {
    MethodId {
        declaring_class: ClassId::from(args.entry_class.as_str()),
        subsignature: Subsignature::new(args.entry_method.clone()),
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let program = load_program(&args.program)?;
    let entry = entry_method_id(args);
    if program.method(&entry).is_none() {
        return Err(CliError::UnknownEntry(entry));
    }

    match args.pass {
        Pass::Cha => {
            let hierarchy = ClassHierarchy::new(&program);
            let call_graph = ChaBuilder::new(hierarchy).build(entry);
            println!("{call_graph:#?}");
        }
        Pass::PtaCi => {
            let pta = CiPta::new(&program, AllocSiteHeapModel);
            let result = pta.solve(entry);
            result.verify_invariants()?;
            println!("{result:#?}");
        }
        Pass::PtaCs => {
            let pta = CsPta::new(&program, AllocSiteHeapModel, KCallSiteSensitivity::new(args.k));
            let result = pta.solve(entry);
            result.verify_invariants()?;
            println!("{result:#?}");
        }
        Pass::ConstProp => {
            let method = program.method(&entry).expect("checked above");
            let facts = solve(&ConstantPropagation::new(method), method);
            println!("{facts:#?}");
        }
        Pass::LiveVars => {
            let method = program.method(&entry).expect("checked above");
            let facts = solve(&LiveVariables, method);
            println!("{facts:#?}");
        }
        Pass::InterConstProp => {
            let pta = CsPta::new(&program, AllocSiteHeapModel, KCallSiteSensitivity::new(args.k));
            let pta_result = pta.solve(entry.clone());
            let icfg = build_icfg(&program, pta_result.call_graph());
            let entry_cs = CsMethod {
                ctx: Context::empty(),
                method: entry,
            };
            let result = InterProcConstProp::new(&program, &pta_result, &icfg).solve(&entry_cs);
            println!("{result:#?}");
        }
        Pass::Taint => {
            let config_path = args.taint_config.as_ref().ok_or(CliError::MissingTaintConfig)?;
            let config_text = fs::read_to_string(config_path).map_err(|source| CliError::Io {
                path: config_path.clone(),
                source,
            })?;
            let config = TaintConfig::from_json(&config_text).map_err(|source| CliError::TaintConfig {
                path: config_path.clone(),
                source,
            })?;
            let (config, errors) = config.resolve_against(&program);
            for e in &errors {
                eprintln!("warning: {e}");
            }
            let pta = CsPta::new(&program, AllocSiteHeapModel, KCallSiteSensitivity::new(args.k));
            let pta_result = pta.solve(entry);
            let analysis = TaintAnalysis::new(&program, &pta_result, &config);
            let flows = analysis.run();
            println!("{flows:#?}");
        }
        Pass::DeadCode => {
            let method = program.method(&entry).expect("checked above");
            let const_prop = solve(&ConstantPropagation::new(method), method);
            let live_vars = solve(&LiveVariables, method);
            let dead = dead_code::detect(method, &const_prop, &live_vars);
            println!("{dead:#?}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
