use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tensure_backend::BackendRegistry;
use tensure_compare::{compare, DEFAULT_TOLERANCE};
use tensure_core::{
    init_logging, listen_for_signals, FuzzLoop, HarnessConfig, LogOptions, RandomEinsumGenerator,
    ShutdownToken,
};
use tensure_mutation::FormatEnumerator;

fn cli() -> Command {
    Command::new("tensure")
        .version(tensure_core::VERSION)
        .about("Metamorphic fuzzing harness for tensor-algebra compilers")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Append logs to this file as well"),
        )
        .subcommand(
            Command::new("run")
                .about("Run a fuzzing campaign")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Output root (corpus/, failures/, data/)"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Random seed (overrides FUZZ_SEED)"),
                )
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .short('n')
                        .value_parser(value_parser!(u64))
                        .help("Iteration budget (overrides FUZZ_ITERS)"),
                )
                .arg(
                    Arg::new("workers")
                        .long("workers")
                        .short('j')
                        .value_parser(value_parser!(usize))
                        .help("Concurrent iterations"),
                )
                .arg(
                    Arg::new("variants")
                        .long("variants")
                        .value_parser(value_parser!(usize))
                        .help("Format siblings per kernel"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_parser(value_parser!(u64))
                        .help("Per-execution deadline in seconds"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check an einsum equation")
                .arg(Arg::new("equation").required(true)),
        )
        .subcommand(
            Command::new("formats")
                .about("Print the canonical format enumeration for a rank")
                .arg(
                    Arg::new("rank")
                        .required(true)
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Print at most this many assignments"),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare two output files")
                .arg(
                    Arg::new("reference")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("candidate")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("tolerance")
                        .long("tolerance")
                        .short('t')
                        .value_parser(value_parser!(f64))
                        .help("Absolute tolerance"),
                ),
        )
        .subcommand(Command::new("backends").about("List registered backend kinds"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(&LogOptions {
        json: matches.get_flag("log-json"),
        file: matches.get_one::<PathBuf>("log-file").cloned(),
        default_filter: None,
    })?;

    let ok = match matches.subcommand() {
        Some(("run", args)) => run(args).await?,
        Some(("validate", args)) => validate(args),
        Some(("formats", args)) => formats(args),
        Some(("compare", args)) => compare_files(args)?,
        Some(("backends", _)) => {
            for kind in BackendRegistry::with_defaults().kinds() {
                println!("{kind}");
            }
            true
        }
        _ => true,
    };
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: &ArgMatches) -> anyhow::Result<bool> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => HarnessConfig::from_toml_file(path)?,
        None => HarnessConfig::default(),
    }
    .apply_env()?;
    if let Some(dir) = args.get_one::<PathBuf>("output") {
        config = config.with_output_dir(dir);
    }
    if let Some(&seed) = args.get_one::<u64>("seed") {
        config = config.with_seed(seed);
    }
    if let Some(&n) = args.get_one::<u64>("iterations") {
        config = config.with_max_iterations(n);
    }
    if let Some(&n) = args.get_one::<usize>("workers") {
        config = config.with_workers(n);
    }
    if let Some(&n) = args.get_one::<usize>("variants") {
        config = config.with_variants(n);
    }
    if let Some(&secs) = args.get_one::<u64>("timeout") {
        config = config.with_exec_timeout_secs(secs);
    }

    let generator = Arc::new(RandomEinsumGenerator::new(
        config.seed,
        config.generator.clone(),
    ));
    let fuzz = FuzzLoop::new(config, &BackendRegistry::with_defaults(), generator)?;

    let shutdown = ShutdownToken::new();
    tokio::spawn(listen_for_signals(shutdown.clone()));

    let runtime = tokio::runtime::Handle::current();
    let summary = tokio::task::spawn_blocking(move || fuzz.run(&shutdown, &runtime))
        .await
        .context("fuzz loop thread failed")??;
    println!("{summary}");
    Ok(summary.failed == 0)
}

fn validate(args: &ArgMatches) -> bool {
    let Some(equation) = args.get_one::<String>("equation") else {
        return false;
    };
    match tensure_einsum::validate(equation) {
        Ok(()) => {
            println!("ok");
            true
        }
        Err(e) => {
            println!("invalid: {e}");
            false
        }
    }
}

fn formats(args: &ArgMatches) -> bool {
    let rank = args.get_one::<usize>("rank").copied().unwrap_or(0);
    let limit = args.get_one::<usize>("limit").copied().unwrap_or(usize::MAX);
    for assignment in FormatEnumerator::new(rank).take(limit) {
        println!("{assignment}");
    }
    true
}

fn compare_files(args: &ArgMatches) -> anyhow::Result<bool> {
    let (Some(reference), Some(candidate)) = (
        args.get_one::<PathBuf>("reference"),
        args.get_one::<PathBuf>("candidate"),
    ) else {
        return Ok(false);
    };
    let tolerance = args
        .get_one::<f64>("tolerance")
        .copied()
        .unwrap_or(DEFAULT_TOLERANCE);
    let verdict = compare(reference, candidate, tolerance)?;
    println!("{verdict}");
    Ok(verdict.is_equal())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let matches = cli()
            .try_get_matches_from(["tensure", "run", "-n", "5", "--seed", "3", "--log-json"])
            .unwrap();
        assert!(matches.get_flag("log-json"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(args.get_one::<u64>("iterations"), Some(&5));
        assert_eq!(args.get_one::<u64>("seed"), Some(&3));
    }
}
