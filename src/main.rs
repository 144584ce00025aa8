use std::io::IsTerminal;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use covgate_check::{CheckOptions, DiffSource, SummarySource};
use covgate_core::{ChangedLines, CovgateConfig, OutputFormat};

const CONFIG_FILE: &str = ".covgate.toml";

#[derive(Parser)]
#[command(
    name = "covgate",
    version,
    about = "Absolute and incremental coverage gate for code changes",
    long_about = "covgate runs the test suite with coverage, then checks two numbers:\n\
                   absolute coverage of the whole codebase and incremental coverage of\n\
                   the lines your change added or modified.\n\n\
                   Examples:\n  \
                     covgate                                 Run tests and check against origin/main\n  \
                     covgate check --base release/1.4        Compare against an explicit revision\n  \
                     covgate check --profile c.out --summary sum.txt --diff pr.diff\n  \
                     git diff -U0 main | covgate lines --stdin  Show which lines count as changed\n  \
                     covgate init                            Write a .covgate.toml template"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .covgate.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Status lines (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown, e.g. for job summaries"
    )]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the coverage gate (default when no subcommand is given)
    #[command(long_about = "Run the coverage gate.\n\n\
        Runs the test command, reads the coverage profile and summary, diffs the\n\
        working tree against the first baseline candidate that resolves, and\n\
        compares both percentages with their thresholds. Exits 1 when either\n\
        threshold is missed or coverage data is unusable.\n\n\
        Examples:\n  covgate check\n  covgate check --incremental-threshold 80\n  covgate check --skip-tests --format markdown")]
    Check(CheckArgs),
    /// Print the changed-line map of a diff
    #[command(long_about = "Print the changed-line map of a diff.\n\n\
        Shows which new-file lines each hunk contributes. Reads the diff from a\n\
        file, from stdin, or from git against the resolved baseline.\n\n\
        Examples:\n  covgate lines\n  covgate lines --base HEAD~3\n  git diff -U0 | covgate lines --stdin")]
    Lines {
        /// Read diff from file
        #[arg(long, conflicts_with_all = ["stdin", "base"])]
        file: Option<PathBuf>,

        /// Read diff from stdin
        #[arg(long, conflicts_with = "base")]
        stdin: bool,

        /// Diff against this revision instead of the configured candidates
        #[arg(long)]
        base: Option<String>,
    },
    /// Create a default .covgate.toml configuration file
    #[command(long_about = "Create a default .covgate.toml configuration file.\n\n\
        Generates a commented template with every option at its default.\n\
        Fails if .covgate.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Default)]
struct CheckArgs {
    /// Minimum absolute coverage (default: 90)
    #[arg(long, value_name = "PERCENT")]
    absolute_threshold: Option<f64>,

    /// Minimum incremental coverage (default: 95)
    #[arg(long, value_name = "PERCENT")]
    incremental_threshold: Option<f64>,

    /// Diff against this revision instead of the configured candidates
    #[arg(long, conflicts_with = "diff")]
    base: Option<String>,

    /// Use an existing coverage profile instead of running tests
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Read the coverage summary from a file instead of running the summary command
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Read the diff from a file instead of asking git
    #[arg(long)]
    diff: Option<PathBuf>,

    /// Do not run the test command; read the configured profile as-is
    #[arg(long)]
    skip_tests: bool,
}

const DEFAULT_CONFIG: &str = r#"# covgate configuration

[thresholds]
# absolute = 90.0
# incremental = 95.0

[baseline]
# First candidate that resolves to a commit is diffed against.
# candidates = ["origin/main", "main", "HEAD~1"]

[profile]
# path = "coverage.out"
# Stripped from profile paths; read from go.mod when unset.
# module_prefix = "github.com/acme/app"

[commands]
# {profile} is replaced with the profile path.
# test = ["go", "test", "./...", "-coverprofile={profile}"]
# summary = ["go", "tool", "cover", "-func={profile}"]

[filter]
# Changed files matching these globs do not count toward incremental coverage.
# skip_patterns = ["*.pb.go", "mocks/**"]
"#;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "covgate=debug,info"
    } else {
        "covgate=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CovgateConfig> {
    match path {
        Some(path) => CovgateConfig::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display())),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                CovgateConfig::from_file(default_path).wrap_err(format!("loading {CONFIG_FILE}"))
            } else {
                Ok(CovgateConfig::default())
            }
        }
    }
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .into_diagnostic()
        .wrap_err("reading stdin")?;
    Ok(input)
}

fn check_threshold(name: &str, value: f64) -> Result<f64> {
    if !(0.0..=100.0).contains(&value) {
        miette::bail!("{name} must be between 0 and 100, got {value}");
    }
    Ok(value)
}

fn run_check(args: CheckArgs, mut config: CovgateConfig, format: OutputFormat) -> Result<()> {
    if let Some(value) = args.absolute_threshold {
        config.thresholds.absolute = check_threshold("--absolute-threshold", value)?;
    }
    if let Some(value) = args.incremental_threshold {
        config.thresholds.incremental = check_threshold("--incremental-threshold", value)?;
    }
    let run_tests = !args.skip_tests && args.profile.is_none();
    if let Some(profile) = args.profile {
        config.profile.path = profile;
    }

    let workdir = std::env::current_dir().into_diagnostic()?;
    let mut options = CheckOptions::new(workdir, config);
    options.run_tests = run_tests;
    options.show_progress = std::io::stderr().is_terminal();
    options.diff = match args.diff {
        Some(path) => DiffSource::File(path),
        None => DiffSource::Git { base: args.base },
    };
    if let Some(path) = args.summary {
        options.summary = SummarySource::File(path);
    }

    let outcome = covgate_check::run_check(&options)?;
    print!("{}", covgate_check::render(&outcome, format)?);

    if !outcome.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_lines(changed: &ChangedLines, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(changed).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("| File | Changed lines |");
            println!("|------|---------------|");
            for (path, lines) in changed.iter() {
                println!("| `{path}` | {} |", covgate_check::report::line_runs(lines));
            }
        }
        OutputFormat::Text => {
            if changed.is_empty() {
                println!("No changed lines.");
            }
            for (path, lines) in changed.iter() {
                println!("{path}: {}", covgate_check::report::line_runs(lines));
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(format = %cli.format, "configuration loaded");

    match cli.command {
        None => run_check(CheckArgs::default(), config, cli.format)?,
        Some(Command::Check(args)) => run_check(args, config, cli.format)?,
        Some(Command::Lines { file, stdin, base }) => {
            let source = match (file, stdin) {
                (Some(path), _) => DiffSource::File(path),
                (None, true) => DiffSource::Text(read_stdin()?),
                (None, false) => DiffSource::Git { base },
            };
            let workdir = std::env::current_dir().into_diagnostic()?;
            let change = covgate_check::load_change(&source, &workdir, &config)?;
            for skipped in &change.skipped {
                tracing::info!("skipped {} (matches {})", skipped.path, skipped.pattern);
            }
            print_lines(&change.lines, cli.format)?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "covgate", &mut std::io::stdout());
        }
    }

    Ok(())
}
