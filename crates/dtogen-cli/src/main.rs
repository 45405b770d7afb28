//! `dtogen` command line.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dtogen::input::merge_into;
use dtogen::{
    FsEmitter, GeneratorConfig, NamespaceScope, SchemaGraph, TargetLanguage, analyze,
    available_languages, generate, load_path,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "dtogen.toml";

#[derive(Parser)]
#[command(
    name = "dtogen",
    version,
    about = "Generate DTO source files from OpenAPI and JSON Schema"
)]
struct Cli {
    /// Log pipeline stages (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one source file per type and target language
    Generate(GenerateArgs),
    /// Load, resolve and validate schemas without rendering
    Check {
        #[command(flatten)]
        input: InputArgs,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the target languages compiled into this binary
    Languages,
}

#[derive(Args)]
struct InputArgs {
    /// Schema files or directories, optionally scoped: `customer.profile@v1=profile.yaml`
    #[arg(required = true, value_name = "[SCOPE=]INPUT")]
    inputs: Vec<ScopedInput>,

    /// Configuration file (TOML); defaults to ./dtogen.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Target languages, comma separated (overrides the config file)
    #[arg(short, long, value_delimiter = ',')]
    lang: Vec<TargetLanguage>,

    /// Output directory
    #[arg(short, long, default_value = "generated")]
    out: PathBuf,

    /// Root package (overrides the config file)
    #[arg(long)]
    package: Option<String>,

    /// Generate Java classes and plain Kotlin data classes instead of records
    #[arg(long)]
    classes: bool,

    /// List the files that would be written without writing them
    #[arg(long)]
    dry_run: bool,
}

/// An input path and the scope its types are declared in.
#[derive(Debug, Clone, PartialEq)]
struct ScopedInput {
    scope: NamespaceScope,
    path: PathBuf,
}

impl FromStr for ScopedInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scope, path) = match s.split_once('=') {
            Some((scope, path)) if !scope.contains(['/', '\\']) => {
                (NamespaceScope::parse(scope), path)
            }
            _ => (NamespaceScope::root(), s),
        };
        if path.is_empty() {
            return Err(format!("missing input path in '{}'", s));
        }
        Ok(Self {
            scope,
            path: PathBuf::from(path),
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Generate(args) => run_generate(&args),
        Command::Check { input, json } => run_check(&input, json),
        Command::Languages => {
            for language in available_languages() {
                println!("{}", language);
            }
            Ok(ExitCode::SUCCESS)
        }
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_graph(inputs: &[ScopedInput]) -> Result<SchemaGraph> {
    let mut graph = SchemaGraph::new();
    for input in inputs {
        let loaded = load_path(&input.path, &input.scope)
            .with_context(|| format!("failed to load {}", input.path.display()))?;
        merge_into(&mut graph, loaded)
            .with_context(|| format!("while merging {}", input.path.display()))?;
    }
    tracing::info!(inputs = inputs.len(), types = graph.len(), "schemas loaded");
    Ok(graph)
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).is_file() => Path::new(DEFAULT_CONFIG),
        None => return Ok(GeneratorConfig::default()),
    };
    GeneratorConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
}

fn run_generate(args: &GenerateArgs) -> Result<ExitCode> {
    let graph = load_graph(&args.input.inputs)?;
    let mut config = load_config(args.input.config.as_deref())?;
    if !args.lang.is_empty() {
        config.targets = args.lang.clone();
    }
    if let Some(package) = &args.package {
        config.root_package = package.clone();
    }
    if args.classes {
        config.records = false;
    }

    let generation = generate(&graph, &config)?;

    if args.dry_run {
        for unit in &generation.units {
            println!("{}", args.out.join(&unit.path).display());
        }
    } else {
        let mut emitter = FsEmitter::new(&args.out);
        generation.emit(&mut emitter)?;
        eprintln!(
            "Generated {} files in {}",
            emitter.written().len(),
            args.out.display()
        );
    }

    if generation.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "error: {} units could not be rendered, {} languages are not in this build",
            generation.failures.len(),
            generation.missing_languages.len()
        );
        Ok(ExitCode::FAILURE)
    }
}

fn run_check(input: &InputArgs, json: bool) -> Result<ExitCode> {
    let graph = load_graph(&input.inputs)?;
    let config = load_config(input.config.as_deref())?;
    let analysis = analyze(&graph, &config)?;

    let renderable = analysis.names.len();
    let aliases = analysis.tree.len() - renderable;
    if json {
        let summary = serde_json::json!({
            "types": analysis.tree.len(),
            "renderable": renderable,
            "aliases": aliases,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} types OK ({} to render, {} inlined aliases)",
            analysis.tree.len(),
            renderable,
            aliases
        );
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const API: &str = "openapi: 3.0.3\ncomponents:\n  schemas:\n    StatusV1:\n      type: string\n      enum: [OPEN, CLOSED]\n";

    #[test]
    fn scoped_inputs() {
        let input: ScopedInput = "customer.profile@v1=specs/profile.yaml".parse().unwrap();
        assert_eq!(input.scope, NamespaceScope::parse("customer.profile@v1"));
        assert_eq!(input.path, PathBuf::from("specs/profile.yaml"));

        let plain: ScopedInput = "specs/a=b.yaml".parse().unwrap();
        assert!(plain.scope.is_root());
        assert_eq!(plain.path, PathBuf::from("specs/a=b.yaml"));

        assert!("order=".parse::<ScopedInput>().is_err());
    }

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "dtogen", "generate", "order=api.yaml", "--lang", "java,ts", "--out", "gen",
        ])
        .unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.lang, vec![TargetLanguage::Java, TargetLanguage::TypeScript]);
        assert_eq!(args.out, PathBuf::from("gen"));
        assert!(!args.classes);
    }

    #[test]
    fn classes_flag_disables_records() {
        let dir = tempfile::tempdir().unwrap();
        let api = dir.path().join("api.yaml");
        fs::write(
            &api,
            "openapi: 3.0.3\ncomponents:\n  schemas:\n    NoteV1:\n      type: object\n      properties:\n        text:\n          type: string\n",
        )
        .unwrap();
        let out = dir.path().join("out");

        let cli = Cli::try_parse_from([
            "dtogen",
            "generate",
            &format!("note={}", api.display()),
            "--classes",
            "--out",
            &out.display().to_string(),
        ])
        .unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert!(args.classes);
        assert_eq!(run_generate(&args).unwrap(), ExitCode::SUCCESS);
        let source = fs::read_to_string(out.join("model/note/NoteV1Dto.java")).unwrap();
        assert!(source.contains("public class NoteV1Dto {"));
        assert!(!source.contains("record"));
    }

    #[test]
    fn generate_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let api = dir.path().join("api.yaml");
        fs::write(&api, API).unwrap();
        let out = dir.path().join("out");

        let args = GenerateArgs {
            input: InputArgs {
                inputs: vec![format!("order={}", api.display()).parse().unwrap()],
                config: None,
            },
            lang: vec![TargetLanguage::Kotlin],
            out: out.clone(),
            package: Some("com.acme".into()),
            classes: false,
            dry_run: false,
        };
        assert_eq!(run_generate(&args).unwrap(), ExitCode::SUCCESS);
        assert!(out.join("com/acme/order/StatusV1Dto.kt").is_file());
    }
}
