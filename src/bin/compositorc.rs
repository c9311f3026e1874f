//! Command-line interface for the compositor script compiler
//!
//! Usage:
//!   compositorc compile `<path>`... [--format summary|json] [--group `<name>`] [--config `<file>`]
//!   compositorc grammar                                  - Print the compositor grammar
//!   compositorc keywords                                 - Print the keyword table
//!
//! Script errors are logged to stderr as warnings. Set `RUST_LOG` to change the level.

use clap::{Arg, ArgAction, ArgMatches, Command};
use compositor_script::script::config::{CompilerConfig, Loader};
use compositor_script::script::registry::CompositorRegistry;
use compositor_script::script::{CompositorScriptCompiler, LogSink, ScriptSource};
use std::process::ExitCode;
use std::str::FromStr;

fn main() -> ExitCode {
    let matches = Command::new("compositorc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compile compositor scripts")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("Log at debug level unless RUST_LOG says otherwise")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("TOML file layered over the built-in defaults"),
        )
        .arg(
            Arg::new("case-sensitive")
                .long("case-sensitive")
                .global(true)
                .help("Match keywords case-sensitively")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("compile")
                .about("Compile scripts into one registry and print it")
                .arg(
                    Arg::new("paths")
                        .help("Compositor script files")
                        .required(true)
                        .num_args(1..),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["summary", "json"])
                        .default_value("summary"),
                )
                .arg(
                    Arg::new("group")
                        .long("group")
                        .short('g')
                        .help("Resource group for created compositors"),
                ),
        )
        .subcommand(Command::new("grammar").about("Print the compositor grammar"))
        .subcommand(Command::new("keywords").about("Print the keyword table"))
        .get_matches();

    init_logging(matches.get_flag("verbose"));

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let compiler = match CompositorScriptCompiler::with_config(&config) {
        Ok(compiler) => compiler,
        Err(err) => {
            eprintln!("Compiler setup failed: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match matches.subcommand() {
        Some(("compile", sub)) => handle_compile_command(&compiler, &config, sub),
        Some(("grammar", _)) => {
            println!("{}", compiler.language().grammar());
            ExitCode::SUCCESS
        }
        Some(("keywords", _)) => {
            handle_keywords_command(&compiler);
            ExitCode::SUCCESS
        }
        _ => ExitCode::FAILURE,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "DEBUG" } else { "WARN" };
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| default.to_owned());
    let level = log::LevelFilter::from_str(&level).unwrap_or(log::LevelFilter::Warn);

    let result = simplelog::TermLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_time_format_custom(&[])
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Never,
    );
    if let Err(err) = result {
        eprintln!("Logger setup failed: {}", err);
    }
}

fn load_config(matches: &ArgMatches) -> Result<CompilerConfig, config::ConfigError> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    if matches.get_flag("case-sensitive") {
        loader = loader.set_override("compiler.case_sensitive", true)?;
    }
    if let Some(("compile", sub)) = matches.subcommand() {
        if let Some(group) = sub.get_one::<String>("group") {
            loader = loader.set_override("compiler.resource_group", group.as_str())?;
        }
    }
    loader.build()
}

/// Compile every path into one registry. Fails when a file cannot be read or a
/// compile fails hard; script errors only produce warnings.
fn handle_compile_command(
    compiler: &CompositorScriptCompiler,
    config: &CompilerConfig,
    matches: &ArgMatches,
) -> ExitCode {
    let mut registry = CompositorRegistry::with_defaults(config.defaults.clone());
    let mut sink = LogSink;
    let mut failed = false;

    for path in matches.get_many::<String>("paths").into_iter().flatten() {
        let source = match ScriptSource::from_path(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Cannot read {}: {}", path, err);
                failed = true;
                continue;
            }
        };
        match compiler.compile(&source, &mut registry, &mut sink) {
            Ok(summary) => log::info!(
                "{}: {} statements, {} errors",
                path,
                summary.statements,
                summary.errors
            ),
            Err(err) => {
                eprintln!("{}: {}", path, err);
                failed = true;
            }
        }
    }

    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("summary");
    match format {
        "json" => match serde_json::to_string_pretty(&registry) {
            Ok(json) => println!("{}", json),
            Err(err) => {
                eprintln!("Error formatting registry: {}", err);
                failed = true;
            }
        },
        _ => print!("{}", render_summary(&registry)),
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn render_summary(registry: &CompositorRegistry) -> String {
    let mut out = String::new();
    for compositor in registry.compositors() {
        out.push_str(&format!(
            "compositor {} [{}]\n",
            compositor.name, compositor.group
        ));
        for (index, technique) in compositor.techniques.iter().enumerate() {
            out.push_str(&format!(
                "  technique {}: {} textures, {} targets\n",
                index,
                technique.textures.len(),
                technique.targets.len()
            ));
            for texture in &technique.textures {
                out.push_str(&format!(
                    "    texture {} {}x{} {:?}\n",
                    texture.name, texture.width, texture.height, texture.format
                ));
            }
            let targets = technique
                .targets
                .iter()
                .chain(std::iter::once(&technique.output));
            for target in targets {
                let name = target.output_name.as_deref().unwrap_or("<output>");
                out.push_str(&format!("    target {} input={:?}\n", name, target.input_mode));
                for pass in &target.passes {
                    out.push_str(&format!(
                        "      pass {:?} material={}\n",
                        pass.pass_type,
                        pass.material.as_deref().unwrap_or("-")
                    ));
                }
            }
        }
    }
    out
}

fn handle_keywords_command(compiler: &CompositorScriptCompiler) {
    println!("{:<20} {:>5}  action", "lexeme", "id");
    for entry in compiler.language().lexemes().entries() {
        let action = entry
            .action
            .map(|a| format!("{:?}", a))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<20} {:>5}  {}", entry.text, entry.token, action);
    }
}
