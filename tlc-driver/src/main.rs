//! Teleidoscope Compiler Driver
//!
//! Main entry point for the Teleidoscope compiler: a command-line
//! interface over the frontend and the module backend.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tlc_codegen::{
    emit, normalize, resolve, CompileOptions, ImportSource, JsModule, LoopLowering,
    MODULE_FACTORY_NAME,
};
use tlc_frontend::Frontend;

#[derive(Parser)]
#[command(name = "tlc")]
#[command(about = "Teleidoscope to strict numeric module compiler")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Teleidoscope source file to a strict numeric module
    Compile {
        /// Input Teleidoscope source file
        input: PathBuf,

        /// Output module file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Loop lowering strategy
        #[arg(long, value_enum, default_value = "counter")]
        loop_lowering: LoopMode,

        /// Append a Node-style invocation harness to the output
        #[arg(long)]
        harness: bool,

        /// Print the parsed AST as JSON to stdout before compiling
        #[arg(long)]
        dump_ast: bool,
    },

    /// Print the token stream of a source file
    Tokens {
        /// Input Teleidoscope source file
        input: PathBuf,
    },
}

/// Command-line face of the per-module loop lowering choice
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LoopMode {
    /// Forward counter comparison
    Counter,

    /// Reverse truncating nonzero test
    Truncating,
}

impl From<LoopMode> for LoopLowering {
    fn from(mode: LoopMode) -> Self {
        match mode {
            LoopMode::Counter => LoopLowering::CounterComparison,
            LoopMode::Truncating => LoopLowering::TruncatingNonzero,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            output,
            loop_lowering,
            harness,
            dump_ast,
        } => {
            if let Err(e) = compile_file(
                &input,
                output.as_deref(),
                loop_lowering.into(),
                harness,
                dump_ast,
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Tokens { input } => {
            if let Err(e) = print_tokens(&input) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn compile_file(
    input: &Path,
    output: Option<&Path>,
    loop_lowering: LoopLowering,
    harness: bool,
    dump_ast: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(input)?;
    let program = Frontend::parse_source(&source)?;

    if dump_ast {
        println!("{}", serde_json::to_string_pretty(&program)?);
    }

    let options = CompileOptions { loop_lowering };
    let annotations = resolve::resolve_program(&program, &options)?;
    let plan = normalize::normalize_program(&program, &annotations);
    let module = emit::lower_module(&annotations, &plan);

    let mut text = module.to_string();
    if harness {
        text.push_str(&harness_snippet(&module));
    }

    match output {
        Some(path) => fs::write(path, text)?,
        None => print!("{}", text),
    }
    Ok(())
}

/// The invocation snippet a host would wrap the module in: instantiate
/// with the stdlib imports (and a stub foreign table when the module
/// pulls foreign functions), call `main`, and print the result only if
/// there is one.
fn harness_snippet(module: &JsModule) -> String {
    let mut snippet = String::from("\n");

    let instantiation = if module.uses_foreign() {
        let stubs: Vec<String> = module
            .imports
            .iter()
            .filter(|import| import.source == ImportSource::Foreign)
            .map(|import| format!("  {}: function () {{ return 0; }}", import.name))
            .collect();
        snippet.push_str("var foreign = {\n");
        snippet.push_str(&stubs.join(",\n"));
        snippet.push_str("\n};\n\n");
        format!(
            "var v = {}({{ Infinity: Infinity, NaN: NaN, Math: Math }}, foreign).main();\n",
            MODULE_FACTORY_NAME
        )
    } else {
        format!(
            "var v = {}({{ Infinity: Infinity, NaN: NaN, Math: Math }}).main();\n",
            MODULE_FACTORY_NAME
        )
    };

    snippet.push_str(&instantiation);
    snippet.push_str("if (v !== undefined) {\n  console.log(v);\n}\n");
    snippet
}

fn print_tokens(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(input)?;
    for token in Frontend::tokenize_source(&source)? {
        println!("{}", token);
    }
    Ok(())
}
