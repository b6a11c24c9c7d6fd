use anyhow::Context;
use clap::{ArgAction, Parser};
use clap_stdin::FileOrStdin;
use tracing::Level;

use jitcc::codegen::Options;
use jitcc::engine::OptLevel;

#[derive(Parser, Debug)]
#[command(version, about = "JIT-compile and run a small imperative language")]
struct Args {
    /// Source file, or `-` for stdin
    #[arg(default_value = "-")]
    input: FileOrStdin,

    /// Print the parsed program back as source
    #[arg(long)]
    print_ast: bool,

    /// Print the IR of every function
    #[arg(long)]
    emit_ir: bool,

    /// Stop after code generation
    #[arg(long)]
    no_run: bool,

    /// Function called to run the program
    #[arg(long, default_value = "main")]
    entry: String,

    #[arg(short = 'O', long = "opt-level", value_enum, default_value_t = OptLevel::None)]
    opt_level: OptLevel,

    /// Raise the log level, may be repeated
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(args.verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let source = args.input.contents().context("failed to read input")?;
    let comp_unit = jitcc::parse(&source).context("failed to parse input")?;
    if args.print_ast {
        print!("{comp_unit}");
    }

    let options = Options {
        entry: args.entry,
        opt_level: args.opt_level,
        capture_ir: args.emit_ir,
    };
    let mut program =
        jitcc::compile_unit(&comp_unit, &options).context("code generation failed")?;
    for function in program.ir() {
        println!("{function}");
    }

    if !args.no_run {
        let value = program
            .run()
            .with_context(|| format!("failed to run `{}`", options.entry))?;
        println!("{value}");
    }
    Ok(())
}
