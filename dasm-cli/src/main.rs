mod cli;
mod config;
mod error;
mod frame_loader;

use std::collections::HashMap;
use std::path::Path;

use clap::Parser;
use tracing::info;

use cli::{Cli, Command, LogFormat};
use config::RunConfig;
use error::CliError;
use frame_loader::CliFrameLoader;

use dasm_core::series::ColumnData;
use dasm_core::vm::{ReturnValue, Vm};
use dasm_core::{Frame, Program};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    if let Err(err) = run(cli.command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, format: LogFormat) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("dasm={level}")));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Assemble { input, output } => {
            let source = std::fs::read_to_string(&input)?;
            let program = dasm_asm::assemble(&source)?;
            dasm_bc::write_file(&output, &program)?;
            info!(path = %output.display(), "wrote bytecode container");
            Ok(())
        }

        Command::Run { input, frames, max_steps, memory_limit, sandbox, config, stats } => {
            let program = dasm_bc::read_file(&input)?;
            let run_config = config.map(|p| RunConfig::load(&p)).transpose()?.unwrap_or_default();
            let run_config = run_config.merge_with_flags(max_steps, memory_limit, sandbox);

            let predeclared = load_predeclared_frames(&frames)?;

            let mut vm = Vm::new();
            vm.set_predeclared_frames(predeclared);
            vm.set_loader(Box::new(CliFrameLoader));
            if let Some(n) = run_config.max_steps {
                vm.set_max_steps(n);
            }
            if let Some(n) = run_config.memory_limit {
                vm.set_memory_limit(n);
            }
            if !run_config.sandbox.is_empty() {
                vm.set_sandbox(true, run_config.sandbox.clone());
            }
            if stats {
                vm.enable_stats();
            }

            vm.load(program);
            let result = vm.execute()?;
            print_return_value(&result);

            if stats {
                if let Some(stats) = vm.stats() {
                    eprintln!("steps={} elapsed={:?}", stats.steps, stats.elapsed);
                }
            }
            Ok(())
        }

        Command::Disasm { input } => {
            let program = dasm_bc::read_file(&input)?;
            print!("{}", dasm_asm::disassemble(&program));
            Ok(())
        }

        Command::Optimize { input, output } => {
            let program = dasm_bc::read_file(&input)?;
            let optimized = dasm_core::optimize(&program);
            dasm_bc::write_file(&output, &optimized)?;
            Ok(())
        }
    }
}

fn load_predeclared_frames(specs: &[String]) -> Result<HashMap<String, Frame>, CliError> {
    let loader = CliFrameLoader;
    let mut frames = HashMap::new();
    for spec in specs {
        let (name, path) =
            spec.split_once('=').ok_or_else(|| CliError::BadFrameArg(spec.clone()))?;
        let frame = load_frame_by_extension(&loader, path)?;
        frames.insert(name.to_owned(), frame);
    }
    Ok(frames)
}

fn load_frame_by_extension(loader: &CliFrameLoader, path: &str) -> Result<Frame, CliError> {
    use dasm_core::loader::FrameLoader;
    let is_json = Path::new(path).extension().and_then(|e| e.to_str()) == Some("json");
    let frame = if is_json { loader.load_json(path)? } else { loader.load_csv(path)? };
    Ok(frame)
}

fn print_return_value(value: &ReturnValue) {
    match value {
        ReturnValue::Int(v) => println!("{v}"),
        ReturnValue::Float(v) => println!("{v}"),
        ReturnValue::Column(column) => {
            println!("{}", column.name());
            for i in 0..column.length() {
                if column.is_null(i) {
                    println!("null");
                    continue;
                }
                match column.data() {
                    ColumnData::Int64(_) => println!("{}", column.get_i64(i).unwrap()),
                    ColumnData::Float64(_) => println!("{}", column.get_f64(i).unwrap()),
                    ColumnData::Bool(_) => println!("{}", column.get_bool(i).unwrap()),
                    ColumnData::Str(_) => println!("{}", column.get_str(i).unwrap()),
                }
            }
        }
    }
}
