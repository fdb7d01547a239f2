use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "dasm", about = "Assembler, VM and disassembler for DASM bytecode")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Raise the tracing filter level; repeatable (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Structured vs. human-readable log output.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assemble textual mnemonics into a binary bytecode container.
    Assemble {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Load and execute a bytecode container.
    Run {
        input: PathBuf,

        /// Predeclares a named frame for LOAD_FRAME: NAME=PATH.csv or PATH.json.
        #[arg(long = "frame", value_name = "NAME=PATH")]
        frames: Vec<String>,

        #[arg(long)]
        max_steps: Option<u64>,

        #[arg(long)]
        memory_limit: Option<u64>,

        /// Allowed path prefix for sandboxed file access; repeatable.
        #[arg(long = "sandbox", value_name = "DIR")]
        sandbox: Vec<String>,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the post-execution Stats block to stderr.
        #[arg(long)]
        stats: bool,
    },

    /// Print the disassembly of a bytecode container.
    Disasm { input: PathBuf },

    /// Run the optimizer pipeline and re-serialize.
    Optimize {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}
