//! CLI tool for single-entry zstd archives.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;

/// Single-file zstd archive tool
#[derive(Parser)]
#[command(name = "zstarc")]
#[command(author, version, about = "Single-file zstd archive tool", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the contained file (alias: x)
    #[command(alias = "x")]
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short = 'o', long, default_value = ".")]
        output: PathBuf,
    },

    /// Compress a file into a new archive (alias: a)
    #[command(alias = "a")]
    Create {
        /// Archive file to create
        archive: PathBuf,

        /// File to compress
        file: PathBuf,

        /// Compression level (defaults to the configured level)
        #[arg(short = 'l', long)]
        level: Option<u32>,

        /// Delete the source file after packing
        #[arg(long)]
        move_file: bool,
    },

    /// Show the archive's single entry (alias: l)
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,
    },

    /// Test archive integrity (alias: t)
    #[command(alias = "t")]
    Test {
        /// Archive file to test
        archive: PathBuf,
    },

    /// Show or create the configuration file
    Config {
        /// Configuration file (defaults to zstarc.json next to the executable)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Extract { archive, output } => commands::extract(&commands::ExtractConfig {
            archive_path: &archive,
            output_dir: &output,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Create {
            archive,
            file,
            level,
            move_file,
        } => commands::create(&commands::CreateConfig {
            archive_path: &archive,
            file: &file,
            level,
            move_file,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::List { archive } => commands::list(&archive, cli.format),

        Commands::Test { archive } => commands::test(&archive, cli.format, cli.quiet),

        Commands::Config { path } => commands::config(path.as_deref(), cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
