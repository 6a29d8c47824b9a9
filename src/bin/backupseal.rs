//! Backupseal CLI - Password-based backup encryption
//!
//! Command-line interface for encrypting, decrypting and inspecting backup
//! files using AES-256-GCM with PBKDF2-HMAC-SHA256 key derivation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use backupseal::file_ops;
use backupseal::passphrase::{
    CachingPassphraseReader, PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader,
};

#[derive(Parser)]
#[command(name = "backupseal")]
#[command(version)]
#[command(about = "Password-based backup encryption.", long_about = None)]
struct Cli {
    /// Read passphrase from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the encrypted text to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file whose contents is to be decrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the unencrypted text to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Update an encrypted file with new content, while validating
    /// that the passphrase is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing encrypted file to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Check whether the passphrase opens an encrypted file
    Check {
        /// Path to the encrypted file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Report whether a backup file is encrypted, plain JSON, or unknown
    Detect {
        /// Path to the backup file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Encrypt a plain JSON backup, marking its metadata as encrypted
    Export {
        /// Path to the plain JSON backup
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the encrypted backup to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print the version, export date and record counts of a backup
    Summary {
        /// Path to the backup file, encrypted or plain
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Write the JSON of a backup, decrypting it first if needed
    Open {
        /// Path to the backup file, encrypted or plain
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the JSON to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Encrypt { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::encrypt_file(&input, &output, &mut *reader)?;
        }
        Commands::Decrypt { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::decrypt_file(&input, &output, &mut *reader)?;
        }
        Commands::Update { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::update_file(&input, &output, &mut *reader)?;
        }
        Commands::Check { input } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            if !file_ops::check_file(&input, &mut *reader)? {
                eprintln!("passphrase does not open {}", input.display());
                process::exit(1);
            }
            println!("ok");
        }
        Commands::Detect { input } => {
            println!("{}", file_ops::detect_file(&input)?.as_str());
        }
        Commands::Export { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::export_file(&input, &output, &mut *reader)?;
        }
        Commands::Summary { input } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            println!("{}", file_ops::summarize_file(&input, &mut *reader)?);
        }
        Commands::Open { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::open_backup_file(&input, &output, &mut *reader)?;
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "backupseal=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    let upstream: Box<dyn PassphraseReader> = if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader::new())
    };
    // stdin can only be drained once per process.
    Box::new(CachingPassphraseReader::new(upstream))
}
