//! whisperbox CLI - passphrase-sealed person-to-person messages
//!
//! Messages are kept in a local SQLite database as envelopes sealed with
//! NaCl secretbox (XSalsa20Poly1305) under a PBKDF2-stretched passphrase.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process;

use whisperbox::config::{Config, DEFAULT_DB_PATH};
use whisperbox::error::{ErrorCategory, ErrorKind, Result, WhisperError};
use whisperbox::frontend::{self, Console, UNREADABLE_NOTICE};
use whisperbox::logging;
use whisperbox::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};
use whisperbox::store::{MessageStore, SqliteStore};

#[derive(Parser)]
#[command(name = "whisperbox")]
#[command(version)]
#[command(about = "Person-to-person messages sealed with a shared secret key.", long_about = None)]
struct Cli {
    /// Path to the message database
    #[arg(long, global = true, value_name = "FILE", env = "WHISPERBOX_DB", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Read the secret key from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu for sending and reading messages (the default)
    Chat,

    /// Seal the contents of a file and send it
    #[command(alias = "s")]
    Send {
        /// Sender handle, e.g. @alice
        #[arg(short, long)]
        from: String,

        /// Recipient handle, e.g. @bob
        #[arg(short, long)]
        to: String,

        /// Path to the file holding the message text
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },

    /// List unread messages without opening them
    #[command(alias = "ls")]
    Inbox {
        /// Handle whose unread messages to list
        #[arg(short, long)]
        user: String,
    },

    /// Open an unread message and mark it read
    #[command(alias = "r")]
    Read {
        /// Handle whose message to open
        #[arg(short, long)]
        user: String,

        /// Position in the inbox listing, starting at 1 (newest)
        #[arg(short = 'n', long, default_value_t = 1)]
        index: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", describe(&e));
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Chat);
    if matches!(command, Commands::Chat) && cli.passphrase_stdin {
        return Err(WhisperError::with_kind(
            ErrorCategory::User,
            ErrorKind::PassphraseUnavailable,
            "chat reads its menu from stdin; secret keys must come from the terminal",
        ));
    }

    let config = Config::with_db_path(cli.db);
    let store = SqliteStore::open(&config.db_path)?;

    match command {
        Commands::Chat => {
            let mut secrets = TerminalPassphraseReader::new();
            let stdin = io::stdin();
            Console::new(&store, &config, &mut secrets, stdin.lock(), io::stdout()).run()
        }
        Commands::Send { from, to, input } => {
            let text = std::fs::read_to_string(&input).map_err(|e| {
                let category = if e.kind() == io::ErrorKind::NotFound {
                    ErrorCategory::User
                } else {
                    ErrorCategory::Internal
                };
                WhisperError::with_kind_and_source(
                    category,
                    ErrorKind::Io,
                    format!("failed to read from {}", input.display()),
                    e,
                )
            })?;
            let text = text
                .strip_suffix('\n')
                .map(|t| t.strip_suffix('\r').unwrap_or(t))
                .unwrap_or(&text);
            config.check_message(text)?;
            let passphrase = get_passphrase_reader(cli.passphrase_stdin).read_passphrase()?;
            frontend::send_message(&store, &config, &from, &to, text, &passphrase)?;
            println!("Message sealed and sent to {}.", to);
            Ok(())
        }
        Commands::Inbox { user } => {
            let unread = store.list_unread(&user)?;
            if unread.is_empty() {
                println!("No new messages.");
            }
            for (i, message) in unread.iter().enumerate() {
                println!(
                    "{}. From: {} ({})",
                    i + 1,
                    message.sender,
                    message.sent_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            Ok(())
        }
        Commands::Read { user, index } => {
            let unread = store.list_unread(&user)?;
            let message = index
                .checked_sub(1)
                .and_then(|i| unread.get(i))
                .ok_or_else(|| {
                    WhisperError::with_kind(
                        ErrorCategory::User,
                        ErrorKind::UnknownMessage,
                        format!("{} has no unread message number {}", user, index),
                    )
                })?;
            let passphrase = get_passphrase_reader(cli.passphrase_stdin).read_passphrase()?;
            let text = frontend::read_message(&store, &config, message, &passphrase)?;
            println!("From: {}", message.sender);
            println!("{}", text);
            Ok(())
        }
    }
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader::new())
    }
}

/// Decrypt failures all look the same to the user; everything else gets its
/// message and cause chain.
fn describe(err: &WhisperError) -> String {
    if frontend::is_unreadable(err) {
        return UNREADABLE_NOTICE.to_owned();
    }
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
