//! Text front end
//!
//! Drives the send/read menu over any line-oriented input and output, so the
//! same code serves the terminal and the tests. Secrets are always requested
//! through a `PassphraseReader`, never read from the menu input.

use crate::config::Config;
use crate::error::{ErrorCategory, ErrorKind, Result, WhisperError};
use crate::passphrase::PassphraseReader;
use crate::secretcrypt::Codec;
use crate::store::{MessageId, MessageStore, StoredMessage};
use chrono::Utc;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

/// Shown for every failed decryption, whatever the cause.
pub const UNREADABLE_NOTICE: &str = "Could not read message: wrong key or corrupted message.";

/// Check the text against the length policy, seal it, and store it.
pub fn send_message(
    store: &dyn MessageStore,
    config: &Config,
    sender: &str,
    recipient: &str,
    text: &str,
    passphrase: &str,
) -> Result<MessageId> {
    config.check_message(text)?;
    let envelope = Codec::new(config.kdf).encrypt(text, passphrase)?;
    let id = store.put(sender, recipient, &envelope, Utc::now())?;
    info!(%id, sender, recipient, "message sent");
    Ok(id)
}

/// Open a stored message and mark it read. The message stays unread if it
/// cannot be decrypted.
pub fn read_message(
    store: &dyn MessageStore,
    config: &Config,
    message: &StoredMessage,
    passphrase: &str,
) -> Result<String> {
    let text = Codec::new(config.kdf)
        .decrypt(message.envelope.as_bytes(), passphrase)
        .inspect_err(|e| debug!(id = %message.id, kind = ?e.kind, "decryption failed"))?;
    store.mark_read(message.id)?;
    info!(id = %message.id, "message read");
    Ok(text)
}

enum Flow {
    Continue,
    Quit,
}

/// Interactive menu loop.
pub struct Console<'a, R, W> {
    store: &'a dyn MessageStore,
    config: &'a Config,
    secrets: &'a mut dyn PassphraseReader,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub fn new(
        store: &'a dyn MessageStore,
        config: &'a Config,
        secrets: &'a mut dyn PassphraseReader,
        input: R,
        output: W,
    ) -> Self {
        Self {
            store,
            config,
            secrets,
            input,
            output,
        }
    }

    /// Run until the user quits or input ends.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.say("")?;
            self.say("--- whisperbox ---")?;
            self.say("1 - Send a message")?;
            self.say("2 - Read new messages")?;
            self.say("0 - Quit")?;
            let Some(choice) = self.prompt("Choose: ")? else {
                return Ok(());
            };

            let flow = match choice.as_str() {
                "1" => self.send()?,
                "2" => self.read()?,
                "0" => Flow::Quit,
                _ => {
                    self.say("Invalid option.")?;
                    Flow::Continue
                }
            };
            if let Flow::Quit = flow {
                return Ok(());
            }
        }
    }

    fn send(&mut self) -> Result<Flow> {
        let Some(sender) = self.prompt_handle("Your handle: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(recipient) = self.prompt_handle("Recipient handle: ")? else {
            return Ok(Flow::Quit);
        };
        let label = format!(
            "Message ({}-{} characters): ",
            self.config.message_chars.start(),
            self.config.message_chars.end()
        );
        let Some(text) = self.prompt(&label)? else {
            return Ok(Flow::Quit);
        };

        // Reject before asking for the secret, so nothing is derived for text
        // that would be thrown away.
        if let Err(e) = self.config.check_message(&text) {
            self.say(&format!("Invalid length: {}.", e.message()))?;
            return Ok(Flow::Continue);
        }

        let passphrase = self.secrets.read_passphrase()?;
        send_message(
            self.store,
            self.config,
            &sender,
            &recipient,
            &text,
            &passphrase,
        )?;
        self.say(&format!("Message sealed and sent to {}.", recipient))?;
        Ok(Flow::Continue)
    }

    fn read(&mut self) -> Result<Flow> {
        let Some(recipient) = self.prompt_handle("Your handle: ")? else {
            return Ok(Flow::Quit);
        };

        let unread = self.store.list_unread(&recipient)?;
        if unread.is_empty() {
            self.say("No new messages.")?;
            return Ok(Flow::Continue);
        }

        for (i, message) in unread.iter().enumerate() {
            self.say(&format!(
                "{}. From: {} ({})",
                i + 1,
                message.sender,
                message.sent_at.format("%Y-%m-%d %H:%M UTC")
            ))?;
        }

        let Some(selection) = self.prompt("Choose a message: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(message) = selection
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| unread.get(i))
        else {
            self.say("Invalid selection.")?;
            return Ok(Flow::Continue);
        };

        let passphrase = self.secrets.read_passphrase()?;
        match read_message(self.store, self.config, message, &passphrase) {
            Ok(text) => {
                self.say("")?;
                self.say(&format!("From: {}", message.sender))?;
                self.say(&text)?;
            }
            Err(e) if is_unreadable(&e) => {
                warn!(id = %message.id, "message could not be decrypted");
                self.say(UNREADABLE_NOTICE)?;
            }
            Err(e) => return Err(e),
        }
        Ok(Flow::Continue)
    }

    /// Prompt for a handle, re-asking while the answer is blank.
    fn prompt_handle(&mut self, label: &str) -> Result<Option<String>> {
        loop {
            match self.prompt(label)? {
                Some(handle) if handle.trim().is_empty() => {
                    self.say("Handle must not be empty.")?;
                }
                Some(handle) => return Ok(Some(handle.trim().to_owned())),
                None => return Ok(None),
            }
        }
    }

    /// Print a label and read one line. `None` means input ended.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}", label).map_err(io_error)?;
        self.output.flush().map_err(io_error)?;

        let mut line = String::new();
        let n = self.input.read_line(&mut line).map_err(io_error)?;
        if n == 0 {
            self.say("")?;
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line).map_err(io_error)
    }
}

/// Failures that mean "this envelope will not open with this passphrase".
pub fn is_unreadable(err: &WhisperError) -> bool {
    matches!(
        err.kind,
        Some(ErrorKind::AuthenticationFailed)
            | Some(ErrorKind::MalformedEnvelope)
            | Some(ErrorKind::PlaintextEncoding)
    )
}

fn io_error(e: std::io::Error) -> WhisperError {
    WhisperError::with_kind_and_source(
        ErrorCategory::Internal,
        ErrorKind::Io,
        format!("terminal I/O failed: {}", e),
        e,
    )
}
