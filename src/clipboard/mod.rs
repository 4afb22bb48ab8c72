use std::io::{self, Write};
use std::process::{Command, Stdio};

use thiserror::Error;

const WL_COPY_COMMAND: &str = "wl-copy";
const MIME_TEXT_PLAIN_UTF8: &str = "text/plain;charset=utf-8";

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("failed to run wl-copy command: {command}")]
    CommandIo {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write clipboard payload to {command}")]
    WritePayload {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("wl-copy exited with non-zero status: {status}")]
    CommandFailed { status: String },
}

pub type ClipboardResult<T> = std::result::Result<T, ClipboardError>;

pub trait ClipboardBackend {
    fn copy_text(&self, text: &str) -> ClipboardResult<()>;
}

/// Wayland clipboard through the `wl-copy` helper.
#[derive(Debug, Default)]
pub struct WlCopyBackend;

fn wl_copy_command() -> Command {
    let mut command = Command::new(WL_COPY_COMMAND);
    command
        .arg("--type")
        .arg(MIME_TEXT_PLAIN_UTF8)
        .stdin(Stdio::piped())
        .stdout(Stdio::null());
    command
}

impl ClipboardBackend for WlCopyBackend {
    fn copy_text(&self, text: &str) -> ClipboardResult<()> {
        let mut child = wl_copy_command()
            .spawn()
            .map_err(|err| ClipboardError::CommandIo {
                command: WL_COPY_COMMAND.to_string(),
                source: err,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|err| ClipboardError::WritePayload {
                    command: WL_COPY_COMMAND.to_string(),
                    source: err,
                })?;
        }

        let status = child.wait().map_err(|err| ClipboardError::CommandIo {
            command: WL_COPY_COMMAND.to_string(),
            source: err,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::CommandFailed {
                status: status.to_string(),
            })
        }
    }
}
