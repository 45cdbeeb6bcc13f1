use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::deps::DependencyGate;

/// Clipboard writers tried in order; each reads the text on stdin.
const WRITERS: [(&str, &[&str]); 5] = [
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip.exe", &[]),
];

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("no clipboard utility found (tried pbcopy, wl-copy, xclip, xsel, clip.exe)")]
    Unavailable,

    #[error("`{tool}` failed: {reason}")]
    Failed { tool: String, reason: String },
}

pub fn copy(gate: &DependencyGate, text: &str) -> Result<&'static str, ClipboardError> {
    let (tool, args, program) = WRITERS
        .iter()
        .find_map(|(tool, args)| gate.find(tool).map(|program| (*tool, *args, program)))
        .ok_or(ClipboardError::Unavailable)?;
    debug!(tool, program = %program.display(), "copying summary to clipboard");

    let failed = |reason: String| ClipboardError::Failed {
        tool: tool.to_string(),
        reason,
    };
    let mut child = Command::new(&program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| failed(e.to_string()))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| failed(e.to_string()))?;
    }
    let status = child.wait().map_err(|e| failed(e.to_string()))?;
    if !status.success() {
        return Err(failed(status.to_string()));
    }
    Ok(tool)
}
