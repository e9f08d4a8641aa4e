//! Errors the gesture core propagates to its caller.
//!
//! Configuration gaps and declined confirmations are not errors; they resolve to a
//! no-op before ever reaching this type.

/// A dispatch that failed after the gesture was recognized.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The command surface rejected or failed to perform the command.
    #[error("Command '{command}' failed: {source:#}")]
    Surface {
        command: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A confirmation or text prompt could not be shown or answered.
    #[error("Prompt failed: {0:#}")]
    Prompt(#[source] anyhow::Error),
}

impl DispatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Surface { .. } => "surface",
            Self::Prompt(_) => "prompt",
        }
    }
}
