//! Stdin input source.
//!
//! Reads NDJSON input lines from standard input.
//!
//! Behavior:
//! - Each line is parsed with [`parse_line`]; blank lines and `#` comments are skipped.
//! - Malformed lines are logged with `warn!` and ignored; reading continues.
//! - `after_ms` delays the line before it is forwarded, so a piped script can pace itself.
//! - End Of File or a closed channel terminates the task gracefully.
//!
//! Example:
//!     echo '{"type":"pointer","element":"ok","event":{"kind":"down","x":0,"y":0}}' | remotekit -c remote.json

use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::mpsc::Sender,
    task::JoinHandle,
};
use tracing::{info, trace, warn};

use super::{InputLine, InputSource, deliver, parse_line};

/// Source that reads NDJSON input lines from stdin.
#[derive(Debug, Clone, Default)]
pub struct StdinSource;

impl StdinSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl InputSource for StdinSource {
    fn name(&self) -> &'static str {
        "stdin"
    }

    fn start(&self, sender: Sender<InputLine>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(target: "remotekit::sources", "StdinSource task started (reading lines)");
            pump(BufReader::new(io::stdin()), &sender, "stdin").await;
            trace!(target: "remotekit::sources", "StdinSource task ended");
        })
    }
}

/// Forward every parsable line of `reader` until EOF, a read error or a closed channel.
pub(crate) async fn pump<R>(mut reader: R, sender: &Sender<InputLine>, origin: &str) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let mut forwarded = 0;
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!(target: "remotekit::sources", origin, forwarded, "EOF; source exiting");
                break;
            }
            Ok(_) => {
                let Some(timed) = parse_line(&line) else {
                    continue;
                };
                if !deliver(sender, timed).await {
                    warn!(
                        target: "remotekit::sources",
                        origin,
                        "Channel closed while sending input line; terminating task"
                    );
                    break;
                }
                forwarded += 1;
            }
            Err(e) => {
                warn!(
                    target: "remotekit::sources",
                    origin, error = %e,
                    "Error reading input; terminating task"
                );
                break;
            }
        }
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::PointerEvent;
    use tokio::sync::mpsc;

    #[test]
    fn name() {
        assert_eq!(StdinSource::new().name(), "stdin");
    }

    #[tokio::test]
    async fn pump_forwards_valid_lines_only() {
        let input = concat!(
            "{\"type\":\"pointer\",\"element\":\"ok\",\"event\":{\"kind\":\"up\"}}\n",
            "garbage\n",
            "\n",
            "{\"type\":\"reset\",\"element\":\"ok\"}\n",
        );
        let (tx, mut rx) = mpsc::channel(8);
        let forwarded = pump(input.as_bytes(), &tx, "test").await;
        drop(tx);

        assert_eq!(forwarded, 2);
        assert_eq!(
            rx.recv().await,
            Some(InputLine::Pointer {
                element: "ok".into(),
                event: PointerEvent::Up
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(InputLine::Reset {
                element: Some("ok".into())
            })
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn pump_stops_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let input = "{\"type\":\"reset\"}\n{\"type\":\"reset\"}\n";
        assert_eq!(pump(input.as_bytes(), &tx, "test").await, 0);
    }
}
