//! Line-delimited JSON event loop
//!
//! Input (one JSON object per line):
//!
//! ```text
//! {"type":"message","id":1,"channel_id":7,"author":42,"content":"buy spam now"}
//! {"type":"command","name":"filter","args":{"words":"spam, eggs"},"request_id":"r1"}
//! ```
//!
//! Output (one JSON object per line):
//!
//! ```text
//! {"type":"delete","message_id":1,"channel_id":7,"author":42,"word":"spam","scope":"global"}
//! {"type":"reply","request_id":"r1","ok":true,"text":"Global filter words updated to: spam, eggs"}
//! ```
//!
//! Messages are processed concurrently on spawned tasks; commands run
//! inline on the reading task.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::SplitStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use wordfilter_core::{FilterScope, FilterState, MatchResult, PrincipalId};

use crate::commands::{CommandArgs, CommandTable};
use crate::error::{DeliveryError, RuntimeError};
use crate::pipeline::{InboundMessage, MessageActions, ModerationPipeline, PipelineStats};

/// Inbound event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Message(InboundMessage),
    Command {
        name: String,
        #[serde(default)]
        args: HashMap<String, String>,
        #[serde(default)]
        request_id: Option<String>,
    },
}

/// Outbound action or reply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    Delete {
        message_id: u64,
        channel_id: u64,
        author: PrincipalId,
        word: Option<String>,
        scope: Option<FilterScope>,
    },
    Reply {
        request_id: Option<String>,
        ok: bool,
        text: String,
    },
}

/// Delivers deletions to the output writer.
struct ChannelActions {
    tx: mpsc::UnboundedSender<Output>,
}

#[async_trait]
impl MessageActions for ChannelActions {
    async fn delete_message(
        &self,
        message: &InboundMessage,
        result: &MatchResult,
    ) -> Result<(), DeliveryError> {
        self.tx
            .send(Output::Delete {
                message_id: message.id,
                channel_id: message.channel_id,
                author: message.author,
                word: result.matched_word.clone(),
                scope: result.scope,
            })
            .map_err(|_| DeliveryError::ChannelClosed)
    }
}

/// Totals reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pipeline: PipelineStats,
    pub commands: u64,
    pub malformed: u64,
}

/// Drive the bot from `reader` until EOF, writing outputs to `writer`.
///
/// Returns the writer so callers can inspect buffered output.
pub async fn run<R, W>(
    reader: R,
    writer: W,
    state: Arc<FilterState>,
    self_id: Option<PrincipalId>,
) -> Result<(W, RunSummary), RuntimeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    run_until(reader, writer, state, self_id, std::future::pending()).await
}

/// Like [`run`], but stops reading once `shutdown` resolves.
///
/// Messages already read still finish, and every queued output is written
/// before this returns.
pub async fn run_until<R, W, S>(
    reader: R,
    writer: W,
    state: Arc<FilterState>,
    self_id: Option<PrincipalId>,
    shutdown: S,
) -> Result<(W, RunSummary), RuntimeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let table = CommandTable::builtin()?;
    let (tx, rx) = mpsc::unbounded_channel::<Output>();
    let writer_task = tokio::spawn(write_outputs(writer, rx));

    let actions = Arc::new(ChannelActions { tx: tx.clone() });
    let pipeline = Arc::new(ModerationPipeline::new(
        Arc::clone(&state),
        actions,
        self_id,
    ));

    let mut summary = RunSummary::default();
    let mut tasks = JoinSet::new();
    let mut lines = SplitStream::new(reader.split(b'\n'));
    tokio::pin!(shutdown);

    loop {
        let next = tokio::select! {
            next = lines.next() => next,
            _ = &mut shutdown => {
                info!(pending = tasks.len(), "Shutdown requested, draining in-flight messages");
                break;
            }
        };
        let Some(bytes) = next else {
            break;
        };
        let bytes = bytes?;

        // A bad line is skipped like any other malformed event
        let line = match std::str::from_utf8(&bytes) {
            Ok(line) => line.trim(),
            Err(e) => {
                summary.malformed += 1;
                warn!(error = %e, "Skipping event line that is not UTF-8");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                summary.malformed += 1;
                warn!(error = %e, "Skipping malformed event");
                continue;
            }
        };

        match event {
            Event::Message(message) => {
                let pipeline = Arc::clone(&pipeline);
                tasks.spawn(async move { pipeline.process(&message).await });
            }
            Event::Command {
                name,
                args,
                request_id,
            } => {
                summary.commands += 1;
                let reply = match table.dispatch(&state, &name, &CommandArgs::from(args)) {
                    Ok(reply) => Output::Reply {
                        request_id,
                        ok: true,
                        text: reply.text,
                    },
                    Err(e) => {
                        debug!(command = %name, error = %e, "Command rejected");
                        Output::Reply {
                            request_id,
                            ok: false,
                            text: e.to_string(),
                        }
                    }
                };
                if tx.send(reply).is_err() {
                    warn!("Output writer closed, dropping reply");
                }
            }
        }

        // Reap finished message tasks so the set stays small
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                warn!(error = %e, "Message task failed");
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Message task failed");
        }
    }

    summary.pipeline = pipeline.stats();
    drop(pipeline);
    drop(tx);

    let writer = writer_task
        .await
        .map_err(|e| RuntimeError::Writer(e.to_string()))??;

    info!(
        seen = summary.pipeline.messages_seen,
        deleted = summary.pipeline.messages_deleted,
        failures = summary.pipeline.delete_failures,
        commands = summary.commands,
        malformed = summary.malformed,
        "Event stream finished"
    );
    Ok((writer, summary))
}

async fn write_outputs<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Output>,
) -> Result<W, RuntimeError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(output) = rx.recv().await {
        let mut line = serde_json::to_vec(&output)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use wordfilter_core::SimilarityThreshold;

    fn parse_output(out: Vec<u8>) -> Vec<Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    async fn run_bytes(input: &[u8], state: FilterState) -> (Vec<Value>, RunSummary) {
        let (out, summary) = run(input, Vec::new(), Arc::new(state), None)
            .await
            .unwrap();
        (parse_output(out), summary)
    }

    async fn run_lines(input: &str, state: FilterState) -> (Vec<Value>, RunSummary) {
        run_bytes(input.as_bytes(), state).await
    }

    #[tokio::test]
    async fn test_message_deleted() {
        let state = FilterState::with_words(["spam"], SimilarityThreshold::default());
        let input = r#"{"type":"message","id":1,"channel_id":7,"author":42,"content":"buy SPAM now"}"#;

        let (out, summary) = run_lines(input, state).await;
        assert_eq!(
            out,
            vec![serde_json::json!({
                "type": "delete",
                "message_id": 1,
                "channel_id": 7,
                "author": 42,
                "word": "spam",
                "scope": "global"
            })]
        );
        assert_eq!(summary.pipeline.messages_deleted, 1);
    }

    #[tokio::test]
    async fn test_command_then_message() {
        let input = concat!(
            r#"{"type":"command","name":"filter","args":{"words":"crypto"},"request_id":"r1"}"#,
            "\n",
            r#"{"type":"command","name":"similarity","args":{"threshold":"101"},"request_id":"r2"}"#,
            "\n",
        );

        let (out, summary) = run_lines(input, FilterState::new()).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["ok"], true);
        assert_eq!(out[0]["text"], "Global filter words updated to: crypto");
        assert_eq!(out[1]["request_id"], "r2");
        assert_eq!(out[1]["ok"], false);
        assert_eq!(summary.commands, 2);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let state = FilterState::with_words(["spam"], SimilarityThreshold::default());
        let input = concat!(
            "not json\n",
            "\n",
            r#"{"type":"unknown"}"#,
            "\n",
            r#"{"type":"message","id":2,"author":5,"content":"hello"}"#,
            "\n",
        );

        let (out, summary) = run_lines(input, state).await;
        assert!(out.is_empty());
        assert_eq!(summary.malformed, 2);
        assert_eq!(summary.pipeline.messages_seen, 1);
    }

    #[tokio::test]
    async fn test_bot_messages_never_deleted() {
        let state = FilterState::with_words(["spam"], SimilarityThreshold::default());
        let input = r#"{"type":"message","id":3,"author":5,"author_is_bot":true,"content":"spam"}"#;

        let (out, summary) = run_lines(input, state).await;
        assert!(out.is_empty());
        assert_eq!(summary.pipeline.messages_ignored, 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let state = FilterState::with_words(["spam"], SimilarityThreshold::default());
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"type":"message","id":1,"author":5,"content":"spam"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"type":"message","id":2,"author":5,"content":"more spam"}"#);
        input.push(b'\n');

        let (out, summary) = run_bytes(&input, state).await;
        let mut deleted: Vec<u64> = out
            .iter()
            .map(|v| v["message_id"].as_u64().unwrap())
            .collect();
        deleted.sort_unstable();
        assert_eq!(deleted, vec![1, 2]);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.pipeline.messages_deleted, 2);
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_outputs() {
        let state = FilterState::with_words(["spam"], SimilarityThreshold::default());
        let (mut client, server) = tokio::io::duplex(1024);
        client
            .write_all(b"{\"type\":\"message\",\"id\":9,\"author\":5,\"content\":\"spam\"}\n")
            .await
            .unwrap();

        // The input side stays open, so only the shutdown future ends the loop
        let shutdown = tokio::time::sleep(std::time::Duration::from_millis(100));
        let (out, summary) = run_until(
            tokio::io::BufReader::new(server),
            Vec::new(),
            Arc::new(state),
            None,
            shutdown,
        )
        .await
        .unwrap();

        let out = parse_output(out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["message_id"], 9);
        assert_eq!(summary.pipeline.messages_deleted, 1);
        drop(client);
    }
}
