//! DataProvider ledger playback module for Caryatid
//!
//! Replays a recorded ledger session, one JSON encoded [`LedgerMessage`] per
//! line, onto the render and unrender topics in file order.

use std::{path::Path, sync::Arc};

use anyhow::{Context as _, Result};
use caryatid_sdk::{module, Context, Module};
use config::Config;
use dataprovider_common::messages::{LedgerMessage, Message};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};
use tracing::{error, info};

const DEFAULT_PATH: (&str, &str) = ("path", "ledger-session.jsonl");
const DEFAULT_RENDER_TOPIC: (&str, &str) = ("render-topic", "ledger.render");
const DEFAULT_UNRENDER_TOPIC: (&str, &str) = ("unrender-topic", "ledger.unrender");

/// Ledger playback module
#[module(
    message_type(Message),
    name = "ledger-playback",
    description = "Recorded ledger session playback"
)]
pub struct LedgerPlayback;

#[derive(Debug, Clone)]
struct PlaybackConfig {
    path: String,
    render_topic: String,
    unrender_topic: String,
}

impl PlaybackConfig {
    fn conf(config: &Config, keydef: (&str, &str)) -> String {
        config.get_string(keydef.0).unwrap_or(keydef.1.to_string())
    }

    fn new(config: &Config) -> Self {
        Self {
            path: Self::conf(config, DEFAULT_PATH),
            render_topic: Self::conf(config, DEFAULT_RENDER_TOPIC),
            unrender_topic: Self::conf(config, DEFAULT_UNRENDER_TOPIC),
        }
    }

    /// Unrenders travel on their own track, everything else on the render track
    fn topic_for(&self, message: &LedgerMessage) -> &str {
        match message {
            LedgerMessage::ActionUnrendered(_) => &self.unrender_topic,
            LedgerMessage::BlockAppended(_) | LedgerMessage::ActionRendered(_) => {
                &self.render_topic
            }
        }
    }
}

/// Parse one recorded line; blank lines carry nothing
fn parse_line(line_number: usize, line: &str) -> Result<Option<LedgerMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .with_context(|| format!("Malformed ledger message on line {line_number}"))
}

/// Read a whole recording, failing on the first malformed line
async fn read_recording(path: &Path) -> Result<Vec<LedgerMessage>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("Cannot open ledger recording {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut messages = Vec::new();
    let mut line_number = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if let Some(message) = parse_line(line_number, &line)? {
            messages.push(message);
        }
    }
    Ok(messages)
}

impl LedgerPlayback {
    pub async fn init(&self, context: Arc<Context<Message>>, config: Arc<Config>) -> Result<()> {
        let cfg = PlaybackConfig::new(&config);
        info!(
            "Playing back '{}' onto '{}' and '{}'",
            cfg.path, cfg.render_topic, cfg.unrender_topic
        );

        let run_context = context.clone();
        context.run(async move {
            let messages = match read_recording(Path::new(&cfg.path)).await {
                Ok(messages) => messages,
                Err(e) => {
                    error!("Aborting playback: {e:#}");
                    return;
                }
            };

            let total = messages.len();
            for message in messages {
                let topic = cfg.topic_for(&message).to_string();
                let message = Arc::new(Message::Ledger(message));
                if let Err(e) = run_context.message_bus.publish(&topic, message).await {
                    error!("Failed to publish on '{topic}': {e:#}");
                    return;
                }
            }
            info!("All {total} ledger messages played back");
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECORDING: &str = include_str!("../../../demos/ledger-session.jsonl");

    fn config() -> PlaybackConfig {
        PlaybackConfig::new(&Config::default())
    }

    #[test]
    fn defaults_apply_without_configuration() {
        let cfg = config();
        assert_eq!(cfg.path, "ledger-session.jsonl");
        assert_eq!(cfg.render_topic, "ledger.render");
        assert_eq!(cfg.unrender_topic, "ledger.unrender");
    }

    #[test]
    fn demo_recording_parses_and_routes() {
        let cfg = config();
        let messages: Vec<LedgerMessage> = RECORDING
            .lines()
            .enumerate()
            .filter_map(|(i, line)| parse_line(i + 1, line).unwrap())
            .collect();

        assert!(matches!(messages.first(), Some(LedgerMessage::BlockAppended(_))));
        let unrenders =
            messages.iter().filter(|m| cfg.topic_for(m) == cfg.unrender_topic.as_str()).count();
        assert_eq!(unrenders, 1);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_line(1, "   ").unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_line_reports_its_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let first = RECORDING.lines().next().unwrap();
        writeln!(file, "{first}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{{\"BlockAppended\": 12}}").unwrap();

        let err = read_recording(file.path()).await.unwrap_err();
        assert!(format!("{err:#}").contains("line 3"), "{err:#}");
    }

    #[tokio::test]
    async fn missing_recording_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_recording(&dir.path().join("absent.jsonl")).await.is_err());
    }
}
