//! Producer and consumer loops over a deque

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use sqs_deque::{DequeError, SqsDeque};
use tracing::{error, info, warn};

use crate::cli::Command;

/// Appends 0, 1, 2, ... sleeping `interval` after each append
///
/// Runs until `count` values were sent, or forever without a count.
///
/// # Errors
///
/// Returns the first failed append
pub async fn produce(
    deque: &SqsDeque,
    interval: Duration,
    count: Option<u64>,
) -> anyhow::Result<u64> {
    let limit = count.unwrap_or(u64::MAX);
    let mut sent = 0;

    while sent < limit {
        deque
            .append(&sent)
            .await
            .with_context(|| format!("Failed to append {sent} to {}", deque.name()))?;
        info!("Appended {} to {}", sent, deque.name());
        sent += 1;
        tokio::time::sleep(interval).await;
    }

    Ok(sent)
}

/// Pops and prints one value per `interval`
///
/// An empty queue or an upstream (5xx) failure is reported on `out` and
/// polling continues. Runs for `count` attempts, or forever without a count.
///
/// # Errors
///
/// Returns any other pop failure, or a write failure
pub async fn consume<W: Write + Send>(
    deque: &SqsDeque,
    interval: Duration,
    count: Option<u64>,
    out: &mut W,
) -> anyhow::Result<u64> {
    let limit = count.unwrap_or(u64::MAX);
    let mut popped = 0;

    for _ in 0..limit {
        match deque.pop::<Value>().await {
            Ok(value) => {
                writeln!(out, "{value}")?;
                popped += 1;
            }
            Err(e @ DequeError::EmptyQueue(_)) => writeln!(out, "{e}")?,
            Err(e) if e.is_upstream_error() => {
                error!("Upstream failure popping from {}: {}", deque.name(), e);
                writeln!(out, "{e}")?;
            }
            Err(e) => return Err(e).context("Failed to pop"),
        }
        tokio::time::sleep(interval).await;
    }

    Ok(popped)
}

/// Parses every value as JSON and appends them with one `extend`
///
/// # Errors
///
/// Returns an error if a value is not valid JSON or the extend fails
pub async fn fill(deque: &SqsDeque, values: &[String]) -> anyhow::Result<usize> {
    let parsed = values
        .iter()
        .map(|raw| {
            serde_json::from_str::<Value>(raw).with_context(|| format!("Invalid JSON value: {raw}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    deque.extend(&parsed).await.context("Failed to extend")?;
    Ok(parsed.len())
}

/// Runs a command against an opened deque
///
/// # Errors
///
/// Returns the failure of the command
pub async fn run<W: Write + Send>(
    command: Command,
    deque: &SqsDeque,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        Command::Produce { interval_ms, count } => {
            produce(deque, Duration::from_millis(interval_ms), count).await?;
        }
        Command::Consume { interval_ms, count } => {
            consume(deque, Duration::from_millis(interval_ms), count, out).await?;
        }
        Command::Fill { values } => {
            let sent = fill(deque, &values).await?;
            writeln!(out, "appended {sent} values")?;
        }
        Command::Len => {
            let len = deque.len().await?;
            writeln!(out, "{len}")?;
        }
        Command::Clear => {
            deque.clear().await?;
            warn!(
                "Purge of {} requested, SQS removes messages asynchronously",
                deque.name()
            );
        }
    }
    Ok(())
}
