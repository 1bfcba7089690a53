//! Command line arguments for the demo

use clap::{Parser, Subcommand};

/// Drive an SQS queue through its deque interface
#[derive(Debug, Parser)]
#[command(name = "deque-demo", version)]
pub struct Cli {
    /// Queue name; names ending in `.fifo` are FIFO queues
    #[arg(long, env = "DEQUE_QUEUE", default_value = "demo.fifo")]
    pub queue: String,

    /// Create the queue when it does not exist
    #[arg(long, env = "DEQUE_CREATE_IF_MISSING")]
    pub create_if_missing: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Append 0, 1, 2, ... one value per interval
    Produce {
        /// Delay between appends
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Stop after this many values
        #[arg(long)]
        count: Option<u64>,
    },
    /// Pop and print one value per interval
    Consume {
        /// Delay between pops
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,
        /// Stop after this many attempts
        #[arg(long)]
        count: Option<u64>,
    },
    /// Append JSON values in batches
    Fill {
        /// Values to append, each parsed as JSON
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Print the approximate number of messages
    Len,
    /// Purge the queue
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["deque-demo", "produce"]).unwrap();

        assert_eq!(cli.queue, "demo.fifo");
        assert!(!cli.create_if_missing);
        assert_eq!(
            cli.command,
            Command::Produce {
                interval_ms: 1000,
                count: None
            }
        );
    }

    #[test]
    fn test_consume_options() {
        let cli = Cli::try_parse_from([
            "deque-demo",
            "--queue",
            "demo2",
            "--create-if-missing",
            "consume",
            "--interval-ms",
            "10",
            "--count",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.queue, "demo2");
        assert!(cli.create_if_missing);
        assert_eq!(
            cli.command,
            Command::Consume {
                interval_ms: 10,
                count: Some(3)
            }
        );
    }

    #[test]
    fn test_fill_requires_values() {
        assert!(Cli::try_parse_from(["deque-demo", "fill"]).is_err());
    }
}
