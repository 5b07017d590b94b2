//! Tracing setup: stderr output plus a layer that feeds the in-app console.

use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info,stv_iptv=debug";

/// Forwards each event as one `[LEVEL] message` line
pub struct ConsoleLayer {
    sender: Mutex<Sender<String>>,
}

impl ConsoleLayer {
    pub fn new(sender: Sender<String>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = format!("[{}] ", event.metadata().level());
        event.record(&mut MessageVisitor(&mut line));
        if let Ok(sender) = self.sender.lock() {
            // The UI may already be gone
            let _ = sender.send(line);
        }
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        } else {
            self.0.push_str(&format!(" {}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(console: Sender<String>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(ConsoleLayer::new(console))
        .with(filter)
        .try_init();
    if let Err(e) = result {
        eprintln!("Logging already initialised: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_console_lines() {
        let (tx, rx) = channel();
        let subscriber = tracing_subscriber::registry().with(ConsoleLayer::new(tx));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Loaded {} notifications", 3);
            tracing::warn!(url = "data/x.json", "Fetch failed");
        });

        let lines: Vec<String> = rx.try_iter().collect();
        assert_eq!(lines[0], "[INFO] Loaded 3 notifications");
        assert_eq!(lines[1], "[WARN] Fetch failed url=data/x.json");
    }
}
