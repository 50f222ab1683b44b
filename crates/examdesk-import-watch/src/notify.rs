/*
[INPUT]:  Notification kinds and messages emitted by the poller
[OUTPUT]: User-visible messages (log events, channel items, terminal lines)
[POS]:    Side-effect sinks - fire-and-forget notifications
[UPDATE]: When adding notification kinds or delivery targets
*/

use console::style;
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    InfoSuccess,
    WarningPartialFailure,
    ErrorGeneric,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::InfoSuccess => "info-success",
            NotificationKind::WarningPartialFailure => "warning-partial-failure",
            NotificationKind::ErrorGeneric => "error-generic",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// One-way sink; delivery failures are never reported back.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Emits notifications as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::InfoSuccess => {
                tracing::info!(kind = %kind, "{message}")
            }
            NotificationKind::WarningPartialFailure => {
                tracing::warn!(kind = %kind, "{message}")
            }
            NotificationKind::ErrorGeneric => {
                tracing::error!(kind = %kind, "{message}")
            }
        }
    }
}

/// Forwards notifications to an unbounded channel, e.g. for a UI loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl NotificationSink for ChannelNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        let notification = Notification {
            kind,
            message: message.to_string(),
        };
        if self.tx.send(notification).is_err() {
            tracing::debug!(kind = %kind, "notification receiver dropped");
        }
    }
}

/// Prints styled lines for the command-line runner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::InfoSuccess => {
                println!("{} {}", style("SUCCESS").bold().green(), message)
            }
            NotificationKind::WarningPartialFailure => {
                println!("{} {}", style("WARNING").bold().yellow(), message)
            }
            NotificationKind::ErrorGeneric => {
                eprintln!("{} {}", style("ERROR").bold().red(), message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(NotificationKind::InfoSuccess.as_str(), "info-success");
        assert_eq!(
            NotificationKind::WarningPartialFailure.to_string(),
            "warning-partial-failure"
        );
        assert_eq!(
            serde_json::to_string(&NotificationKind::ErrorGeneric).unwrap(),
            "\"error-generic\""
        );
    }

    #[test]
    fn test_channel_notifier_delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::channel();
        notifier.notify(NotificationKind::InfoSuccess, "first");
        notifier.notify(NotificationKind::ErrorGeneric, "second");

        let first = rx.try_recv().unwrap();
        assert_eq!(first.kind, NotificationKind::InfoSuccess);
        assert_eq!(first.message, "first");
        assert_eq!(rx.try_recv().unwrap().message, "second");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_notifier_ignores_dropped_receiver() {
        let (notifier, rx) = ChannelNotifier::channel();
        drop(rx);
        notifier.notify(NotificationKind::WarningPartialFailure, "nobody listens");
    }
}
