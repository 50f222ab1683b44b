/*
[INPUT]:  Public API exports for examdesk-import-watch crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod notify;
pub mod poller;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use config::WatchConfig;
pub use notify::{
    ChannelNotifier, ConsoleNotifier, Notification, NotificationKind, NotificationSink,
    TracingNotifier,
};
pub use poller::{PollerError, PollerSnapshot, ResumeOutcome, TaskPoller, TaskPollerBuilder};
pub use service::TaskStatusService;
pub use store::{JsonFileStore, MemoryStore, PersistentStore, StoreError};
