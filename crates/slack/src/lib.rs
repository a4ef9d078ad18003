//! Slack integration for the classroom assistant.
//!
//! - **Block Kit** (`blocks`) - serializable view-model builders
//! - **Home tab** (`home`) - pure dashboard renderer and fixed views
//! - **Events** (`events`) - typed event model and dispatcher
//! - **Dedupe** (`dedupe`) - bounded, time-boxed inbound event-id cache
//! - **Capture** (`capture`) - instructor-reply detection for learned entries
//! - **Assistant** (`assistant`) - the orchestrator behind every handler
//! - **Pump** (`pump`) - transport loop with reconnection and dedupe
//!
//! The real Slack wire protocol stays behind the `EventTransport`,
//! `ChatHistory`, `ChatReactions`, `UserDirectory`, `HomeSink`,
//! `InstallationStore` and `FileFetcher` traits; production adapters live in
//! the server crate, in-memory fakes next to the tests.

pub mod assistant;
pub mod blocks;
pub mod capture;
pub mod dedupe;
pub mod events;
pub mod home;
pub mod pump;
