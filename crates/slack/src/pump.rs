//! Socket-mode event pump: pulls envelopes off a transport, acknowledges
//! them, suppresses redeliveries through the dedupe cache, and hands the
//! rest to the dispatcher. Transport failures reconnect with exponential
//! backoff; exhausting retries degrades gracefully instead of crashing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dedupe::{DedupeVerdict, EventDedupeCache};
use crate::events::{EventDispatcher, EventEnvelope, HandlerResult, WorkspaceEvent};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport delivery failed: {0}")]
    Deliver(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Wire-facing side of the pump. `deliver` carries handler output back to
/// the user: a reply posts a message, a modal opens a view, form errors go
/// into the submission response.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<EventEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn deliver(
        &self,
        envelope: &EventEnvelope,
        outcome: &HandlerResult,
    ) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopEventTransport;

#[async_trait]
impl EventTransport for NoopEventTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<EventEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn deliver(
        &self,
        _envelope: &EventEnvelope,
        _outcome: &HandlerResult,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct EventPump {
    transport: Arc<dyn EventTransport>,
    dispatcher: EventDispatcher,
    dedupe: EventDedupeCache,
    reconnect_policy: ReconnectPolicy,
}

impl EventPump {
    pub fn new(
        transport: Arc<dyn EventTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, dedupe: EventDedupeCache::default(), reconnect_policy }
    }

    pub async fn run(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "event transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "event transport retries exhausted; stopping pump without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening event transport connection");
        self.transport.connect().await?;
        info!(attempt, "event transport connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "event transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            // Ack first; Slack redelivers anything not acked in time, and a
            // slow upload must not trigger a redelivery storm.
            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge envelope"
                );
            }

            if let Some(key) = dedupe_key(&envelope.event) {
                if self.dedupe.check(&key).await == DedupeVerdict::Duplicate {
                    debug!(
                        envelope_id = %envelope.envelope_id,
                        dedupe_key = %key,
                        "suppressing redelivered event"
                    );
                    continue;
                }
            }

            let outcome = match self.dispatcher.dispatch(&envelope).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        error = %error,
                        "event dispatch failed; continuing pump loop"
                    );
                    continue;
                }
            };

            match &outcome {
                HandlerResult::Processed | HandlerResult::Ignored => {}
                HandlerResult::Reply(_)
                | HandlerResult::OpenModal(_)
                | HandlerResult::FormErrors(_) => {
                    if let Err(error) = self.transport.deliver(&envelope, &outcome).await {
                        warn!(
                            envelope_id = %envelope.envelope_id,
                            error = %error,
                            "handler output delivery failed"
                        );
                    }
                }
            }
        }
    }
}

/// Redelivered message events carry a fresh envelope id but the same message
/// coordinates, so messages dedupe by workspace, channel, and timestamp.
/// Everything else is idempotent enough to reprocess.
fn dedupe_key(event: &WorkspaceEvent) -> Option<String> {
    match event {
        WorkspaceEvent::Mention(message)
        | WorkspaceEvent::DirectMessage(message)
        | WorkspaceEvent::ChannelMessage(message) => Some(format!(
            "{}:{}:{}",
            message.workspace.as_str(),
            message.channel_id,
            message.ts
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use classbot_core::WorkspaceId;

    use super::{EventPump, EventTransport, ReconnectPolicy, TransportError};
    use crate::events::{
        ChannelKind, EventDispatcher, EventEnvelope, EventHandler, EventHandlerError, EventKind,
        HandlerResult, MessageEvent, WorkspaceEvent,
    };

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<EventEnvelope>, TransportError>>,
        connect_attempts: usize,
        acknowledgements: Vec<String>,
        deliveries: Vec<HandlerResult>,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<EventEnvelope>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    ..ScriptedState::default()
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledgements(&self) -> Vec<String> {
            self.state.lock().await.acknowledgements.clone()
        }

        async fn deliveries(&self) -> Vec<HandlerResult> {
            self.state.lock().await.deliveries.clone()
        }
    }

    #[async_trait]
    impl EventTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<EventEnvelope>, TransportError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
            self.state.lock().await.acknowledgements.push(envelope_id.to_owned());
            Ok(())
        }

        async fn deliver(
            &self,
            _envelope: &EventEnvelope,
            outcome: &HandlerResult,
        ) -> Result<(), TransportError> {
            self.state.lock().await.deliveries.push(outcome.clone());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct CountingMessageHandler {
        handled: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingMessageHandler {
        fn event_kind(&self) -> EventKind {
            EventKind::Message
        }

        async fn handle(
            &self,
            _envelope: &EventEnvelope,
        ) -> Result<HandlerResult, EventHandlerError> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(HandlerResult::Reply("ok".to_owned()))
        }
    }

    fn message_envelope(envelope_id: &str, ts: &str) -> EventEnvelope {
        EventEnvelope {
            envelope_id: envelope_id.to_owned(),
            event: WorkspaceEvent::ChannelMessage(MessageEvent {
                workspace: WorkspaceId("T1".to_owned()),
                channel_id: "C1".to_owned(),
                user_id: "U1".to_owned(),
                text: "hello".to_owned(),
                ts: ts.to_owned(),
                thread_ts: None,
                channel_kind: ChannelKind::Im,
                attachment_text: None,
            }),
        }
    }

    fn counting_dispatcher(handled: Arc<AtomicUsize>) -> EventDispatcher {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(CountingMessageHandler { handled });
        dispatcher
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![Ok(Some(message_envelope("env-1", "1700000000.000100"))), Ok(None)],
        ));
        let handled = Arc::new(AtomicUsize::new(0));
        let pump = EventPump::new(
            transport.clone(),
            counting_dispatcher(handled.clone()),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        pump.run().await.expect("pump should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.acknowledgements().await, vec!["env-1"]);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));
        let pump = EventPump::new(
            transport.clone(),
            EventDispatcher::new(),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        pump.run().await.expect("pump should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn redelivered_message_is_acked_but_handled_once() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![
                Ok(Some(message_envelope("env-1", "1700000000.000100"))),
                // Same message coordinates under a fresh envelope id.
                Ok(Some(message_envelope("env-2", "1700000000.000100"))),
                Ok(None),
            ],
        ));
        let handled = Arc::new(AtomicUsize::new(0));
        let pump = EventPump::new(
            transport.clone(),
            counting_dispatcher(handled.clone()),
            ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
        );

        pump.run().await.expect("pump");

        assert_eq!(transport.acknowledgements().await, vec!["env-1", "env-2"]);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_replies_are_delivered_through_the_transport() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![Ok(Some(message_envelope("env-1", "1700000000.000100"))), Ok(None)],
        ));
        let pump = EventPump::new(
            transport.clone(),
            counting_dispatcher(Arc::new(AtomicUsize::new(0))),
            ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
        );

        pump.run().await.expect("pump");

        assert_eq!(transport.deliveries().await, vec![HandlerResult::Reply("ok".to_owned())]);
    }
}
