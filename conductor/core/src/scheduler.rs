//! Scheduled Effects
//!
//! Every delayed effect in the core (response latency, reveal ticks, the
//! post-clear greeting) runs as a spawned Tokio task tracked by a
//! [`TimerKey`]. Tasks never touch session state; they post a
//! [`ScheduledEvent`] back to the controller, which applies it on its own
//! logical thread.
//!
//! # Cancellation
//!
//! Cancelling a key aborts its task. An event the task already queued may
//! still be delivered, so every handler re-validates its target (message id,
//! session generation) before acting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::messages::MessageId;
use crate::responder::{ResponderError, ResponseGenerator};

/// Identity of a scheduled task
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Pending reply for the placeholder with this id
    Response(MessageId),
    /// Reveal ticks for this message
    Reveal(MessageId),
    /// Greeting scheduled by the clear that started this generation
    Greeting(u64),
}

/// Event delivered by a scheduled task
#[derive(Clone, Debug)]
pub enum ScheduledEvent {
    /// The generator finished for the given placeholder
    ResponseReady {
        /// Placeholder the request was made for
        placeholder_id: MessageId,
        /// Generated text or failure
        result: Result<String, ResponderError>,
    },
    /// One reveal step is due
    RevealTick {
        /// Message being revealed
        id: MessageId,
        /// Whether this is the last scheduled tick
        last: bool,
    },
    /// The post-clear greeting delay elapsed
    GreetingDue {
        /// Generation the greeting belongs to
        generation: u64,
    },
}

impl ScheduledEvent {
    /// Key of the task that produced this event
    pub fn key(&self) -> TimerKey {
        match self {
            Self::ResponseReady { placeholder_id, .. } => TimerKey::Response(placeholder_id.clone()),
            Self::RevealTick { id, .. } => TimerKey::Reveal(id.clone()),
            Self::GreetingDue { generation } => TimerKey::Greeting(*generation),
        }
    }
}

/// Owner of all scheduled tasks and their event channel
#[derive(Debug)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<ScheduledEvent>,
    rx: mpsc::UnboundedReceiver<ScheduledEvent>,
    handles: HashMap<TimerKey, AbortHandle>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            handles: HashMap::new(),
        }
    }

    /// Request a reply from `generator` for the given placeholder
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_response<G>(&mut self, placeholder_id: MessageId, generator: Arc<G>, prompt: String)
    where
        G: ResponseGenerator + ?Sized + 'static,
    {
        let tx = self.tx.clone();
        let id = placeholder_id.clone();
        let handle = tokio::spawn(async move {
            let result = generator.generate(&prompt).await;
            let _ = tx.send(ScheduledEvent::ResponseReady {
                placeholder_id: id,
                result,
            });
        });
        self.track(TimerKey::Response(placeholder_id), handle.abort_handle());
    }

    /// Deliver `event` once after `delay`
    pub fn schedule_once(&mut self, key: TimerKey, delay: Duration, event: ScheduledEvent) {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        });
        self.track(key, handle.abort_handle());
    }

    /// Deliver `count` reveal ticks for `id`, one every `period`
    pub fn schedule_ticks(&mut self, id: MessageId, period: Duration, count: usize) {
        if count == 0 {
            return;
        }

        let tx = self.tx.clone();
        let tick_id = id.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for n in 1..=count {
                interval.tick().await;
                let event = ScheduledEvent::RevealTick {
                    id: tick_id.clone(),
                    last: n == count,
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        });
        self.track(TimerKey::Reveal(id), handle.abort_handle());
    }

    fn track(&mut self, key: TimerKey, handle: AbortHandle) {
        if let Some(previous) = self.handles.insert(key.clone(), handle) {
            tracing::debug!(key = ?key, "Replacing scheduled task");
            previous.abort();
        }
    }

    /// Abort every reveal task, returning how many were running
    pub fn cancel_reveals(&mut self) -> usize {
        self.cancel_where(|key| matches!(key, TimerKey::Reveal(_)))
    }

    /// Abort every pending greeting
    pub fn cancel_greetings(&mut self) -> usize {
        self.cancel_where(|key| matches!(key, TimerKey::Greeting(_)))
    }

    fn cancel_where(&mut self, mut pred: impl FnMut(&TimerKey) -> bool) -> usize {
        let before = self.handles.len();
        self.handles.retain(|key, handle| {
            if pred(key) {
                handle.abort();
                false
            } else {
                true
            }
        });
        before - self.handles.len()
    }

    /// Forget `key` after its final event was handled
    pub fn finish(&mut self, key: &TimerKey) {
        self.handles.remove(key);
    }

    /// Number of scheduled tasks
    pub fn pending(&self) -> usize {
        self.handles.len()
    }

    /// Wait for the next event
    pub async fn next(&mut self) -> Option<ScheduledEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_next(&mut self) -> Option<ScheduledEvent> {
        self.rx.try_recv().ok()
    }

    /// Abort everything
    pub fn shutdown(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_schedule_once_delivers_after_delay() {
        let mut scheduler = Scheduler::new();
        let start = Instant::now();

        scheduler.schedule_once(
            TimerKey::Greeting(1),
            Duration::from_millis(500),
            ScheduledEvent::GreetingDue { generation: 1 },
        );

        let event = scheduler.next().await.unwrap();
        assert!(matches!(event, ScheduledEvent::GreetingDue { generation: 1 }));
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_arrive_in_order_and_mark_last() {
        let mut scheduler = Scheduler::new();
        let id = MessageId::new();

        scheduler.schedule_ticks(id.clone(), Duration::from_millis(30), 3);

        let mut lasts = Vec::new();
        for _ in 0..3 {
            match scheduler.next().await.unwrap() {
                ScheduledEvent::RevealTick { id: tick_id, last } => {
                    assert_eq!(tick_id, id);
                    lasts.push(last);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(lasts, vec![false, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_greeting_never_arrives() {
        let mut scheduler = Scheduler::new();

        scheduler.schedule_once(
            TimerKey::Greeting(0),
            Duration::from_millis(500),
            ScheduledEvent::GreetingDue { generation: 0 },
        );
        assert_eq!(scheduler.cancel_greetings(), 1);
        assert_eq!(scheduler.pending(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(scheduler.try_next().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reveals_keeps_other_tasks() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_ticks(MessageId::new(), Duration::from_millis(30), 10);
        scheduler.schedule_ticks(MessageId::new(), Duration::from_millis(30), 10);
        scheduler.schedule_once(
            TimerKey::Greeting(2),
            Duration::from_millis(500),
            ScheduledEvent::GreetingDue { generation: 2 },
        );

        assert_eq!(scheduler.cancel_reveals(), 2);
        assert_eq!(scheduler.pending(), 1);

        let event = scheduler.next().await.unwrap();
        assert_eq!(event.key(), TimerKey::Greeting(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_forgets_key() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once(
            TimerKey::Greeting(3),
            Duration::from_millis(10),
            ScheduledEvent::GreetingDue { generation: 3 },
        );

        let event = scheduler.next().await.unwrap();
        scheduler.finish(&event.key());
        assert_eq!(scheduler.pending(), 0);
    }
}
