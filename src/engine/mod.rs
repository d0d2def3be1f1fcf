//! Write-path entry point and the worker pool behind it.
//!
//! [`AvailabilityEngine::on_media_write`] classifies synchronously and queues
//! one task per transition. Workers run correlation, composition and
//! dispatch (or request progression) off the write path. Nothing downstream
//! of classification can fail the write.

mod queue;

use crate::classifier::classify;
use crate::composer::Composer;
use crate::config::Configuration;
use crate::correlator::Correlator;
use crate::dispatch::{Dispatcher, NotificationSink};
use crate::metadata::MetadataLookup;
use crate::models::{MediaRequest, MediaSnapshot, NotificationPayload, TransitionEvent};
use crate::progression::{Advance, ProgressionWriter};
use crate::store::RequestStore;
use queue::{DropOldestQueue, Push};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What happened while processing one transition event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventReport {
    pub correlated: usize,
    pub dispatched: usize,
    pub delivery_failures: usize,
    /// Payloads not built because metadata lookup failed.
    pub skipped: usize,
    pub approved: usize,
}

struct Pipeline {
    correlator: Correlator,
    composer: Composer,
    dispatcher: Dispatcher,
    progression: ProgressionWriter,
}

pub struct AvailabilityEngine {
    pipeline: Arc<Pipeline>,
    queue: Arc<DropOldestQueue<TransitionEvent>>,
    workers: Vec<JoinHandle<()>>,
}

impl AvailabilityEngine {
    /// Build the engine and spawn its workers. Must be called inside a tokio runtime.
    pub fn new(
        config: &Configuration,
        store: Arc<dyn RequestStore>,
        metadata: Arc<dyn MetadataLookup>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let pipeline = Arc::new(Pipeline {
            correlator: Correlator::new(Arc::clone(&store)),
            composer: Composer::new(metadata, config.synopsis_max_chars()),
            dispatcher: Dispatcher::new(sink),
            progression: ProgressionWriter::new(store),
        });
        let queue = Arc::new(DropOldestQueue::with_protected(
            config.queue_capacity(),
            is_progression_task,
        ));

        let workers = (0..config.workers())
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&pipeline), Arc::clone(&queue))))
            .collect();

        info!(
            workers = config.workers(),
            queue_capacity = config.queue_capacity(),
            "Availability engine started"
        );

        Self {
            pipeline,
            queue,
            workers,
        }
    }

    /// Observe a committed write. Returns the number of transitions queued.
    ///
    /// `old` must be captured before the write became visible; pass `None`
    /// when the title had no prior record.
    pub fn on_media_write(&self, old: Option<&MediaSnapshot>, new: &MediaSnapshot) -> usize {
        let events = classify(old, new);
        if events.is_empty() {
            debug!(media_id = new.id, "Write produced no transitions");
            return 0;
        }

        let mut queued = 0;
        for event in events {
            debug!(media_id = new.id, event = event.name(), variant = %event.variant(), "Queueing transition");
            match self.queue.push(event) {
                Push::Queued => queued += 1,
                Push::Evicted(dropped) => {
                    queued += 1;
                    if is_progression_task(&dropped) {
                        error!(
                            media_id = dropped.media().id,
                            variant = %dropped.variant(),
                            "Queue full of approvals, dropped oldest auto-approve task; requests stay pending"
                        );
                    } else {
                        warn!(
                            media_id = dropped.media().id,
                            event = dropped.name(),
                            variant = %dropped.variant(),
                            "Notification queue full, dropped oldest pending task"
                        );
                    }
                }
                Push::Closed(rejected) => {
                    warn!(
                        media_id = rejected.media().id,
                        event = rejected.name(),
                        "Engine is shutting down, transition discarded"
                    );
                }
            }
        }
        queued
    }

    /// Run one transition through the downstream pipeline inline.
    pub async fn process_event(&self, event: &TransitionEvent) -> EventReport {
        self.pipeline.process(event).await
    }

    /// Tasks waiting for a worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Stop accepting writes, let workers drain the queue and wait for them.
    pub async fn shutdown(mut self) {
        info!(pending = self.pending(), "Draining availability engine");
        self.queue.close();
        for worker in std::mem::take(&mut self.workers) {
            if let Err(e) = worker.await {
                error!("Engine worker exited abnormally: {}", e);
            }
        }
        info!("Availability engine stopped");
    }
}

impl Drop for AvailabilityEngine {
    /// Dropping without [`AvailabilityEngine::shutdown`] still releases the
    /// workers: they drain what is queued and exit.
    fn drop(&mut self) {
        self.queue.close();
    }
}

/// Auto-approve tasks change request state; they are evicted last.
fn is_progression_task(event: &TransitionEvent) -> bool {
    matches!(event, TransitionEvent::AutoApprove { .. })
}

async fn run_worker(id: usize, pipeline: Arc<Pipeline>, queue: Arc<DropOldestQueue<TransitionEvent>>) {
    debug!(worker = id, "Worker started");

    while let Some(event) = queue.pop().await {
        let media_id = event.media().id;
        let name = event.name();
        let task_pipeline = Arc::clone(&pipeline);

        // A panic inside one task must not take the worker down with it.
        let task = tokio::spawn(async move { task_pipeline.process(&event).await });
        match task.await {
            Ok(report) => debug!(worker = id, media_id, event = name, ?report, "Transition processed"),
            Err(e) if e.is_panic() => {
                error!(worker = id, media_id, event = name, "Transition task panicked")
            }
            Err(e) => warn!(worker = id, media_id, event = name, "Transition task aborted: {}", e),
        }
    }

    debug!(worker = id, "Worker stopped");
}

impl Pipeline {
    async fn process(&self, event: &TransitionEvent) -> EventReport {
        let mut report = EventReport::default();
        let media_id = event.media().id;

        let requests = match self.correlator.correlate(event).await {
            Ok(requests) => requests,
            Err(e) => {
                error!(media_id, event = event.name(), "Failed to load related requests: {}", e);
                return report;
            }
        };
        report.correlated = requests.len();
        if requests.is_empty() {
            return report;
        }

        if let TransitionEvent::AutoApprove { .. } = event {
            for request in &requests {
                match self.progression.advance(request).await {
                    Ok(Advance::Approved) => report.approved += 1,
                    Ok(_) => {}
                    Err(e) => warn!(
                        media_id,
                        request_id = request.id,
                        "Failed to auto-approve request, leaving it pending: {}",
                        e
                    ),
                }
            }
            return report;
        }

        let payloads = match self.compose(event, &requests).await {
            Some(payloads) => payloads,
            None => {
                report.skipped = requests.len();
                return report;
            }
        };

        for payload in &payloads {
            if self.dispatcher.dispatch(payload).await {
                report.dispatched += 1;
            } else {
                report.delivery_failures += 1;
            }
        }

        info!(
            media_id,
            event = event.name(),
            variant = %event.variant(),
            dispatched = report.dispatched,
            "Sent availability notifications"
        );
        report
    }

    async fn compose(
        &self,
        event: &TransitionEvent,
        requests: &[MediaRequest],
    ) -> Option<Vec<NotificationPayload>> {
        match self.composer.compose_all(event, requests).await {
            Ok(payloads) => Some(payloads),
            Err(e) => {
                error!(
                    media_id = event.media().id,
                    event = event.name(),
                    requests = requests.len(),
                    "Something went wrong composing media notification(s): {}",
                    e
                );
                None
            }
        }
    }
}
