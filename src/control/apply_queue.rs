use std::collections::HashMap;

use crate::external::display::{Brightness, DisplayBackend, Output};
use tokio::sync::watch;

/// A brightness value that should be sent to the backend for an output.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyRequest {
    pub output: Output,
    pub value: Brightness,
}

/// Sends [ApplyRequest]s to a [DisplayBackend] without blocking the caller.
///
/// Every output gets its own worker task fed through a [watch] channel, so
/// for a single output at most one `set_brightness` call is in flight and a
/// burst of requests collapses into the latest one. Outputs don't wait for
/// each other.
///
/// Failed calls are logged and never retried. Workers finish their current
/// call and stop once the queue is dropped.
pub struct ApplyQueue<B: DisplayBackend> {
    backend: B,
    workers: HashMap<Output, watch::Sender<Option<Brightness>>>,
}

impl<B: DisplayBackend> ApplyQueue<B> {
    pub fn new(backend: B) -> ApplyQueue<B> {
        ApplyQueue {
            backend,
            workers: HashMap::new(),
        }
    }

    pub fn submit(&mut self, request: ApplyRequest) {
        let backend = &self.backend;
        let worker = self
            .workers
            .entry(request.output.clone())
            .or_insert_with(|| spawn_worker(backend.clone(), request.output.clone()));
        // Marks the value as changed even when equal to the previous one
        worker.send_replace(Some(request.value));
    }
}

fn spawn_worker<B: DisplayBackend>(backend: B, output: Output) -> watch::Sender<Option<Brightness>> {
    let (sender, mut receiver) = watch::channel(None);
    log::debug!("Starting apply worker for {}", output);
    tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            let value = *receiver.borrow_and_update();
            let value = match value {
                Some(value) => value,
                None => continue,
            };
            match backend.set_brightness(&output, value).await {
                Ok(ack) => log::info!("{}", ack),
                Err(e) => log::error!(
                    "Setting brightness of {} to {} failed: {:#}",
                    output,
                    value,
                    e
                ),
            }
        }
        log::debug!("Apply worker for {} stopped", output);
    });
    sender
}
