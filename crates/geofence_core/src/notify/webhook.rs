//! Webhook delivery worker.
//!
//! # Responsibility
//! - Post transition callbacks to the webhook URL stored on a record.
//! - Enforce the at-most-one-outstanding-webhook-per-transition policy.
//!
//! # Invariants
//! - HTTP I/O happens on the dispatcher's worker thread, never on the host
//!   runtime callback thread.
//! - A dispatch for a (geofence id, transition) pair already in flight is
//!   skipped, not queued.
//! - Delivery failures are logged; there is no retry.

use crate::model::geo_notification::TransitionKind;
use chrono::Utc;
use log::{error, info, warn};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
const WORKER_THREAD_NAME: &str = "geofence-webhook";

/// Timestamp format matching the original bridge payload contract.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

type InFlightKey = (String, TransitionKind);

/// One webhook post for a fired transition.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub geofence_id: String,
    pub transition: TransitionKind,
    pub url: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    #[serde(rename = "geofenceId")]
    geofence_id: &'a str,
    transition: &'static str,
    date: String,
}

/// Background webhook poster with an in-flight guard per transition key.
pub struct WebhookDispatcher {
    jobs: Option<Sender<WebhookRequest>>,
    in_flight: Arc<Mutex<HashSet<InFlightKey>>>,
    worker: Option<JoinHandle<()>>,
}

impl WebhookDispatcher {
    /// Spawns the worker thread and returns a ready dispatcher.
    ///
    /// When the worker cannot be spawned the dispatcher still constructs;
    /// every dispatch then fails observably through `webhook_dispatch`
    /// error events.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        let in_flight = Arc::new(Mutex::new(HashSet::new()));
        let worker_guard = Arc::clone(&in_flight);

        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(receiver, worker_guard));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!(
                    "event=webhook_worker_spawn module=webhook status=error error={err}"
                );
                None
            }
        };

        Self {
            jobs: Some(sender),
            in_flight,
            worker,
        }
    }

    /// Hands a webhook job to the worker.
    ///
    /// Returns `false` when the job was skipped: the same (geofence id,
    /// transition) pair is still in flight, or the worker is gone.
    pub fn dispatch(&self, request: WebhookRequest) -> bool {
        let key: InFlightKey = (request.geofence_id.clone(), request.transition);

        {
            let mut in_flight = lock_in_flight(&self.in_flight);
            if in_flight.contains(&key) {
                info!(
                    "event=webhook_dispatch module=webhook status=skipped reason=in_flight geofence_id={} transition={}",
                    request.geofence_id, request.transition
                );
                return false;
            }
            in_flight.insert(key.clone());
        }

        let Some(jobs) = self.jobs.as_ref() else {
            lock_in_flight(&self.in_flight).remove(&key);
            return false;
        };

        match jobs.send(request) {
            Ok(()) => true,
            Err(send_err) => {
                let request = send_err.0;
                lock_in_flight(&self.in_flight).remove(&key);
                error!(
                    "event=webhook_dispatch module=webhook status=error reason=worker_unavailable geofence_id={} transition={}",
                    request.geofence_id, request.transition
                );
                false
            }
        }
    }

    /// Number of webhook posts currently outstanding.
    pub fn in_flight_count(&self) -> usize {
        lock_in_flight(&self.in_flight).len()
    }
}

impl Default for WebhookDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WebhookDispatcher {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain pending jobs and exit.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(receiver: Receiver<WebhookRequest>, in_flight: Arc<Mutex<HashSet<InFlightKey>>>) {
    let client = match Client::builder().timeout(WEBHOOK_TIMEOUT).build() {
        Ok(client) => client,
        Err(err) => {
            error!("event=webhook_worker_init module=webhook status=error error={err}");
            return;
        }
    };

    while let Ok(request) = receiver.recv() {
        let key: InFlightKey = (request.geofence_id.clone(), request.transition);
        deliver(&client, &request);
        lock_in_flight(&in_flight).remove(&key);
    }
}

fn deliver(client: &Client, request: &WebhookRequest) {
    let payload = WebhookPayload {
        geofence_id: &request.geofence_id,
        transition: request.transition.label(),
        date: Utc::now().format(DATE_FORMAT).to_string(),
    };

    let mut builder = client
        .post(&request.url)
        .header(CONTENT_TYPE, "application/json")
        .json(&payload);
    if let Some(authorization) = &request.authorization {
        builder = builder.header(AUTHORIZATION, authorization);
    }

    match builder.send() {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                info!(
                    "event=webhook_post module=webhook status=ok geofence_id={} transition={} http_status={}",
                    request.geofence_id, request.transition, status.as_u16()
                );
            } else {
                warn!(
                    "event=webhook_post module=webhook status=rejected geofence_id={} transition={} http_status={}",
                    request.geofence_id, request.transition, status.as_u16()
                );
            }
        }
        Err(err) => {
            error!(
                "event=webhook_post module=webhook status=error geofence_id={} transition={} error={err}",
                request.geofence_id, request.transition
            );
        }
    }
}

fn lock_in_flight<'a>(
    in_flight: &'a Arc<Mutex<HashSet<InFlightKey>>>,
) -> std::sync::MutexGuard<'a, HashSet<InFlightKey>> {
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
