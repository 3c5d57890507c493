//! Background preview extraction (thumbnails, waveforms). A fixed pool of
//! worker threads bounds how many extractions run at once; requests for the
//! same key supersede each other and stale results never reach the UI.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::{sync::Arc, thread, time::Duration};
use thiserror::Error;
use uuid::Uuid;

mod scheduler;

pub use scheduler::{PreviewScheduler, SlotStatus};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    #[error("worker stopped")]
    Stopped,
    #[error("extraction failed: {0}")]
    Extraction(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PreviewKind {
    #[serde(rename_all = "camelCase")]
    Thumbnail { source_time: f64 },
    Waveform { width: u32, height: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    /// Identity of the preview slot, e.g. one thumbnail tile of one clip.
    pub key: String,
    pub asset_id: String,
    pub kind: PreviewKind,
    #[serde(default)]
    pub priority: i32,
}

impl PreviewRequest {
    pub fn thumbnail(key: impl Into<String>, asset_id: impl Into<String>, source_time: f64) -> Self {
        Self { key: key.into(), asset_id: asset_id.into(), kind: PreviewKind::Thumbnail { source_time }, priority: 0 }
    }

    pub fn waveform(key: impl Into<String>, asset_id: impl Into<String>, width: u32, height: u32) -> Self {
        Self { key: key.into(), asset_id: asset_id.into(), kind: PreviewKind::Waveform { width, height }, priority: 0 }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewOutput {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PreviewStatus {
    Pending,
    Running,
    Done(PreviewOutput),
    Failed(String),
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewEvent {
    pub id: String,
    pub key: String,
    pub generation: u64,
    pub status: PreviewStatus,
}

/// The actual extraction, usually a bridge call to the host.
pub trait PreviewExtractor: Send + Sync + 'static {
    fn extract(&self, req: &PreviewRequest) -> Result<PreviewOutput, JobError>;
}

impl<F> PreviewExtractor for F
where
    F: Fn(&PreviewRequest) -> Result<PreviewOutput, JobError> + Send + Sync + 'static,
{
    fn extract(&self, req: &PreviewRequest) -> Result<PreviewOutput, JobError> {
        self(req)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub key: String,
    pub generation: u64,
}

#[derive(Debug)]
struct Queued {
    id: String,
    generation: u64,
    req: PreviewRequest,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<VecDeque<Queued>>,
    available: Condvar,
    generations: Mutex<HashMap<String, u64>>,
    stop: AtomicBool,
}

impl Shared {
    fn is_current(&self, key: &str, generation: u64) -> bool {
        self.generations.lock().get(key) == Some(&generation)
    }

    fn bump(&self, key: &str) -> u64 {
        let mut gens = self.generations.lock();
        let g = gens.entry(key.to_string()).or_insert(0);
        *g += 1;
        *g
    }
}

#[derive(Clone)]
pub struct PreviewHandle {
    tx_submit: Sender<Queued>,
    tx_cancel: Sender<String>,
    rx_events: Receiver<PreviewEvent>,
    shared: Arc<Shared>,
    workers: Arc<Mutex<Vec<thread::JoinHandle<()>>>>,
}

pub struct PreviewRuntime;

impl PreviewRuntime {
    pub fn start<E: PreviewExtractor>(num_workers: usize, extractor: E) -> PreviewHandle {
        let (tx_submit, rx_submit) = unbounded::<Queued>();
        let (tx_cancel, rx_cancel) = unbounded::<String>();
        let (tx_events, rx_events) = unbounded::<PreviewEvent>();
        let shared = Arc::new(Shared::default());
        let extractor: Arc<dyn PreviewExtractor> = Arc::new(extractor);

        let workers = (0..num_workers.max(1))
            .map(|_| spawn_worker(shared.clone(), extractor.clone(), tx_events.clone()))
            .collect::<Vec<_>>();

        // Feeder thread
        {
            let shared = shared.clone();
            thread::spawn(move || loop {
                crossbeam_channel::select! {
                    recv(rx_submit) -> msg => {
                        let Ok(job) = msg else { break };
                        let mut q = shared.queue.lock();
                        // newer request for the same key replaces the queued one
                        for old in drain_where(&mut q, |j| j.req.key == job.req.key) {
                            let _ = tx_events.send(event(&old, PreviewStatus::Canceled));
                        }
                        let _ = tx_events.send(event(&job, PreviewStatus::Pending));
                        let pos = q.iter().position(|j| j.req.priority < job.req.priority).unwrap_or(q.len());
                        q.insert(pos, job);
                        shared.available.notify_one();
                    }
                    recv(rx_cancel) -> msg => {
                        let Ok(key) = msg else { break };
                        let mut q = shared.queue.lock();
                        for old in drain_where(&mut q, |j| j.req.key == key) {
                            let _ = tx_events.send(event(&old, PreviewStatus::Canceled));
                        }
                    }
                    default(Duration::from_millis(50)) => {
                        if shared.stop.load(Ordering::Acquire) { break; }
                    }
                }
            });
        }

        tracing::info!(workers = num_workers.max(1), "preview runtime started");
        PreviewHandle { tx_submit, tx_cancel, rx_events, shared, workers: Arc::new(Mutex::new(workers)) }
    }
}

fn event(job: &Queued, status: PreviewStatus) -> PreviewEvent {
    PreviewEvent { id: job.id.clone(), key: job.req.key.clone(), generation: job.generation, status }
}

fn drain_where(q: &mut VecDeque<Queued>, pred: impl Fn(&Queued) -> bool) -> Vec<Queued> {
    let mut removed = Vec::new();
    let mut kept = VecDeque::with_capacity(q.len());
    for job in q.drain(..) {
        if pred(&job) { removed.push(job) } else { kept.push_back(job) }
    }
    *q = kept;
    removed
}

fn spawn_worker(shared: Arc<Shared>, extractor: Arc<dyn PreviewExtractor>, tx_e: Sender<PreviewEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        let job = {
            let mut q = shared.queue.lock();
            loop {
                if shared.stop.load(Ordering::Acquire) { return; }
                if let Some(job) = q.pop_front() { break job; }
                shared.available.wait_for(&mut q, Duration::from_millis(50));
            }
        };
        if !shared.is_current(&job.req.key, job.generation) {
            let _ = tx_e.send(event(&job, PreviewStatus::Canceled));
            continue;
        }
        let _ = tx_e.send(event(&job, PreviewStatus::Running));
        let status = match extractor.extract(&job.req) {
            Ok(out) => PreviewStatus::Done(out),
            Err(e) => {
                tracing::warn!(key = %job.req.key, error = %e, "preview extraction failed");
                PreviewStatus::Failed(e.to_string())
            }
        };
        if shared.is_current(&job.req.key, job.generation) {
            let _ = tx_e.send(event(&job, status));
        } else {
            tracing::debug!(key = %job.req.key, "dropping stale preview");
            let _ = tx_e.send(event(&job, PreviewStatus::Canceled));
        }
    })
}

impl PreviewHandle {
    /// Queues an extraction. Any earlier request for the same key becomes stale.
    pub fn request(&self, req: PreviewRequest) -> Ticket {
        let generation = self.shared.bump(&req.key);
        let id = Uuid::new_v4().to_string();
        let ticket = Ticket { id: id.clone(), key: req.key.clone(), generation };
        if self.tx_submit.send(Queued { id, generation, req }).is_err() {
            tracing::warn!(key = %ticket.key, "preview runtime stopped, request dropped");
        }
        ticket
    }

    /// The key left the viewport: drop its queued work and any in-flight result.
    pub fn cancel_key(&self, key: &str) {
        self.shared.bump(key);
        let _ = self.tx_cancel.send(key.to_string());
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.shared.is_current(&ticket.key, ticket.generation)
    }

    pub fn queued(&self) -> usize { self.shared.queue.lock().len() }

    /// Drains events without blocking; finished results of superseded
    /// requests are filtered out.
    pub fn poll(&self) -> Vec<PreviewEvent> {
        self.rx_events
            .try_iter()
            .filter(|ev| match ev.status {
                PreviewStatus::Done(_) | PreviewStatus::Failed(_) => self.shared.is_current(&ev.key, ev.generation),
                _ => true,
            })
            .collect()
    }

    /// Stops the workers after their current extraction and joins them.
    pub fn shutdown(&self) -> Result<(), JobError> {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.available.notify_all();
        let workers = std::mem::take(&mut *self.workers.lock());
        let mut result = Ok(());
        for w in workers {
            if w.join().is_err() { result = Err(JobError::Stopped); }
        }
        tracing::info!("preview runtime stopped");
        result
    }
}
