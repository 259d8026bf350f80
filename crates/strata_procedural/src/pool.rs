//! # Generation Pool
//!
//! N worker threads pull chunk coordinates from a job channel and drive
//! them to Ready inside a shared [`ChunkStore`].
//!
//! ```text
//!  caller A ─┐                          ┌──> reply A
//!  caller B ─┼─> [jobs] ──> worker 1..N ┼──> reply B
//!            │     ^                    └──> reply ...
//!            │     └── NeighbourhoodBusy re-queue
//!            └─ in flight: coord -> waiting replies
//! ```
//!
//! A coordinate is in flight at most once. A caller asking for a coordinate
//! that is already queued joins its waiters instead of queueing it again, so
//! every caller hears about every coordinate it asked for. Setting the
//! shutdown flag cancels every job at its next phase boundary.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use strata_core::{ChunkCoord, StrataError};

use crate::generator::TerrainGenerator;
use crate::store::ChunkStore;

const POLL: Duration = Duration::from_millis(10);

/// How one job ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The chunk is Ready.
    Ready(ChunkCoord),
    /// Shutdown interrupted the chunk before `phase`.
    Cancelled {
        /// Chunk coordinate.
        coord: ChunkCoord,
        /// Phase that did not start.
        phase: &'static str,
    },
    /// The job failed for good.
    Failed {
        /// Chunk coordinate.
        coord: ChunkCoord,
        /// Error text.
        error: String,
    },
}

impl GenerationOutcome {
    /// Coordinate the outcome is about.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        match self {
            Self::Ready(coord) | Self::Cancelled { coord, .. } | Self::Failed { coord, .. } => *coord,
        }
    }
}

type Reply = Sender<GenerationOutcome>;

/// State shared by every worker.
struct Shared {
    generator: Arc<TerrainGenerator>,
    store: Arc<ChunkStore>,
    /// Queued or running coordinates and the replies waiting on each.
    in_flight: Mutex<HashMap<ChunkCoord, Vec<Reply>>>,
    shutdown: AtomicBool,
}

impl Shared {
    /// Hands `outcome` to every caller waiting on its coordinate.
    fn finish(&self, outcome: &GenerationOutcome) {
        let waiters = self.in_flight.lock().remove(&outcome.coord()).unwrap_or_default();
        for reply in waiters {
            if reply.send(outcome.clone()).is_err() {
                tracing::trace!(coord = %outcome.coord(), "caller stopped waiting");
            }
        }
    }
}

/// Worker pool generating chunks into a store.
pub struct GenerationPool {
    shared: Arc<Shared>,
    jobs: Sender<ChunkCoord>,
    workers: Vec<JoinHandle<()>>,
}

impl GenerationPool {
    /// Starts `workers` threads (0 = one per core).
    #[must_use]
    pub fn new(generator: Arc<TerrainGenerator>, store: Arc<ChunkStore>, workers: usize) -> Self {
        let count = if workers == 0 {
            thread::available_parallelism().map_or(1, NonZeroUsize::get)
        } else {
            workers
        };
        let shared = Arc::new(Shared {
            generator,
            store,
            in_flight: Mutex::new(HashMap::new()),
            shutdown: AtomicBool::new(false),
        });
        let (jobs, job_rx) = unbounded();

        let workers = (0..count)
            .map(|id| {
                let shared = Arc::clone(&shared);
                let jobs = jobs.clone();
                let job_rx = job_rx.clone();
                thread::spawn(move || worker_loop(id, &shared, &jobs, &job_rx))
            })
            .collect();
        tracing::info!(workers = count, "generation pool started");

        Self { shared, jobs, workers }
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queues `coord` without waiting for it. Returns false if it is already
    /// in flight or the pool is shutting down.
    pub fn submit(&self, coord: ChunkCoord) -> bool {
        self.enqueue(coord, None) == Some(true)
    }

    /// Queues `coord`, or joins its waiters if it is already queued.
    ///
    /// Returns `None` when the pool takes no more work, otherwise whether a
    /// new job was queued.
    fn enqueue(&self, coord: ChunkCoord, reply: Option<&Reply>) -> Option<bool> {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return None;
        }
        {
            let mut in_flight = self.shared.in_flight.lock();
            if let Some(waiters) = in_flight.get_mut(&coord) {
                waiters.extend(reply.cloned());
                return Some(false);
            }
            in_flight.insert(coord, reply.into_iter().cloned().collect());
        }
        if self.jobs.send(coord).is_err() {
            self.shared.in_flight.lock().remove(&coord);
            return None;
        }
        Some(true)
    }

    /// Number of jobs queued or running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.lock().len()
    }

    /// Generates every coordinate in `coords` and blocks until each has an
    /// outcome. Outcomes are returned sorted by coordinate.
    ///
    /// Safe to call from several threads at once; each call only ever sees
    /// outcomes for its own coordinates.
    pub fn generate_all(&self, coords: &[ChunkCoord]) -> Vec<GenerationOutcome> {
        let (reply, outcomes) = unbounded();
        let mut waiting: HashSet<ChunkCoord> = HashSet::with_capacity(coords.len());
        for &coord in coords {
            if !waiting.insert(coord) {
                continue;
            }
            if self.enqueue(coord, Some(&reply)).is_none() {
                waiting.remove(&coord);
            }
        }
        drop(reply);

        let mut done = Vec::with_capacity(waiting.len());
        while !waiting.is_empty() {
            match outcomes.recv_timeout(POLL) {
                Ok(outcome) => {
                    if waiting.remove(&outcome.coord()) {
                        done.push(outcome);
                    }
                }
                Err(RecvTimeoutError::Timeout) if self.workers.iter().any(|w| !w.is_finished()) => {}
                Err(_) => {
                    tracing::warn!(missing = waiting.len(), "generation workers gone before all outcomes arrived");
                    break;
                }
            }
        }
        done.sort_unstable_by_key(GenerationOutcome::coord);
        done
    }

    /// Raises the shutdown flag; running jobs stop at their next phase.
    pub fn cancel_all(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
    }

    /// Cancels outstanding work and joins every worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.cancel_all();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("generation worker panicked");
            }
        }
    }
}

impl Drop for GenerationPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(id: usize, shared: &Shared, jobs: &Sender<ChunkCoord>, job_rx: &Receiver<ChunkCoord>) {
    tracing::debug!(worker = id, "generation worker up");
    while !shared.shutdown.load(Ordering::Acquire) {
        let coord = match job_rx.recv_timeout(POLL) {
            Ok(coord) => coord,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let outcome = match shared.generator.generate_in_store(&shared.store, coord, &shared.shutdown) {
            Ok(()) => GenerationOutcome::Ready(coord),
            Err(StrataError::NeighbourhoodBusy { .. }) => {
                thread::yield_now();
                if jobs.send(coord).is_ok() {
                    continue;
                }
                GenerationOutcome::Failed { coord, error: "job queue closed".to_string() }
            }
            Err(StrataError::CancelRequested { phase, .. }) => GenerationOutcome::Cancelled { coord, phase },
            Err(error) => {
                tracing::warn!(%coord, %error, "chunk generation failed");
                GenerationOutcome::Failed { coord, error: error.to_string() }
            }
        };
        tracing::trace!(worker = id, %coord, ?outcome, "job finished");
        shared.finish(&outcome);
    }
    tracing::debug!(worker = id, "generation worker down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{BlockRegistry, EventBus, WorldConfig};

    fn pool(workers: usize) -> (GenerationPool, Arc<ChunkStore>) {
        let config = WorldConfig { seed: 5, ..WorldConfig::default() };
        let bus = EventBus::new(1024);
        let store = Arc::new(ChunkStore::new(&config, BlockRegistry::standard(), bus.sender()));
        let generator = Arc::new(TerrainGenerator::new(&config, BlockRegistry::standard()).unwrap());
        (GenerationPool::new(generator, Arc::clone(&store), workers), store)
    }

    #[test]
    fn test_generate_all_reaches_ready() {
        let (pool, store) = pool(4);
        let coords: Vec<_> = (-1..=1).flat_map(|x| (-1..=1).map(move |z| ChunkCoord::new(x, z))).collect();
        let outcomes = pool.generate_all(&coords);
        assert_eq!(outcomes.len(), 9);
        assert!(outcomes.iter().all(|o| matches!(o, GenerationOutcome::Ready(_))));
        let mut expected = coords.clone();
        expected.sort_unstable();
        assert_eq!(store.ready_coords(), expected);
        assert_eq!(store.claimed_count(), 0);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_out_of_range_fails() {
        let (pool, _store) = pool(1);
        let far = ChunkCoord::new(strata_core::MAX_CHUNK_COORD + 1, 0);
        let outcomes = pool.generate_all(&[far]);
        assert!(matches!(outcomes.as_slice(), [GenerationOutcome::Failed { .. }]));
    }

    #[test]
    fn test_concurrent_callers_each_get_their_outcomes() {
        let (pool, store) = pool(4);
        let area = |x0: i32| -> Vec<ChunkCoord> {
            (x0 - 2..=x0 + 2).flat_map(|x| (-2..=2).map(move |z| ChunkCoord::new(x, z))).collect()
        };
        let pool = &pool;
        let results: Vec<Vec<GenerationOutcome>> = thread::scope(|scope| {
            let callers: Vec<_> = [0, 40, 80]
                .into_iter()
                .map(|x0| {
                    let coords = area(x0);
                    scope.spawn(move || pool.generate_all(&coords))
                })
                .collect();
            callers.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (outcomes, x0) in results.iter().zip([0, 40, 80]) {
            assert_eq!(outcomes.len(), 25);
            assert!(outcomes.iter().all(|o| matches!(o, GenerationOutcome::Ready(c) if (c.x - x0).abs() <= 2)));
        }
        assert_eq!(store.ready_coords().len(), 75);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_overlapping_callers_share_a_job() {
        let (pool, store) = pool(2);
        let coords: Vec<_> = (-2..=2).flat_map(|x| (-1..=1).map(move |z| ChunkCoord::new(x, z))).collect();
        let pool = &pool;
        let coords = &coords;
        let results: Vec<Vec<GenerationOutcome>> = thread::scope(|scope| {
            let callers: Vec<_> = (0..2).map(|_| scope.spawn(move || pool.generate_all(coords))).collect();
            callers.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results[0].len(), 15);
        assert_eq!(results[0], results[1]);
        assert_eq!(store.ready_coords().len(), 15);
    }

    #[test]
    fn test_cancel_refuses_new_work() {
        let (pool, _store) = pool(2);
        pool.cancel_all();
        assert!(!pool.submit(ChunkCoord::new(0, 0)));
        pool.shutdown();
    }
}
