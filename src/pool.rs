//! Worker pool and run orchestration.
//!
//! A fixed-size pool of worker slots, each bound to exactly one browser
//! session for the slot's lifetime, pulls targets from a shared queue.
//! Sessions are never shared between slots; the append-only result
//! collection behind a single mutex is the only other shared mutable state.
//!
//! Run lifecycle: Idle -> Running -> {Completed, Interrupted, Failed}.
//! The stop flag is observed between work units only. In-flight browser
//! calls complete naturally up to their own timeouts rather than being
//! killed, to avoid corrupting the remote session. A unit that errors is
//! logged with its (organization, location) context and skipped, never
//! retried, and never affects other units. Failed is reserved for pool
//! initialization failure: no slot could open a session.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::SearchConfig;
use crate::crawler;
use crate::discover::DiscoverSettings;
use crate::logger::RunLogger;
use crate::pacing::{Pacer, PacingSettings};
use crate::record::{ReviewRecord, RunOutcome, RunState, Target};
use crate::reviews;
use crate::session::{PageDriver, SessionError};

/// Everything a worker slot needs to process one unit of work.
#[derive(Debug, Clone)]
pub struct UnitContext {
    pub search: SearchConfig,
    pub discover: DiscoverSettings,
    pub pacing: PacingSettings,
    pub max_reviews: usize,
    pub run_time: DateTime<Utc>,
}

/// Pool shape and shutdown behavior.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub workers: usize,
    /// How long to wait for in-flight units after an interrupt before
    /// abandoning them.
    pub grace: Duration,
}

/// Process one target end to end on one session: crawl the listing, then
/// extract reviews for every discovered entity, pacing between entities.
pub fn process_target<D: PageDriver>(
    driver: &D,
    target: &Target,
    ctx: &UnitContext,
    pacer: &Pacer,
    logger: &RunLogger,
) -> anyhow::Result<Vec<ReviewRecord>> {
    let entities = crawler::crawl_target(driver, target, &ctx.search, &ctx.discover)?;
    logger.info(&format!("{}: {} entities accepted", target, entities.len()));

    let mut collected = Vec::new();
    for entity in entities {
        match reviews::extract_reviews(driver, &entity, ctx.max_reviews, &ctx.discover, ctx.run_time)
        {
            Ok(records) => {
                logger.info(&format!(
                    "  {}: {} reviews collected",
                    entity.name,
                    records.len()
                ));
                collected.extend(records);
            }
            Err(e) => {
                logger.warn(&format!("  {}: skipped: {}", entity.name, e));
            }
        }
        pacer.between_entities();
    }

    Ok(collected)
}

/// Run the full pool to a terminal state.
///
/// `make_session` is called once per slot; a slot whose session fails to
/// open is simply unavailable, reducing effective pool size. When no slot
/// opens, the run is Failed.
pub async fn run_pool<D, F>(
    targets: Vec<Target>,
    make_session: F,
    ctx: UnitContext,
    settings: PoolSettings,
    stop: Arc<AtomicBool>,
    logger: RunLogger,
) -> RunOutcome
where
    D: PageDriver + 'static,
    F: Fn(usize) -> Result<D, SessionError> + Send + Sync + 'static,
{
    let started_at = Utc::now();
    let targets_total = targets.len();

    let queue: Arc<Mutex<VecDeque<Target>>> = Arc::new(Mutex::new(targets.into_iter().collect()));
    let records: Arc<Mutex<Vec<ReviewRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let sessions_opened = Arc::new(AtomicUsize::new(0));
    let targets_done = Arc::new(AtomicUsize::new(0));
    let make_session = Arc::new(make_session);
    let ctx = Arc::new(ctx);

    let mut handles = Vec::with_capacity(settings.workers);
    for slot in 0..settings.workers {
        let queue = Arc::clone(&queue);
        let records = Arc::clone(&records);
        let sessions_opened = Arc::clone(&sessions_opened);
        let targets_done = Arc::clone(&targets_done);
        let make_session = Arc::clone(&make_session);
        let ctx = Arc::clone(&ctx);
        let stop = Arc::clone(&stop);
        let logger = logger.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            worker_loop(
                slot,
                queue,
                records,
                sessions_opened,
                targets_done,
                make_session.as_ref(),
                &ctx,
                stop,
                logger,
            )
        }));
    }

    for handle in handles {
        if stop.load(Ordering::SeqCst) {
            // Interrupted: give in-flight units a bounded grace window, then
            // abandon the slot. The blocking task keeps running but nothing
            // reads from it again.
            match tokio::time::timeout(settings.grace, handle).await {
                Ok(_) => {}
                Err(_) => logger.warn("Worker slot did not drain within grace period; abandoning"),
            }
        } else {
            let _ = handle.await;
        }
    }

    let records = {
        let mut guard = records.lock().unwrap();
        std::mem::take(&mut *guard)
    };
    let done = targets_done.load(Ordering::SeqCst);
    let opened = sessions_opened.load(Ordering::SeqCst);

    let state = if opened == 0 && targets_total > 0 && !stop.load(Ordering::SeqCst) {
        RunState::Failed
    } else if stop.load(Ordering::SeqCst) && done < targets_total {
        RunState::Interrupted
    } else {
        RunState::Completed
    };

    RunOutcome {
        state,
        records,
        targets_total,
        targets_done: done,
        started_at,
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop<D, F>(
    slot: usize,
    queue: Arc<Mutex<VecDeque<Target>>>,
    records: Arc<Mutex<Vec<ReviewRecord>>>,
    sessions_opened: Arc<AtomicUsize>,
    targets_done: Arc<AtomicUsize>,
    make_session: &F,
    ctx: &UnitContext,
    stop: Arc<AtomicBool>,
    logger: RunLogger,
) where
    D: PageDriver,
    F: Fn(usize) -> Result<D, SessionError>,
{
    // A slot with nothing left to pull never opens a session. This matters
    // when the pool is wider than the target list.
    if queue.lock().unwrap().is_empty() {
        debug!("Worker {}: queue already drained, not opening a session", slot);
        return;
    }

    // Opening the session is the slot's admission ticket; a failure here
    // just shrinks the pool.
    let session = match make_session(slot) {
        Ok(session) => {
            sessions_opened.fetch_add(1, Ordering::SeqCst);
            logger.debug(&format!("Worker {}: session ready", slot));
            session
        }
        Err(e) => {
            logger.error(&format!("Worker {}: session unavailable: {}", slot, e));
            return;
        }
    };

    let pacer = Pacer::new(ctx.pacing.clone());

    loop {
        // Interruption is only observed here, between units.
        if stop.load(Ordering::SeqCst) {
            debug!("Worker {}: stop observed, draining", slot);
            break;
        }

        let target = {
            let mut guard = queue.lock().unwrap();
            guard.pop_front()
        };
        let Some(target) = target else {
            break;
        };

        logger.info(&format!("Worker {}: processing {}", slot, target));
        logger.update_progress(&format!("{}", target));

        match process_target(&session, &target, ctx, &pacer, &logger) {
            Ok(collected) => {
                logger.info(&format!("{}: {} reviews total", target, collected.len()));
                let mut guard = records.lock().unwrap();
                guard.extend(collected);
            }
            Err(e) => {
                // Unit boundary: the error is logged with its target context
                // and dies here.
                logger.error(&format!("{}: unit failed: {}", target, e));
            }
        }

        targets_done.fetch_add(1, Ordering::SeqCst);
        logger.advance_progress(1);
        pacer.between_targets();
    }

    drop(session);
    debug!("Worker {}: done", slot);
}
