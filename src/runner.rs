//! Batch orchestration - selects devices and reconciles them one by one
//!
//! Each device is diffed and applied inside its own transaction. A failing
//! device is recorded and the run moves on; only selection and option
//! errors abort before anything is touched.

use inventory::{Device, Inventory, SelectionCriteria};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::SyncOptions;
use crate::engine::differ::log_diff;
use crate::engine::{ApplyOptions, apply, compute_device_diff, select_devices};
use crate::error::{Result, SyncError};
use crate::report::{DeviceOutcome, ReportBuilder, SyncReport};

/// Shared flag that stops a run before its next device
///
/// Devices already started finish with a commit or rollback.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decides whether another device may start
///
/// A limit too large to represent as an instant means no deadline.
struct StopCheck<'a> {
    token: &'a CancelToken,
    deadline: Option<(Instant, Duration)>,
}

impl<'a> StopCheck<'a> {
    fn new(token: &'a CancelToken, limit: Option<Duration>) -> Self {
        Self {
            token,
            deadline: limit
                .and_then(|limit| Instant::now().checked_add(limit).map(|at| (at, limit))),
        }
    }

    /// Why the run must stop, if it must
    ///
    /// Once this returns `Some` it keeps doing so.
    fn reason(&self) -> Option<String> {
        if self.token.is_cancelled() {
            return Some("cancelled by caller".to_string());
        }

        match self.deadline {
            Some((deadline, limit)) if Instant::now() >= deadline => Some(format!(
                "time limit of {}s reached",
                limit.as_secs()
            )),
            _ => None,
        }
    }
}

/// Reconcile every selected device
pub fn run<S: Inventory + ?Sized>(
    store: &S,
    criteria: &SelectionCriteria,
    options: &SyncOptions,
) -> Result<SyncReport> {
    run_with_cancel(store, criteria, options, &CancelToken::new())
}

/// Reconcile every selected device, stopping early when `token` is cancelled
pub fn run_with_cancel<S: Inventory + ?Sized>(
    store: &S,
    criteria: &SelectionCriteria,
    options: &SyncOptions,
    token: &CancelToken,
) -> Result<SyncReport> {
    options.validate()?;
    let devices = select_devices(store, criteria)?;

    let kinds: Vec<&str> = options.kinds.iter().map(|kind| kind.label()).collect();
    log::info!(
        "Running {} over {} device(s) for {}",
        options.mode,
        devices.len(),
        kinds.join(", ")
    );
    if options.force && options.mode.removes() {
        log::warn!("Force is enabled: protected components will be removed");
    }

    let apply_options = ApplyOptions::from(options);
    let stop = StopCheck::new(token, options.time_limit());
    let mut builder = ReportBuilder::new(options.mode, &options.kinds);

    let outcomes = if options.jobs > 1 {
        process_parallel(store, &devices, options, &apply_options, &stop)?
    } else {
        process_sequential(store, &devices, options, &apply_options, &stop)
    };

    let skipped = devices.len() - outcomes.len();
    for outcome in outcomes {
        builder.accumulate(outcome);
    }

    let cancelled = if skipped > 0 { stop.reason() } else { None };
    if let Some(reason) = &cancelled {
        log::warn!("Run stopped early ({reason}); {skipped} device(s) not started");
    }

    let report = builder.finalize(skipped, cancelled);
    log::info!(
        "Processed {} device(s): {} succeeded, {} failed, {} with changes",
        report.processed,
        report.succeeded,
        report.failed,
        report.devices_with_changes
    );

    Ok(report)
}

fn process_sequential<S: Inventory + ?Sized>(
    store: &S,
    devices: &[Device],
    options: &SyncOptions,
    apply_options: &ApplyOptions,
    stop: &StopCheck<'_>,
) -> Vec<DeviceOutcome> {
    let mut outcomes = Vec::with_capacity(devices.len());

    for (index, device) in devices.iter().enumerate() {
        if let Some(reason) = stop.reason() {
            log::warn!("Stopping before {}: {reason}", device.name);
            break;
        }

        log::info!("[{}/{}] {}", index + 1, devices.len(), device.name);
        outcomes.push(process_device(store, device, options, apply_options));
    }

    outcomes
}

fn process_parallel<S: Inventory + ?Sized>(
    store: &S,
    devices: &[Device],
    options: &SyncOptions,
    apply_options: &ApplyOptions,
    stop: &StopCheck<'_>,
) -> Result<Vec<DeviceOutcome>> {
    let results: Mutex<Vec<DeviceOutcome>> = Mutex::new(Vec::with_capacity(devices.len()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs)
        .build()
        .map_err(|e| SyncError::Config(format!("failed to create worker pool: {e}")))?;

    pool.install(|| {
        devices.par_iter().for_each(|device| {
            if stop.reason().is_some() {
                return;
            }

            log::info!("Processing {}", device.name);
            let outcome = process_device(store, device, options, apply_options);
            push_outcome(&results, outcome);
        });
    });

    Ok(results.into_inner().unwrap_or_else(PoisonError::into_inner))
}

fn push_outcome(results: &Mutex<Vec<DeviceOutcome>>, outcome: DeviceOutcome) {
    match results.lock() {
        Ok(mut locked) => locked.push(outcome),
        Err(poisoned) => poisoned.into_inner().push(outcome),
    }
}

/// Diff and apply one device; never fails the run
fn process_device<S: Inventory + ?Sized>(
    store: &S,
    device: &Device,
    options: &SyncOptions,
    apply_options: &ApplyOptions,
) -> DeviceOutcome {
    let result = compute_device_diff(store, device, &options.kinds, options.detect_drift)
        .and_then(|diff| {
            log_diff(&diff);
            let kinds = apply(store, &diff, options.mode, apply_options)?;
            Ok((diff.device_type, kinds))
        });

    match result {
        Ok((device_type, kinds)) => DeviceOutcome::succeeded(device, device_type.to_string(), kinds),
        Err(err) => {
            if matches!(err, SyncError::ProtectedComponentViolation { .. }) {
                log::error!("{}: internal error, device rolled back: {err}", device.name);
            } else {
                log::error!("{}: {err}", device.name);
            }
            DeviceOutcome::failed(device, &err)
        }
    }
}
