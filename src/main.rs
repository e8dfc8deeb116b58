#![allow(dead_code, clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod catalog;
mod config;
mod device;
mod logger;
mod sequencing;

use crate::catalog::{FileCatalog, TargetCatalog};
use crate::config::SequencerConfig;
use crate::device::SimulatedPointingDevice;
use crate::sequencing::VisitSequencer;
use chrono::Timelike;
use std::time::Duration;
use std::{env, process, sync::Arc};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() { process::exit(run().await) }

async fn run() -> i32 {
    let config = SequencerConfig::from_env();

    let Ok(catalog_path) = env::var("VSD_CATALOG") else {
        error!("Catalog must be defined, set VSD_CATALOG=<run.json>");
        return 1;
    };
    let targets = match FileCatalog::new(&catalog_path).read_all() {
        Ok(t) => t,
        Err(e) => {
            error!("Could not read catalog {catalog_path}: {e}");
            return 1;
        }
    };
    if targets.is_empty() {
        warn!("Catalog {catalog_path} holds no targets, nothing to fly");
        return 0;
    }

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    // Local runs fly against the simulated device; slews complete quickly so
    // the drift policy folds the saved time into each exposure.
    let now = chrono::Local::now();
    let lst_hours =
        f64::from(now.hour()) + f64::from(now.minute()) / 60.0 + f64::from(now.second()) / 3600.0;
    let sim = Arc::new(SimulatedPointingDevice::new(lst_hours));
    sim.set_default_slew(Duration::from_millis(250));

    let mut sequencer = VisitSequencer::new(sim, config);
    match sequencer.run(&targets, &cancel).await {
        Ok(report) => {
            info!(
                "{} after {} targets, buffer {:+.2}s",
                report.outcome, report.targets_flown, report.final_budget_s
            );
            0
        }
        Err(e) => {
            error!("Run ended abnormally: {e}");
            1
        }
    }
}
