use crate::cli::args::RunArgs;
use crate::corpus;
use anyhow::bail;
use promptlab_core::config::EngineConfig;
use promptlab_core::engine::runner::{CancelFlag, RunSettings, Runner};
use promptlab_core::providers::build_clients;
use promptlab_core::report::progress::{ProgressEvent, ProgressSink};
use promptlab_core::Store;
use std::path::Path;
use std::sync::Arc;

pub async fn execute(db: &Path, args: &RunArgs) -> anyhow::Result<()> {
    let mut cfg = EngineConfig::load(&args.config)?;
    if let Some(limit) = args.max_concurrent {
        cfg.max_concurrent_requests = limit;
    }
    if let Some(delay) = args.delay {
        cfg.request_delay_seconds = delay;
    }
    if args.sequential {
        cfg.sequential = true;
    }
    cfg.validate()?;

    let configured = cfg.model_names();
    let models = if args.models.is_empty() {
        configured
    } else {
        for requested in &args.models {
            if !configured.contains(requested) {
                bail!(
                    "model '{requested}' is not in {} (configured: {})",
                    args.config.display(),
                    configured.join(", ")
                );
            }
        }
        args.models.clone()
    };

    let prompts = corpus::load_prompts(&args.prompts)?;
    let cases = corpus::load_cases(&args.cases)?;

    let store = Store::open(db)?;
    let clients = build_clients(&cfg)?;
    let cancel = CancelFlag::new();

    // Ctrl-C stops issuing new trials; in-flight ones finish and are
    // recorded before the run is finalized.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupt received; finishing in-flight trials");
                cancel.cancel();
            }
        });
    }

    let total = prompts.len() * cases.len() * models.len();
    println!(
        "Starting run: {} prompts x {} cases x {} models = {} trials",
        prompts.len(),
        cases.len(),
        models.len(),
        total
    );
    if cfg.sequential {
        println!("Sequential mode: one trial at a time, in generation order");
    } else {
        println!(
            "Concurrency limit {}, pacing {:.1}s",
            cfg.max_concurrent_requests, cfg.request_delay_seconds
        );
    }

    let progress: ProgressSink = Arc::new(|event: ProgressEvent| {
        println!("  [{}/{}] recorded", event.done, event.total);
    });

    let runner = Runner {
        store,
        clients,
        settings: RunSettings::from_config(&cfg),
        progress: Some(progress),
        cancel,
    };
    let artifacts = runner.run(&prompts, &cases, &models).await?;

    println!("{}", "-".repeat(60));
    if artifacts.cancelled {
        println!("Run cancelled: {}", artifacts.run_id);
    } else {
        println!("Run completed: {}", artifacts.run_id);
    }
    println!(
        "Attempted: {}  succeeded: {}  failed: {}",
        artifacts.counts.attempted,
        artifacts.counts.succeeded,
        artifacts.counts.failed_total()
    );
    for (kind, count) in &artifacts.counts.failed {
        println!("  {kind}: {count}");
    }
    Ok(())
}
