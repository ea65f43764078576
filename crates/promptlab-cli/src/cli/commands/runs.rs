use promptlab_core::Store;
use std::path::Path;

pub fn execute(db: &Path) -> anyhow::Result<()> {
    let store = Store::open(db)?;
    let runs = store.list_runs()?;
    if runs.is_empty() {
        println!("No runs recorded in {}", db.display());
        return Ok(());
    }

    println!(
        "{:<38} {:<22} {:<10} {:>7} {:>9}",
        "RUN", "STARTED", "STATUS", "TRIALS", "SUCCEEDED"
    );
    for run in runs {
        println!(
            "{:<38} {:<22} {:<10} {:>7} {:>9}",
            run.id,
            run.started_at.chars().take(19).collect::<String>(),
            run.status,
            run.total_trials,
            run.succeeded
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".into()),
        );
    }
    Ok(())
}
