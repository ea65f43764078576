use crate::cli::args::ShowArgs;
use anyhow::bail;
use promptlab_core::Store;
use std::path::Path;

pub fn execute(db: &Path, args: &ShowArgs) -> anyhow::Result<()> {
    let store = Store::open(db)?;
    let run_id = match &args.run_id {
        Some(id) => id.clone(),
        None => match store.latest_run_id()? {
            Some(id) => id,
            None => bail!("no runs recorded in {}", db.display()),
        },
    };

    let summary = store.run_summary(&run_id)?;
    println!("Run:       {}", summary.run.id);
    println!("Started:   {}", summary.run.started_at);
    if let Some(finished) = &summary.run.finished_at {
        println!("Finished:  {finished}");
    }
    println!("Status:    {}", summary.run.status);
    println!(
        "Recorded:  {}/{} trials",
        summary.recorded, summary.run.total_trials
    );
    for (status, count) in &summary.by_status {
        println!("  {status}: {count}");
    }
    if let Some(config) = &summary.run.config_json {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(config) {
            println!("Config:    {parsed}");
        }
    }

    if let Some(status) = &args.status {
        let rows = store.results_for_run(&run_id, Some(status.as_str()))?;
        println!();
        println!("{} result(s) with status '{status}':", rows.len());
        for row in rows {
            let detail = row.error_detail.unwrap_or_default();
            let detail: String = detail.chars().take(100).collect();
            println!(
                "  {} x {} x {} -> {} {}",
                row.prompt_id,
                row.case_id,
                row.model,
                row.status,
                if detail.is_empty() {
                    String::new()
                } else {
                    format!("({detail})")
                }
            );
        }
    }
    Ok(())
}
