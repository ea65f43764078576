use crate::cli::args::ValidateArgs;
use crate::corpus;
use promptlab_core::config::EngineConfig;
use promptlab_core::providers::build_clients;

/// Checks configuration, corpus layout, and provider routing without
/// touching any network or database.
pub fn execute(args: &ValidateArgs) -> anyhow::Result<()> {
    let cfg = EngineConfig::load(&args.config)?;
    let clients = build_clients(&cfg)?;
    let prompts = corpus::load_prompts(&args.prompts)?;
    let cases = corpus::load_cases(&args.cases)?;

    println!("Config OK: {}", args.config.display());
    for (model, client) in &clients {
        println!("  {model} -> {}", client.provider_name());
    }
    println!("Prompts OK: {} file(s) in {}", prompts.len(), args.prompts.display());
    println!("Cases OK:   {} file(s) in {}", cases.len(), args.cases.display());
    println!(
        "Matrix:     {} x {} x {} = {} trials per run",
        prompts.len(),
        cases.len(),
        clients.len(),
        prompts.len() * cases.len() * clients.len()
    );
    Ok(())
}
