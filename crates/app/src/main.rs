//! Deskmate — a terminal chat scratchpad for a local LLM runtime.

mod config;
mod repl;

use providers::OllamaClient;
use session::SessionManager;
use shared::generation_api::SamplingConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let (mut settings, fresh_install) = config::load_settings_or_default();
    if fresh_install {
        if settings.auto_select_model {
            let (model, description) = providers::runtime::recommended_model();
            tracing::info!(model, description, "picked a model for this machine");
            settings.model = model.to_string();
        }
        config::save_settings(&settings);
    }

    if !providers::runtime::runtime_reachable(&settings.base_url) {
        eprintln!(
            "warning: nothing listening at {} — start `ollama serve` first",
            settings.base_url
        );
    }

    let provider = Arc::new(OllamaClient::new(Some(&settings.base_url)));
    let sampling = SamplingConfig {
        temperature: settings.temperature,
    };
    let manager = Arc::new(SessionManager::new(
        provider,
        settings.model.clone(),
        sampling,
    ));

    println!(
        "Deskmate — chatting with {} (/help for commands)",
        settings.model
    );
    repl::run(manager).await
}
