use anyhow::Context;
use deployer_core::config::Config;
use deployer_server::AppState;
use kubectl_agent::Kubectl;
use std::sync::Arc;

pub fn run(mut config: Config, listen: Option<String>) -> anyhow::Result<()> {
    if let Some(addr) = listen {
        config.listen = addr;
    }
    config.ensure_valid().context("refusing to start")?;

    let kubectl = Kubectl::from_config(&config.kubectl);
    match kubectl.locate() {
        Ok(path) => tracing::info!(binary = %path.display(), "using kubectl"),
        Err(e) => tracing::warn!(error = %e, "passes will fail until kubectl is installed"),
    }

    let addr = config.listen.clone();
    let state = AppState::new(config, Arc::new(kubectl))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("cannot listen on {addr}"))?;
        deployer_server::serve_on(state, listener).await
    })
}
