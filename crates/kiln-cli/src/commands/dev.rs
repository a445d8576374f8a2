//! `kiln dev` - development loop.
//!
//! Builds once in dev mode, then waits: a restart request from the watch
//! layer tears the builder down and reconstructs everything (config
//! re-read included, so edits to watched config-adjacent files take
//! effect); Ctrl+C closes gracefully.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use kiln_builder::{BuildContext, BuildHook, Builder, RestartRequest};
use kiln_config::KilnConfig;

use crate::cli::DevArgs;
use crate::error::Result;
use crate::process::adapters_from_config;

struct RestartSignal {
    tx: mpsc::Sender<RestartRequest>,
}

#[async_trait]
impl BuildHook for RestartSignal {
    async fn watch_restart(&self, request: &RestartRequest) -> kiln_builder::Result<()> {
        let _ = self.tx.send(request.clone()).await;
        Ok(())
    }
}

pub async fn execute(args: DevArgs, root: &Path) -> Result<()> {
    loop {
        let overrides = json!({
            "dev": true,
            "env": { "KILN_DEV_PORT": args.port.to_string() },
        });
        let config = KilnConfig::load(root, Some(overrides))?;
        if let Ok(resolved) = config.to_value() {
            tracing::debug!(config = %resolved, "resolved configuration");
        }
        let adapters = adapters_from_config(&config);
        let ctx = Arc::new(BuildContext::new(config, root));

        let (restart_tx, mut restart_rx) = mpsc::channel(1);
        ctx.hooks.add(Arc::new(RestartSignal { tx: restart_tx }));

        let builder = Builder::new(ctx, adapters)?;
        if let Err(err) = builder.build().await {
            // dev mode keeps running on compile failures; the watchers
            // are not armed, so only a manual restart recovers. Surface
            // the error and stop instead of idling uselessly.
            let _ = builder.close().await;
            return Err(err.into());
        }
        tracing::info!(port = args.port, "dev build ready, watching for changes");

        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("shutting down");
                builder.close().await?;
                return Ok(());
            }
            request = restart_rx.recv() => {
                if let Some(request) = request {
                    tracing::info!(
                        event = %request.event,
                        path = %request.path.display(),
                        "restart requested"
                    );
                }
                builder.close().await?;
                // loop: reconstruct with a fresh config read
            }
        }
    }
}
