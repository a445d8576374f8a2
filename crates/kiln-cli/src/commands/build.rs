//! `kiln build` - one production pipeline run, non-zero exit on failure.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use kiln_builder::{BuildContext, Builder};
use kiln_config::KilnConfig;

use crate::cli::BuildArgs;
use crate::error::Result;
use crate::process::adapters_from_config;

pub async fn execute(args: BuildArgs, root: &Path) -> Result<()> {
    let mut build_overrides = serde_json::Map::new();
    if args.analyze {
        build_overrides.insert("analyze".to_string(), json!(true));
    }
    if args.quiet_build {
        build_overrides.insert("quiet".to_string(), json!(true));
    }
    let overrides = json!({ "dev": false, "build": build_overrides });

    let config = KilnConfig::load(root, Some(overrides))?;
    let adapters = adapters_from_config(&config);
    let ctx = Arc::new(BuildContext::new(config, root));

    let builder = Builder::new(ctx, adapters)?;
    let result = builder.build().await;
    if let Err(err) = builder.close().await {
        tracing::warn!(error = %err, "teardown failed");
    }
    result?;
    Ok(())
}
