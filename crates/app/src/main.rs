use std::sync::Arc;

use anyhow::Context;

use forgewms_app::{Replay, Scenario};
use forgewms_events::{EventEnvelope, InMemoryEventBus};
use forgewms_infra::{InMemoryWarehouseStore, WarehouseConfig, WarehouseService};

fn main() -> anyhow::Result<()> {
    forgewms_observability::init();

    let path = std::env::args()
        .nth(1)
        .context("usage: forgewms-replay <scenario.json>")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;

    let config = WarehouseConfig::from_env();
    tracing::info!(scenario = %path, ?config, "replaying scenario");

    let service = WarehouseService::new(
        InMemoryWarehouseStore::new(),
        Arc::new(InMemoryEventBus::<EventEnvelope<serde_json::Value>>::new()),
        config,
    );
    let report = Replay::new(service).run(&scenario)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
