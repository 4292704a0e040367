//! Minimal host loop wiring up the anticipation subsystem.
//!
//! Mirrors the composition-root shape of the teacher crate's own
//! `main.rs` (`tokio::main`, `anyhow::Result`, a `tracing_subscriber`
//! registry, `dotenvy::dotenv()`, config loaded via `from_env()`) but
//! scoped to this subsystem alone: no HTTP server, no database, just
//! a handful of in-memory port implementations standing in for the
//! scene-builder, the game-state store, and location persistence that
//! a real host would supply.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use worldserver_domain::{LocationKey, NewScene, PreGeneratedScene};
use worldserver_engine::{
    ClockPort, GameStateReader, GenerationError, LocationVisitWriter, SceneGenerator, SystemClock,
    VisitWriteError, WorldServerConfig, WorldServerManager,
};

/// A fixed world graph, standing in for the persistence layer's
/// topology reads (spec.md §6, `GameStateReader`).
struct DemoWorld {
    exits: HashMap<LocationKey, Vec<LocationKey>>,
    home: LocationKey,
}

impl DemoWorld {
    fn new() -> Self {
        let home = LocationKey::new("home");
        let mut exits = HashMap::new();
        exits.insert(home.clone(), vec![LocationKey::new("tavern"), LocationKey::new("market")]);
        exits.insert(LocationKey::new("tavern"), vec![LocationKey::new("cellar")]);
        Self { exits, home }
    }
}

impl GameStateReader for DemoWorld {
    fn exits_from(&self, location: &LocationKey) -> Vec<LocationKey> {
        self.exits.get(location).cloned().unwrap_or_default()
    }

    fn active_quest_target_locations(&self) -> Vec<LocationKey> {
        vec![LocationKey::new("cellar")]
    }

    fn recently_mentioned_locations(&self, _k: usize) -> Vec<LocationKey> {
        vec![]
    }

    fn player_home_location(&self) -> Option<LocationKey> {
        Some(self.home.clone())
    }

    fn visit_counts(&self) -> Vec<(LocationKey, u64)> {
        vec![]
    }

    fn npc_current_location(&self, _npc_key: &str) -> Option<LocationKey> {
        None
    }

    fn recently_referenced_npcs(&self, _k: usize) -> Vec<String> {
        vec![]
    }
}

/// Stands in for the scene-building subsystem (spec.md §2, C4): takes
/// a location key, "renders" a scene after a simulated latency.
struct DemoSceneBuilder;

#[async_trait]
impl SceneGenerator for DemoSceneBuilder {
    async fn generate(&self, location_key: &LocationKey) -> Result<PreGeneratedScene, GenerationError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(PreGeneratedScene::new(NewScene {
            location_key: location_key.clone(),
            location_display_name: titlecase(location_key.as_str()),
            scene_manifest: json!({ "description": format!("You are at {location_key}.") }),
            npcs_present: vec![],
            items_present: vec![],
            furniture: vec![],
            atmosphere: json!({ "mood": "quiet" }),
            generated_at: Utc::now(),
            generation_time_ms: 150.0,
        }))
    }
}

fn titlecase(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Stands in for the persistence layer's visit-tracking write
/// (spec.md §6, `LocationVisitWriter`) — a real host would update a
/// database row here.
struct LoggingVisitWriter;

#[async_trait]
impl LocationVisitWriter for LoggingVisitWriter {
    async fn update_visit(&self, location_key: &LocationKey, turn: u64, first_visit: bool) -> Result<(), VisitWriteError> {
        tracing::info!(location_key = %location_key, turn, first_visit, "recorded visit");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldserver_demo=info,worldserver_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorldServerConfig::from_env().unwrap_or_default();
    tracing::info!(?config, "loaded configuration");

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
    let manager = WorldServerManager::new(
        config,
        Arc::new(DemoSceneBuilder),
        Arc::new(DemoWorld::new()),
        Arc::new(LoggingVisitWriter),
        clock,
    );

    let home = LocationKey::new("home");
    let tavern = LocationKey::new("tavern");

    manager.start(home.clone()).await;
    manager.trigger_anticipation(&home, None, None).await;

    tracing::info!("player reads the opening narration while the engine pre-generates nearby scenes");
    tokio::time::sleep(Duration::from_millis(250)).await;

    tracing::info!("player heads to the tavern");
    let result = manager.check_pre_generated(&tavern, 1).await?;
    match result {
        Some(collapse) => {
            tracing::info!(
                was_pre_generated = collapse.was_pre_generated,
                latency_ms = collapse.latency_ms,
                "collapsed from pre-generated cache"
            );
        }
        None => {
            tracing::info!("no pre-generated scene ready; a real host would now generate synchronously");
        }
    }

    let stats = manager.get_stats().await;
    tracing::info!(
        hit_rate = stats.metrics.hit_rate(),
        waste_rate = stats.metrics.waste_rate(),
        cache_size = stats.cache_stats.size,
        "final anticipation stats"
    );

    manager.shutdown().await;
    Ok(())
}
