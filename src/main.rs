mod cli;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use cli::{Args, Command};
use mixsmith::catalog::{CatalogConfigStore, CatalogPatch};
use mixsmith::config::{get_config_file_path, get_database_path, EngineConfig};
use mixsmith::database::{DatabaseManager, SqliteBlockList, SqliteCatalogConfigStore};
use mixsmith::history::CooldownStore;
use mixsmith::models::{ArtistMode, RuleSettings};
use mixsmith::spotify::client::{SpotifyClient, StaticToken};
use mixsmith::MixEngine;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(get_config_file_path);
    let mut config = EngineConfig::load_or_default(&config_path)?;

    let db_path = args.db.clone().unwrap_or_else(get_database_path);
    let db = DatabaseManager::open(&db_path).await?;
    let catalog_store = Arc::new(SqliteCatalogConfigStore::new(
        db.pool.clone(),
        config.catalog.clone(),
    ));
    let blocks = SqliteBlockList::new(db.pool.clone());
    let cooldown = CooldownStore::new(db.pool.clone(), config.cooldown_window_ms());

    match args.command {
        Command::Options => {
            let catalog = catalog_store.load().await?;
            let listing = serde_json::json!({
                "options": config.options,
                "catalog": catalog,
            });
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Command::Link { slot, id } => {
            let catalog = catalog_store.load().await?;
            let existing = catalog
                .slot(&slot)
                .ok_or_else(|| anyhow!("Unknown catalog slot '{}'", slot))?;
            let (catalog_id, kind) = SpotifyClient::parse_catalog_ref(&id, existing.kind)?;
            if kind != existing.kind {
                bail!("Slot '{}' holds a {}, got a {} link", slot, existing.kind, kind);
            }
            let mut patch = CatalogPatch::default();
            patch.link(&slot, &catalog_id, kind);
            catalog_store.patch(&patch).await?;
            log::info!("Linked '{}' to {}", slot, catalog_id);
        }
        Command::RapSources { slots } => {
            let catalog = catalog_store.load().await?;
            if let Some(unknown) = slots.iter().find(|key| catalog.slot(key).is_none()) {
                bail!("Unknown catalog slot '{}'", unknown);
            }
            catalog_store.set_rap_sources(&slots).await?;
            log::info!("Rap radio now draws from {} slot(s)", slots.len());
        }
        Command::Similar { names } => {
            catalog_store.set_similar_artists(&names).await?;
            log::info!("Similar-artist roster set to {} name(s)", names.len());
        }
        Command::Block { track_id } => {
            blocks.block(&track_id).await?;
            log::info!("Blocked {}", track_id);
        }
        Command::ClearCooldown => {
            cooldown.clear().await?;
            log::info!("Cooldown history cleared");
        }
        Command::Resolve => {
            let engine = build_engine(args.token, catalog_store, blocks, cooldown, config)?;
            let catalog = engine.resolve_all().await?;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        Command::Generate {
            option,
            length,
            calm_hype,
            discover,
            deep_cuts,
            no_explicit,
            allow_repeats,
            seed,
            offline,
        } => {
            config.seed = seed.or(config.seed);
            config.offline |= offline;

            let run_option = config
                .option(&option)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown run option '{}'", option))?;

            let defaults = RuleSettings::default();
            let rules = RuleSettings {
                total_length: length.unwrap_or(defaults.total_length),
                allow_explicit: !no_explicit,
                avoid_repeats: !allow_repeats,
                artist_mode: if deep_cuts {
                    ArtistMode::DeepCuts
                } else {
                    ArtistMode::TopTracks
                },
                calm_hype: calm_hype.unwrap_or(defaults.calm_hype),
                discover_level: discover.unwrap_or(defaults.discover_level),
            };

            let engine = build_engine(args.token, catalog_store, blocks, cooldown, config)?;
            let result = engine.generate_run_result(&run_option, &rules).await?;
            if let Some(warning) = &result.warning {
                log::warn!("{}", warning);
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    db.pool.close().await;
    Ok(())
}

fn build_engine(
    token: Option<String>,
    catalog_store: Arc<SqliteCatalogConfigStore>,
    blocks: SqliteBlockList,
    cooldown: CooldownStore,
    config: EngineConfig,
) -> Result<MixEngine> {
    let token = token.context("An access token is required (--token or MIXSMITH_TOKEN)")?;
    let client = SpotifyClient::new(Arc::new(StaticToken(token)), &config.market)?;

    Ok(MixEngine::new(
        Arc::new(client),
        Arc::new(blocks),
        catalog_store,
        cooldown,
        config,
    ))
}
