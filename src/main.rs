use tracing::info;

use innkeep::config::Config;
use innkeep::engine::Engine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.data_dir)?;

    let wal_path = config.wal_path();
    let engine = Engine::new(wal_path.clone())?;
    let stats = engine.stats().await;

    info!("innkeep opened {}", wal_path.display());
    info!("  wal entries: {}", engine.replayed_entries());
    info!("  rooms: {}", stats.rooms);
    info!("  guests: {}", stats.guests);
    info!(
        "  reservations: {} ({} scheduled)",
        stats.reservations, stats.scheduled
    );

    if engine.replayed_entries() >= config.compact_threshold {
        info!(
            "compacting WAL ({} entries >= threshold {})",
            engine.replayed_entries(),
            config.compact_threshold
        );
        engine.compact_wal().await?;
    }

    info!("innkeep done");
    Ok(())
}
