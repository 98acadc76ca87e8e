use elevator::{
    Positioner,
    config::{create_default_config, init_config},
    logging,
};
use std::path::PathBuf;
use tracing::info;

fn should_create_config() -> bool {
    std::env::var("CREATE_CONFIG")
        .map(|val| val == "1" || val.to_lowercase() == "true")
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if should_create_config() {
        create_default_config(None::<PathBuf>)?;
    }

    let (_config_manager, config) = init_config().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Run with CREATE_CONFIG=1 to create a default configuration file.");
        e
    })?;

    let _log_guard = logging::init(&config.logging)?;

    let mut positioner =
        Positioner::connect(config.positioner.clone(), &config.serial, config.motion.clone())
            .await?;

    if config.motion.home_on_start {
        positioner.home(config.motion.homing_speed).await?;
    }

    for command in config.move_program() {
        positioner
            .move_to_pos_and_wait(command.target_position, command.speed)
            .await?;
        info!("Platform at {:.4} m", positioner.position().await?);
    }

    positioner.power_off().await?;

    Ok(())
}
