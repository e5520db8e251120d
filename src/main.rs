use axis_controls::axis::AxisRegistry;
use axis_controls::commands::{self, ConsoleAction};
use axis_controls::config::AppConfig;
use axis_controls::controller::backend::{DeviceBackend, MockBackend};
use axis_controls::controller::device_sampler::DeviceSampler;
use axis_controls::controller::gilrs_backend::GilrsBackend;
use axis_controls::controller::mapping_db::{MappingDbUpdate, MappingDbUpdater};
use axis_controls::frame::{FrameDriver, Idle};
use axis_controls::mapping::ControlManager;
use axis_controls::persistence::{load_profile, save_profile, ConfigStore};
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Frame driven input axes for component controls
#[derive(Parser, Debug)]
#[command(name = "axis-controls")]
#[command(version)]
struct Cli {
    /// Config file, defaults to ~/.config/axis-controls/config.toml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Axis profile to load instead of the configured one
    #[arg(short, long)]
    profile: Option<String>,

    /// Run this many frames, then exit (0 runs until interrupted)
    #[arg(short, long, default_value_t = 0)]
    frames: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup()?;

    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load_or_default(&config_path)
        .await
        .map_err(|e| eyre!("Failed to load config: {}", e))?;
    if let Some(profile) = cli.profile {
        config.profile.name = profile;
        config.profile.path = None;
    }

    // Axis profile
    let mut store = ConfigStore::open(config.profile_path()).await;
    let mut registry = AxisRegistry::new();
    let report = load_profile(&store, &mut registry);
    info!(
        "Profile {} ready with {} axes",
        config.profile.name, report.loaded
    );
    let registry = registry.shared();
    let controls = ControlManager::new().shared();

    let backend: Box<dyn DeviceBackend> = match GilrsBackend::create() {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            warn!("{}, running without devices", e);
            Box::new(MockBackend::new())
        }
    };

    let cancel = CancellationToken::new();
    let (update_sender, update_receiver) = mpsc::channel::<MappingDbUpdate>(4);
    let mut updater = config.mapping_db.enabled.then(|| {
        MappingDbUpdater::spawn(
            config.mapping_db.source.clone(),
            update_sender.clone(),
            cancel.child_token(),
        )
    });

    let mut driver = FrameDriver::create(
        backend,
        DeviceSampler::new(config.sampler.clone()),
        registry.clone(),
        controls,
    )
    .with_mapping_updates(update_receiver);

    let mut ticker = interval(Duration::from_millis(config.frame_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_frame = Instant::now();
    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;

    info!("Running on the {} backend", driver.backend_name());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            line = console.next_line(), if console_open => match line {
                Ok(Some(line)) => {
                    match commands::execute(&line, driver.sampler(), &mut config.mapping_db) {
                        Ok(outcome) => {
                            println!("{}", outcome.message);
                            match outcome.action {
                                Some(ConsoleAction::CheckMappingDb) => {
                                    updater = Some(refresh_mapping_db(
                                        updater.take(),
                                        &config,
                                        &update_sender,
                                        &cancel,
                                    ));
                                }
                                Some(ConsoleAction::SaveConfig) => {
                                    if let Err(e) = config.save(&config_path).await {
                                        error!("Failed to save config: {}", e);
                                    }
                                }
                                None => {}
                            }
                        }
                        Err(commands::CommandError::Empty) => {}
                        Err(e) => println!("{}", e),
                    }
                }
                Ok(None) => {
                    debug!("Console closed");
                    console_open = false;
                }
                Err(e) => {
                    warn!("Console read failed: {}", e);
                    console_open = false;
                }
            },
            now = ticker.tick() => {
                let delta = now - last_frame;
                last_frame = now;
                driver = run_frame(driver, delta).await;
                if cli.frames > 0 && driver.frames() >= cli.frames {
                    info!("Completed {} frames", driver.frames());
                    break;
                }
            }
        }
    }

    cancel.cancel();
    if store.is_read_only() {
        warn!(
            "Profile {} could not be read, leaving {} untouched",
            config.profile.name,
            store.path().display()
        );
        return Ok(());
    }
    let saved = save_profile(&mut store, &*registry.read().await);
    store
        .save()
        .await
        .map_err(|e| eyre!("Failed to save profile {}: {}", config.profile.name, e))?;
    info!("Saved {} axes to profile {}", saved, config.profile.name);
    Ok(())
}

async fn run_frame(driver: FrameDriver<Idle>, delta: Duration) -> FrameDriver<Idle> {
    driver.sample(delta).evaluate().await.apply().await
}

// Reuses a running updater, otherwise starts one, which fetches right away
fn refresh_mapping_db(
    updater: Option<MappingDbUpdater>,
    config: &AppConfig,
    update_sender: &mpsc::Sender<MappingDbUpdate>,
    cancel: &CancellationToken,
) -> MappingDbUpdater {
    match updater {
        Some(updater) if !updater.is_finished() => {
            if let Err(e) = updater.request_refresh() {
                warn!("{}", e);
            }
            updater
        }
        _ => MappingDbUpdater::spawn(
            config.mapping_db.source.clone(),
            update_sender.clone(),
            cancel.child_token(),
        ),
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
