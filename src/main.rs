#[cfg(target_os = "espidf")]
use std::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;

#[cfg(target_os = "espidf")]
use smaf_portal::{
    boards::DevKitBoard,
    captive_portal::{CaptivePortal, PollOutcome},
    config::PortalConfig,
    platform::{watchdog, NvsStorage, SoftAp},
    settings::SettingsStore,
    validator,
};

/// 轮询之间的休眠，让出 CPU 给 WiFi 任务
#[cfg(target_os = "espidf")]
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let peripherals = esp_idf_svc::hal::prelude::Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let partition = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;

    let config = PortalConfig::default();
    let store = SettingsStore::new(NvsStorage::new(partition), config.namespace.clone());

    let current = store.load();
    log::info!("Stored configuration: {}", current.to_log_json());

    let valid = validator::is_valid(&current);
    if !valid {
        log::warn!(
            "Configuration incomplete, missing: {:?}",
            validator::missing_fields(&current)
        );
    }

    #[cfg(feature = "boards")]
    let (button_held, led) = {
        use esp_idf_svc::hal::gpio::{OutputPin, PinDriver, Pull};

        let mut button = PinDriver::input(peripherals.pins.gpio0)?;
        button.set_pull(Pull::Up)?;
        let held = button.is_low();
        (held, Some(peripherals.pins.gpio2.downgrade_output()))
    };
    #[cfg(not(feature = "boards"))]
    let (button_held, led) = (false, None);

    if valid && !button_held {
        log::info!("Configuration valid, portal not needed");
        // 站点连接与 MQTT 由应用固件负责
        loop {
            std::thread::sleep(Duration::from_secs(60));
        }
    }

    if button_held {
        log::info!("Config button held, entering portal");
    }

    let board = DevKitBoard::new(led)?;
    let ap = SoftAp::new(peripherals.modem, sysloop)?;

    let watchdog_timeout = config.watchdog_timeout;
    let mut portal = CaptivePortal::new(config, store, ap, board);
    portal.start()?;

    watchdog::configure(watchdog_timeout)?;
    watchdog::watch_current_task()?;

    loop {
        match portal.poll() {
            Ok(PollOutcome::Restarting) => log::warn!("Restart did not happen"),
            Ok(_) => {}
            Err(e) => log::error!("Portal poll failed: {:?}", e),
        }
        watchdog::feed();
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!(
        "smaf-portal firmware only runs on ESP-IDF targets; use `cargo test` for the host-side logic"
    )
}
