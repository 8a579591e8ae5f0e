use std::time::Duration;

use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};

use super::{Board, Channels, Notification};

const BLINK_INTERVAL: Duration = Duration::from_millis(120);

/// ESP32 开发板：状态 LED 提示，无蜂鸣器
pub struct DevKitBoard {
    led: Option<PinDriver<'static, AnyOutputPin, Output>>,
}

impl DevKitBoard {
    pub fn new(led: Option<AnyOutputPin>) -> anyhow::Result<Self> {
        let led = led.map(|pin| PinDriver::output(pin)).transpose()?;
        Ok(Self { led })
    }

    fn blink(&mut self, times: usize) {
        let Some(led) = self.led.as_mut() else {
            return;
        };

        for _ in 0..times {
            if let Err(e) = led.set_high() {
                log::error!("Failed to drive status LED: {:?}", e);
                return;
            }
            std::thread::sleep(BLINK_INTERVAL);
            let _ = led.set_low();
            std::thread::sleep(BLINK_INTERVAL);
        }
    }
}

impl Board for DevKitBoard {
    fn notify(&mut self, notification: Notification, channels: Channels) {
        log::info!(
            "Notification {:?} (audio: {}, visual: {})",
            notification,
            channels.audio,
            channels.visual
        );

        if channels.visual {
            match notification {
                Notification::PortalStarted => self.blink(2),
                Notification::ConfigurationSaved => self.blink(5),
            }
        }

        if channels.audio {
            log::debug!("No buzzer on this board, audio notification skipped");
        }
    }

    fn restart(&mut self) {
        log::warn!("Restarting device");
        unsafe { esp_idf_svc::sys::esp_restart() }
    }
}
