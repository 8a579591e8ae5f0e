//! 任务看门狗
//!
//! 门户循环在当前任务中运行，每次轮询后喂狗。

use std::time::Duration;

use anyhow::Context;
use esp_idf_svc::sys::{self, esp, esp_err_t};

/// 设置看门狗超时
///
/// 默认 sdkconfig（`CONFIG_ESP_TASK_WDT_INIT`）在启动时已经初始化了看门狗，
/// 此时 `esp_task_wdt_init` 返回 `INVALID_STATE`，只能通过 reconfigure 修改超时。
pub fn configure(timeout: Duration) -> anyhow::Result<()> {
    let config = sys::esp_task_wdt_config_t {
        timeout_ms: u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX),
        idle_core_mask: 0,
        trigger_panic: true,
    };

    let rc = unsafe { sys::esp_task_wdt_init(&config) };
    if rc == sys::ESP_ERR_INVALID_STATE as esp_err_t {
        esp!(unsafe { sys::esp_task_wdt_reconfigure(&config) })
            .context("esp_task_wdt_reconfigure failed")?;
        log::info!("Task watchdog reconfigured to {:?}", timeout);
    } else {
        esp!(rc).context("esp_task_wdt_init failed")?;
        log::info!("Task watchdog started with {:?}", timeout);
    }

    Ok(())
}

/// 订阅当前任务
pub fn watch_current_task() -> anyhow::Result<()> {
    esp!(unsafe { sys::esp_task_wdt_add(core::ptr::null_mut()) })
        .context("esp_task_wdt_add failed")
}

pub fn feed() {
    let rc = unsafe { sys::esp_task_wdt_reset() };
    if rc != sys::ESP_OK {
        // 当前任务未订阅时返回 NOT_FOUND
        log::debug!("esp_task_wdt_reset returned {}", rc);
    }
}
