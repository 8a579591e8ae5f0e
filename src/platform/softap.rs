//! SoftAP 热点
//!
//! 使用 AP+STA 混合模式，这样在热点开启期间仍然可以扫描周围的网络。

use std::net::Ipv4Addr;

use anyhow::anyhow;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    ipv4::{self, Mask, Subnet},
    netif::{EspNetif, NetifConfiguration, NetifStack},
    wifi::{
        AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration,
        Configuration as WifiConfig, EspWifi, WifiDriver,
    },
};

use crate::captive_portal::AccessPoint;

const AP_IP: ipv4::Ipv4Addr = ipv4::Ipv4Addr::new(192, 168, 4, 1);
const AP_NETMASK: Mask = Mask(24);
/// WPA2 要求的最短口令
const MIN_WPA2_PASS: usize = 8;

pub struct SoftAp {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl SoftAp {
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> anyhow::Result<Self> {
        // AP 接口固定 192.168.4.1，并作为 DNS 下发给客户端
        let ap_netif_config = NetifConfiguration {
            ip_configuration: Some(ipv4::Configuration::Router(ipv4::RouterConfiguration {
                subnet: Subnet {
                    gateway: AP_IP,
                    mask: AP_NETMASK,
                },
                dhcp_enabled: true,
                dns: Some(AP_IP),
                secondary_dns: None,
            })),
            ..NetifConfiguration::wifi_default_router()
        };
        let ap_netif = EspNetif::new_with_conf(&ap_netif_config)?;

        let driver = WifiDriver::new(modem, sysloop.clone(), None)?;
        let sta_netif = EspNetif::new(NetifStack::Sta)?;

        let wifi = BlockingWifi::wrap(EspWifi::wrap_all(driver, sta_netif, ap_netif)?, sysloop)?;

        Ok(Self { wifi })
    }
}

impl AccessPoint for SoftAp {
    fn start(&mut self, ssid: &str, password: &str) -> anyhow::Result<Option<Ipv4Addr>> {
        let auth_method = if password.len() >= MIN_WPA2_PASS {
            AuthMethod::WPA2Personal
        } else {
            if !password.is_empty() {
                log::warn!(
                    "AP password shorter than {} characters, starting an open network",
                    MIN_WPA2_PASS
                );
            }
            AuthMethod::None
        };

        let ap_config = AccessPointConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow!("AP SSID too long: {}", ssid))?,
            password: if auth_method == AuthMethod::None {
                Default::default()
            } else {
                password
                    .try_into()
                    .map_err(|_| anyhow!("AP password too long"))?
            },
            ssid_hidden: false,
            channel: 1,
            auth_method,
            max_connections: 4,
            ..Default::default()
        };

        self.wifi.set_configuration(&WifiConfig::Mixed(
            ClientConfiguration::default(),
            ap_config,
        ))?;
        self.wifi.start()?;

        let ip = self.wifi.wifi().ap_netif().get_ip_info().ok().map(|info| info.ip);
        Ok(ip)
    }

    fn scan(&mut self) -> anyhow::Result<Vec<String>> {
        let found = self.wifi.scan()?;
        Ok(found.into_iter().map(|ap| ap.ssid.to_string()).collect())
    }
}
