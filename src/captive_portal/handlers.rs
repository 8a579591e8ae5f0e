//! 请求处理：渲染页面、保存提交的配置、触发重启

use std::net::TcpStream;

use crate::boards::{Board, Channels, Notification};
use crate::settings::{ConfigurationSet, Storage};
use crate::{form, validator};

use super::html::{self, PageContext};
use super::protocol::{self, RequestLine};
use super::server::{AccessPoint, CaptivePortal, PollOutcome, PortalState};

impl<S: Storage, A: AccessPoint, B: Board> CaptivePortal<S, A, B> {
    pub(super) fn handle_request(
        &mut self,
        stream: TcpStream,
        request: &RequestLine,
    ) -> PollOutcome {
        self.transition(PortalState::Rendering);

        // 截断的请求行里最后一个字段不完整，后面的字段全部丢失，不能保存
        let complete = !request.is_oversized();
        if request.is_submission() && !complete {
            log::warn!(
                "Request line exceeds {} bytes, submission ignored",
                protocol::MAX_REQUEST_LINE
            );
        }
        let submission = (request.is_submission() && complete)
            .then(|| form::parse_submission(request.as_str()));
        let current = match &submission {
            Some(config) => config.clone(),
            None => self.store.load(),
        };
        let networks = self.scan_networks();

        let page = html::render_page(&PageContext {
            saved: submission.as_ref(),
            current: &current,
            networks: &networks,
        });

        if let Err(e) = protocol::write_response(&mut &stream, &page) {
            log::warn!("Failed to send page: {}", e);
        }
        protocol::close_gracefully(&stream, self.config.client_timeout);
        drop(stream);

        match submission {
            Some(config) => {
                self.transition(PortalState::SubmissionReceived);
                self.apply_submission(&config);
                PollOutcome::Restarting
            }
            None => {
                self.transition(PortalState::NoSubmission);
                PollOutcome::Served
            }
        }
    }

    /// 去重并跳过隐藏网络；扫描失败时返回空列表
    fn scan_networks(&mut self) -> Vec<String> {
        match self.ap.scan() {
            Ok(found) => {
                let mut networks: Vec<String> = Vec::with_capacity(found.len());
                for name in found {
                    if !name.is_empty() && !networks.contains(&name) {
                        networks.push(name);
                    }
                }
                log::debug!("Scan found {} networks", networks.len());
                networks
            }
            Err(e) => {
                log::warn!("Network scan failed: {:?}", e);
                Vec::new()
            }
        }
    }

    fn apply_submission(&mut self, config: &ConfigurationSet) {
        if let Err(e) = self.store.save(config) {
            log::error!("Failed to save configuration: {}", e);
        }

        if validator::is_valid(config) {
            log::info!("Configuration complete");
        } else {
            log::warn!(
                "Configuration incomplete, missing: {:?}",
                validator::missing_fields(config)
            );
        }

        self.board
            .notify(Notification::ConfigurationSaved, Channels::from(config));

        std::thread::sleep(self.config.restart_delay);
        log::info!("Restarting to apply configuration");
        self.board.restart();
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpStream};
    use std::time::Duration;

    use crate::boards::{Board, Channels, Notification};
    use crate::config::PortalConfig;
    use crate::settings::memory::MemoryStorage;
    use crate::settings::{
        SettingsStore, MQTT_SERVER_PORT, MQTT_TOPIC, NETWORK_NAME, NETWORK_PASS,
    };

    use crate::captive_portal::{AccessPoint, CaptivePortal, PollOutcome, PortalState};

    struct FakeAp {
        networks: Option<Vec<String>>,
    }

    impl AccessPoint for FakeAp {
        fn start(&mut self, _ssid: &str, _password: &str) -> anyhow::Result<Option<Ipv4Addr>> {
            Ok(Some(Ipv4Addr::new(192, 168, 4, 1)))
        }

        fn scan(&mut self) -> anyhow::Result<Vec<String>> {
            self.networks
                .clone()
                .ok_or_else(|| anyhow::anyhow!("radio busy"))
        }
    }

    #[derive(Default)]
    struct RecordingBoard {
        notifications: Vec<(Notification, Channels)>,
        restarts: usize,
    }

    impl Board for RecordingBoard {
        fn notify(&mut self, notification: Notification, channels: Channels) {
            self.notifications.push((notification, channels));
        }

        fn restart(&mut self) {
            self.restarts += 1;
        }
    }

    fn test_config() -> PortalConfig {
        PortalConfig {
            port: 0,
            settle: Duration::ZERO,
            client_timeout: Duration::from_millis(500),
            restart_delay: Duration::ZERO,
            ..PortalConfig::default()
        }
    }

    fn portal(
        networks: Option<Vec<String>>,
    ) -> (MemoryStorage, CaptivePortal<MemoryStorage, FakeAp, RecordingBoard>) {
        let storage = MemoryStorage::new();
        let store = SettingsStore::new(storage.clone(), "smaf");
        let mut portal = CaptivePortal::new(
            test_config(),
            store,
            FakeAp { networks },
            RecordingBoard::default(),
        );
        portal.start().unwrap();
        (storage, portal)
    }

    /// 在后台线程发送一行请求并读取完整响应
    fn send(
        portal: &CaptivePortal<MemoryStorage, FakeAp, RecordingBoard>,
        line: &str,
    ) -> std::thread::JoinHandle<String> {
        let addr = portal.local_addr().unwrap();
        let addr = (Ipv4Addr::LOCALHOST, addr.port());
        let line = line.to_string();
        std::thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(line.as_bytes()).unwrap();
            stream.write_all(b"\r\nHost: 192.168.4.1\r\n\r\n").unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        })
    }

    /// 轮询直到处理了一个客户端
    fn poll_client(
        portal: &mut CaptivePortal<MemoryStorage, FakeAp, RecordingBoard>,
    ) -> PollOutcome {
        for _ in 0..500 {
            match portal.poll().unwrap() {
                PollOutcome::Idle => std::thread::sleep(Duration::from_millis(5)),
                outcome => return outcome,
            }
        }
        panic!("no client accepted");
    }

    #[test]
    fn test_poll_without_client_keeps_listening() {
        let (_, mut portal) = portal(Some(vec![]));
        assert_eq!(portal.state(), PortalState::Listening);
        assert_eq!(portal.poll().unwrap(), PollOutcome::Idle);
        assert_eq!(portal.state(), PortalState::Listening);
    }

    #[test]
    fn test_poll_before_start_fails() {
        let mut portal = CaptivePortal::new(
            test_config(),
            SettingsStore::new(MemoryStorage::new(), "smaf"),
            FakeAp { networks: None },
            RecordingBoard::default(),
        );
        assert!(portal.poll().is_err());
        assert_eq!(portal.state(), PortalState::Idle);
    }

    #[test]
    fn test_start_notifies_with_stored_flags() {
        let (_, portal) = portal(Some(vec![]));
        assert_eq!(portal.ap_ip(), Some(Ipv4Addr::new(192, 168, 4, 1)));
        assert_eq!(
            portal.board().notifications,
            vec![(
                Notification::PortalStarted,
                Channels {
                    audio: true,
                    visual: true
                }
            )]
        );
    }

    #[test]
    fn test_serves_form_with_scanned_networks() {
        let networks = vec![
            "HomeNet".to_string(),
            "".to_string(),
            "HomeNet".to_string(),
            "Office".to_string(),
        ];
        let (storage, mut portal) = portal(Some(networks));
        portal.store().set_text(NETWORK_NAME, "HomeNet").unwrap();

        let client = send(&portal, "GET / HTTP/1.1");
        assert_eq!(poll_client(&mut portal), PollOutcome::Served);
        let response = client.join().unwrap();

        assert!(response.starts_with(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n"
        ));
        assert!(!response.contains("class='success'"));
        assert_eq!(response.matches("<option value='HomeNet'>").count(), 1);
        assert!(response.contains("<option value='Office'>"));
        assert!(response.contains("name='netName' value='HomeNet'"));
        assert_eq!(portal.board().restarts, 0);
        // 渲染表单时读取配置会初始化缺失的键
        assert_eq!(storage.key_count("smaf"), 10);
    }

    #[test]
    fn test_scan_failure_renders_empty_list() {
        let (_, mut portal) = portal(None);

        let client = send(&portal, "GET / HTTP/1.1");
        assert_eq!(poll_client(&mut portal), PollOutcome::Served);
        let response = client.join().unwrap();

        assert!(response.contains("<datalist id='networks'></datalist>"));
    }

    #[test]
    fn test_submission_saves_and_restarts_once() {
        let (_, mut portal) = portal(Some(vec!["MyWifi".to_string()]));

        let client = send(
            &portal,
            "GET /configuration?netName=MyWifi&netPass=secret&mqttSrvPort=1883 HTTP/1.1",
        );
        assert_eq!(poll_client(&mut portal), PollOutcome::Restarting);
        let response = client.join().unwrap();

        assert!(response.contains("class='success'"));
        assert!(response.contains("<li><span>SSID Password: </span>******</li>"));

        let store = portal.store();
        assert_eq!(store.get_text(NETWORK_NAME), "MyWifi");
        assert_eq!(store.get_text(NETWORK_PASS), "secret");
        assert_eq!(store.get_int(MQTT_SERVER_PORT), 1883);

        let board = portal.board();
        assert_eq!(board.restarts, 1);
        assert_eq!(
            board.notifications.last(),
            Some(&(
                Notification::ConfigurationSaved,
                Channels {
                    audio: false,
                    visual: false
                }
            ))
        );
        assert_eq!(portal.state(), PortalState::Idle);
    }

    #[test]
    fn test_submission_with_checkboxes() {
        let (_, mut portal) = portal(Some(vec![]));

        let client = send(
            &portal,
            "GET /configuration?netName=Home+Wifi&audioNotif=on&mqttTopic=alerts%2Fkitchen HTTP/1.1",
        );
        assert_eq!(poll_client(&mut portal), PollOutcome::Restarting);
        client.join().unwrap();

        let config = portal.store().load();
        assert_eq!(config.network_name, "Home Wifi");
        assert_eq!(config.mqtt_topic, "alerts/kitchen");
        assert_eq!(config.network_pass, "");
        assert_eq!(config.mqtt_server_port, 0);
        assert!(config.audio_notifications);
        assert!(!config.visual_notifications);
    }

    #[test]
    fn test_submission_with_unwritable_storage_still_restarts() {
        let (storage, mut portal) = portal(Some(vec![]));
        storage.set_fail_open(true);

        let client = send(&portal, "GET /configuration?netName=MyWifi HTTP/1.1");
        assert_eq!(poll_client(&mut portal), PollOutcome::Restarting);
        let response = client.join().unwrap();

        assert!(response.contains("class='success'"));
        assert_eq!(portal.board().restarts, 1);
        storage.set_fail_open(false);
        assert!(!portal.store().contains(NETWORK_NAME));
    }

    #[test]
    fn test_overlong_submission_is_not_saved() {
        let (_, mut portal) = portal(Some(vec![]));
        portal.store().set_text(MQTT_TOPIC, "old-topic").unwrap();

        let line = format!(
            "GET /configuration?netName=MyWifi&mqttPass={}&mqttTopic=alerts HTTP/1.1",
            "a".repeat(2100)
        );
        let client = send(&portal, &line);
        assert_eq!(poll_client(&mut portal), PollOutcome::Served);
        let response = client.join().unwrap();

        assert!(!response.contains("class='success'"));
        assert!(response.contains("name='mqttTopic' value='old-topic'"));

        let store = portal.store();
        assert_eq!(store.get_text(MQTT_TOPIC), "old-topic");
        assert_eq!(store.get_text(NETWORK_NAME), "Unknown");
        assert_eq!(portal.board().restarts, 0);
    }

    #[test]
    fn test_silent_client_times_out() {
        let (_, mut portal) = portal(Some(vec![]));
        let addr = portal.local_addr().unwrap();
        let _client = TcpStream::connect((Ipv4Addr::LOCALHOST, addr.port())).unwrap();

        assert_eq!(poll_client(&mut portal), PollOutcome::NoRequest);
        assert_eq!(portal.state(), PortalState::Idle);
        assert_eq!(portal.board().restarts, 0);
    }
}
