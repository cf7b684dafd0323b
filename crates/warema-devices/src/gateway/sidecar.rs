//! Gateway daemon client.
//!
//! A small daemon owns the USB stick and runs warema-wms-api. It speaks
//! newline-delimited JSON over TCP:
//!
//! - bridge -> daemon: `{"method": "vnBlindSetPosition", "params": {...}}`
//! - daemon -> bridge: `{"topic": "wms-vb-blind-position-update", "payload": {...}}`
//!
//! On every (re)connect the client first sends `init` with the radio
//! settings; the daemon answers with a fresh `wms-vb-init-completion`.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use warema_core::config::defaults;
use warema_core::DeviceId;

use super::{Gateway, GatewayEvent};
use crate::adapter::{AdapterError, AdapterResult};

const CHANNEL_CAPACITY: usize = 100;

/// Daemon address and radio settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// `host:port` of the daemon
    pub addr: String,
    pub serial_port: String,
    pub channel: u8,
    pub pan_id: String,
    pub key: String,
    pub reconnect_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            addr: defaults::GATEWAY_ADDR.to_string(),
            serial_port: defaults::SERIAL_PORT.to_string(),
            channel: defaults::CHANNEL,
            pan_id: defaults::PAN_ID.to_string(),
            key: defaults::KEY.to_string(),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Request line sent to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum GatewayRequest {
    #[serde(rename = "init")]
    Init {
        port: String,
        channel: u8,
        #[serde(rename = "panId")]
        pan_id: String,
        key: String,
    },
    #[serde(rename = "vnBlindAdd")]
    BlindAdd { snr: DeviceId, name: String },
    #[serde(rename = "vnBlindSetPosition")]
    BlindSetPosition {
        snr: DeviceId,
        position: i64,
        angle: i64,
    },
    #[serde(rename = "vnBlindStop")]
    BlindStop { snr: DeviceId },
    #[serde(rename = "setPosUpdInterval")]
    SetPosUpdInterval { interval: u64 },
    #[serde(rename = "setWatchMovingBlindsInterval")]
    SetWatchMovingBlindsInterval { interval: u64 },
    #[serde(rename = "scanDevices")]
    ScanDevices {
        #[serde(rename = "autoAssignBlinds")]
        auto_assign_blinds: bool,
    },
}

impl GatewayRequest {
    fn init(config: &GatewayConfig) -> Self {
        Self::Init {
            port: config.serial_port.clone(),
            channel: config.channel,
            pan_id: config.pan_id.clone(),
            key: config.key.clone(),
        }
    }

    fn to_line(&self) -> AdapterResult<Vec<u8>> {
        let mut line = serde_json::to_vec(self).map_err(|e| AdapterError::Other(e.into()))?;
        line.push(b'\n');
        Ok(line)
    }
}

fn millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

type SharedWriter = Arc<Mutex<Option<OwnedWriteHalf>>>;

/// [`Gateway`] backed by a TCP connection to the daemon.
#[derive(Clone)]
pub struct SidecarGateway {
    writer: SharedWriter,
}

impl SidecarGateway {
    /// Spawn the connection task and return the gateway handle with its
    /// event stream. The task reconnects until the receiver is dropped.
    pub fn connect(config: GatewayConfig) -> AdapterResult<(Self, mpsc::Receiver<GatewayEvent>)> {
        if config.addr.trim().is_empty() {
            return Err(AdapterError::Configuration(
                "Gateway address is empty".to_string(),
            ));
        }

        let writer: SharedWriter = Arc::new(Mutex::new(None));
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run_connection(config, writer.clone(), tx));

        Ok((Self { writer }, rx))
    }

    pub async fn is_connected(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    async fn send(&self, request: GatewayRequest) -> AdapterResult<()> {
        let line = request.to_line()?;
        let mut guard = self.writer.lock().await;
        let Some(write) = guard.as_mut() else {
            return Err(AdapterError::Connection(
                "Gateway not connected".to_string(),
            ));
        };

        if let Err(e) = write.write_all(&line).await {
            warn!("Failed to write to gateway, dropping connection: {}", e);
            guard.take();
            return Err(e.into());
        }
        debug!(?request, "Sent gateway request");
        Ok(())
    }
}

async fn run_connection(
    config: GatewayConfig,
    writer: SharedWriter,
    tx: mpsc::Sender<GatewayEvent>,
) {
    loop {
        match TcpStream::connect(&config.addr).await {
            Ok(stream) => {
                info!("Connected to gateway {}", config.addr);
                let (read, mut write) = stream.into_split();

                // init goes out before any queued request can take the writer
                let mut guard = writer.lock().await;
                let init = GatewayRequest::init(&config).to_line();
                match init {
                    Ok(line) => match write.write_all(&line).await {
                        Ok(()) => *guard = Some(write),
                        Err(e) => error!("Failed to send init to gateway: {}", e),
                    },
                    Err(e) => error!("Failed to encode init request: {}", e),
                }
                let connected = guard.is_some();
                drop(guard);

                if connected {
                    read_events(read, &tx).await;
                    writer.lock().await.take();
                }
            }
            Err(e) => {
                error!("Failed to connect to gateway {}: {}", config.addr, e);
            }
        }

        if tx.is_closed() {
            debug!("Gateway receiver dropped, stopping connection task");
            return;
        }
        warn!(
            "Reconnecting to gateway in {}s",
            config.reconnect_delay.as_secs_f32()
        );
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

async fn read_events(read: OwnedReadHalf, tx: &mpsc::Sender<GatewayEvent>) {
    let mut lines = BufReader::new(read).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match GatewayEvent::from_json(&line) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("Skipping undecodable gateway line: {}", e),
                }
            }
            Ok(None) => {
                warn!("Gateway closed the connection");
                return;
            }
            Err(e) => {
                error!("Gateway read error: {}", e);
                return;
            }
        }
    }
}

#[async_trait]
impl Gateway for SidecarGateway {
    async fn register_device(&self, id: DeviceId, name: &str) -> AdapterResult<()> {
        self.send(GatewayRequest::BlindAdd {
            snr: id,
            name: name.to_string(),
        })
        .await
    }

    async fn set_position(&self, id: DeviceId, position: i64, tilt: i64) -> AdapterResult<()> {
        self.send(GatewayRequest::BlindSetPosition {
            snr: id,
            position,
            angle: tilt,
        })
        .await
    }

    async fn stop(&self, id: DeviceId) -> AdapterResult<()> {
        self.send(GatewayRequest::BlindStop { snr: id }).await
    }

    async fn set_polling_interval(&self, interval: Duration) -> AdapterResult<()> {
        self.send(GatewayRequest::SetPosUpdInterval {
            interval: millis(interval),
        })
        .await
    }

    async fn set_moving_interval(&self, interval: Duration) -> AdapterResult<()> {
        self.send(GatewayRequest::SetWatchMovingBlindsInterval {
            interval: millis(interval),
        })
        .await
    }

    async fn scan_devices(&self, auto_assign: bool) -> AdapterResult<()> {
        self.send(GatewayRequest::ScanDevices {
            auto_assign_blinds: auto_assign,
        })
        .await
    }
}
