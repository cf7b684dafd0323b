//! Command translator: inbound bus messages to gateway calls.

use tracing::{debug, info, warn};

use warema_core::config::defaults;
use warema_core::value::parse_int;

use crate::adapter::AdapterResult;
use crate::bridge::Bridge;
use crate::bus::BusEvent;
use crate::topics::{Command, CommandKind, Inbound};

/// Target of a `set` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetAction {
    Move { position: i64, tilt: i64 },
    Stop,
}

impl SetAction {
    fn parse(payload: &str) -> Option<Self> {
        match payload.trim().to_ascii_uppercase().as_str() {
            "CLOSE" => Some(Self::Move {
                position: 100,
                tilt: 0,
            }),
            "OPEN" => Some(Self::Move {
                position: 0,
                tilt: -100,
            }),
            "STOP" => Some(Self::Stop),
            _ => None,
        }
    }
}

impl Bridge {
    /// Handle one event from the bus transport.
    pub async fn handle_bus_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::Connected => self.handle_bus_connected().await,
            BusEvent::Message { topic, payload } => {
                self.handle_bus_message(&topic, &payload).await
            }
        }
    }

    /// Translate one inbound message.
    pub async fn handle_bus_message(&mut self, topic: &str, payload: &[u8]) {
        match self.topics.parse_inbound(topic, payload) {
            Inbound::PlatformStatus { online: true } => {
                info!("Home Assistant restarted, re-sending discovery");
                self.redeliver_discovery().await;
            }
            Inbound::PlatformStatus { online: false } => {
                debug!("Home Assistant went offline");
            }
            Inbound::Command(command) => self.handle_command(command).await,
            Inbound::Unaddressed => {}
        }
    }

    /// Re-send every cover descriptor and every announced weather station.
    /// The registry is left untouched.
    pub async fn redeliver_discovery(&self) {
        let bus = self.bus.as_ref();

        for record in self.registry.records() {
            if let Err(e) = self.discovery.publish(bus, record).await {
                warn!(device = %record.id, "Failed to re-send discovery: {}", e);
            }
        }
        for id in self.weather.announced() {
            if let Err(e) = self.weather.republish(bus, id).await {
                warn!(device = %id, "Failed to re-send weather discovery: {}", e);
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        let Command { id, kind, payload } = command;

        // The namespace wildcard also delivers our own state topics.
        if !kind.is_control() {
            return;
        }

        info!(device = %id, command = ?kind, payload = %payload, "Command received");

        // Ignored devices get no stick calls either, not only no publications.
        if !self.ensure_registered(id, defaults::DEVICE_TYPE).await {
            debug!(device = %id, "Dropping command for ignored device");
            return;
        }

        let cached = self.positions.read(id);
        let result: AdapterResult<()> = match kind {
            CommandKind::Set => match SetAction::parse(&payload) {
                Some(SetAction::Move { position, tilt }) => {
                    self.gateway.set_position(id, position, tilt).await
                }
                Some(SetAction::Stop) => self.gateway.stop(id).await,
                None => {
                    debug!(device = %id, payload = %payload, "Ignoring unknown set payload");
                    return;
                }
            },
            CommandKind::SetPosition => {
                let position = parse_int(&payload).unwrap_or(cached.position);
                self.gateway.set_position(id, position, cached.tilt).await
            }
            CommandKind::SetTilt => {
                let tilt = parse_int(&payload).unwrap_or(cached.tilt);
                self.gateway.set_position(id, cached.position, tilt).await
            }
            CommandKind::Other(_) => return,
        };

        if let Err(e) = result {
            warn!(device = %id, "Gateway command failed: {}", e);
        }
    }
}
