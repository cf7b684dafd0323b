//! Warema WMS to MQTT bridge.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use warema_core::config::{defaults, env_vars, parse_forced, parse_ignored, parse_interval};
use warema_core::BridgeConfig;
use warema_devices::bus::mqtt::{MqttBus, MqttConfig};
use warema_devices::gateway::{GatewayConfig, SidecarGateway};
use warema_devices::topics::OFFLINE;
use warema_devices::{Bridge, Bus, Topics};

/// Bridge Warema WMS blinds and weather stations to Home Assistant over MQTT.
#[derive(Parser, Debug)]
#[command(name = "warema-bridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gateway daemon address (host:port).
    #[arg(long, env = env_vars::GATEWAY_ADDR, default_value = defaults::GATEWAY_ADDR)]
    gateway_addr: String,

    /// Serial port of the WMS USB stick, as seen by the gateway daemon.
    #[arg(long, env = env_vars::SERIAL_PORT, default_value = defaults::SERIAL_PORT)]
    serial_port: String,

    /// WMS radio channel.
    #[arg(long, env = env_vars::CHANNEL, default_value_t = defaults::CHANNEL)]
    channel: u8,

    /// WMS PAN id.
    #[arg(long, env = env_vars::PAN_ID, default_value = defaults::PAN_ID)]
    pan_id: String,

    /// WMS network key.
    #[arg(long, env = env_vars::KEY, default_value = defaults::KEY, hide_env_values = true)]
    key: String,

    /// MQTT broker URL.
    #[arg(long, env = env_vars::MQTT_SERVER, default_value = defaults::MQTT_SERVER)]
    mqtt_server: String,

    #[arg(long, env = env_vars::MQTT_USER)]
    mqtt_user: Option<String>,

    #[arg(long, env = env_vars::MQTT_PASSWORD, hide_env_values = true)]
    mqtt_password: Option<String>,

    /// MQTT client id; random when unset.
    #[arg(long, env = env_vars::MQTT_CLIENT_ID)]
    mqtt_client_id: Option<String>,

    /// Position polling interval in milliseconds.
    #[arg(long, env = env_vars::POLLING_INTERVAL, allow_hyphen_values = true)]
    polling_interval: Option<String>,

    /// Moving blinds watch interval in milliseconds.
    #[arg(long, env = env_vars::MOVING_INTERVAL, allow_hyphen_values = true)]
    moving_interval: Option<String>,

    /// Comma-separated device ids to ignore.
    #[arg(long, env = env_vars::IGNORED_DEVICES, default_value = "")]
    ignored_devices: String,

    /// Comma-separated `id[:type]` entries registered instead of scanning.
    #[arg(long, env = env_vars::FORCE_DEVICES, default_value = "")]
    force_devices: String,

    /// Topic namespace for device state and commands.
    #[arg(long, env = env_vars::NAMESPACE, default_value = defaults::NAMESPACE)]
    namespace: String,

    /// Home Assistant discovery prefix.
    #[arg(long, env = env_vars::DISCOVERY_PREFIX, default_value = defaults::DISCOVERY_PREFIX)]
    discovery_prefix: String,

    /// Emit logs as JSON.
    #[arg(long, env = env_vars::LOG_JSON)]
    log_json: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig::default()
            .with_namespace(&self.namespace)
            .with_discovery_prefix(&self.discovery_prefix)
            .with_ignored(parse_ignored(&self.ignored_devices))
            .with_forced(parse_forced(&self.force_devices))
            .with_intervals(
                parse_interval(
                    self.polling_interval.as_deref(),
                    defaults::POLLING_INTERVAL_MS,
                ),
                parse_interval(self.moving_interval.as_deref(), defaults::MOVING_INTERVAL_MS),
            )
    }

    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            addr: self.gateway_addr.clone(),
            serial_port: self.serial_port.clone(),
            channel: self.channel,
            pan_id: self.pan_id.clone(),
            key: self.key.clone(),
            ..GatewayConfig::default()
        }
    }

    fn mqtt_config(&self) -> Result<MqttConfig> {
        Ok(MqttConfig::from_url(&self.mqtt_server)
            .with_context(|| format!("Invalid {}", env_vars::MQTT_SERVER))?
            .with_credentials(self.mqtt_user.clone(), self.mqtt_password.clone())
            .with_client_id(self.mqtt_client_id.clone()))
    }
}

fn init_logging(args: &Args) {
    let default_level = if args.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "warema={0},warema_core={0},warema_devices={0},warema_bridge={0}",
            default_level
        ))
        .add_directive(tracing::Level::WARN.into())
    });

    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = args.bridge_config();
    config.validate().context("Invalid bridge configuration")?;
    let topics = Topics::from_config(&config);
    info!(
        namespace = %config.namespace,
        ignored = config.ignored.len(),
        forced = config.forced.len(),
        "Starting warema-bridge {}",
        warema_devices::VERSION
    );

    let (bus, mut bus_events) = MqttBus::connect(&args.mqtt_config()?, &topics.bridge_state());
    let bus = Arc::new(bus);
    let (gateway, mut gateway_events) =
        SidecarGateway::connect(args.gateway_config()).context("Failed to start gateway client")?;

    let mut bridge = Bridge::new(config, Arc::new(gateway), bus.clone());

    loop {
        tokio::select! {
            Some(event) = bus_events.recv() => bridge.handle_bus_event(event).await,
            Some(event) = gateway_events.recv() => bridge.handle_gateway_event(event).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            else => break,
        }
    }

    if let Err(e) = bus
        .publish(&topics.bridge_state(), OFFLINE.as_bytes().to_vec(), true)
        .await
    {
        warn!("Failed to publish offline state: {}", e);
    }
    if let Err(e) = bus.disconnect().await {
        warn!("Failed to disconnect from MQTT broker: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use warema_core::DeviceId;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["warema-bridge"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_bridge_config_from_args() {
        let args = parse(&[
            "--namespace",
            "blinds",
            "--ignored-devices",
            "0012345, junk",
            "--force-devices",
            "100:25,200:20,300",
            "--polling-interval",
            "-5",
            "--moving-interval",
            "250",
        ]);
        let config = args.bridge_config();

        assert_eq!(config.namespace, "blinds");
        assert!(config.ignored.contains(DeviceId::new(12345).unwrap()));
        assert_eq!(config.ignored.len(), 1);
        let forced: Vec<(u64, i64)> = config
            .forced
            .iter()
            .map(|f| (f.id.get(), f.device_type))
            .collect();
        assert_eq!(forced, vec![(100, 25), (200, 20), (300, 25)]);
        assert_eq!(config.polling_interval, Duration::from_millis(30_000));
        assert_eq!(config.moving_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_gateway_and_mqtt_config_from_args() {
        let args = parse(&[
            "--gateway-addr",
            "10.0.0.2:9760",
            "--channel",
            "22",
            "--mqtt-server",
            "mqtt://broker:1884",
            "--mqtt-user",
            "ha",
            "--mqtt-password",
            "secret",
        ]);

        let gateway = args.gateway_config();
        assert_eq!(gateway.addr, "10.0.0.2:9760");
        assert_eq!(gateway.channel, 22);

        let mqtt = args.mqtt_config().unwrap();
        assert_eq!(mqtt.host, "broker");
        assert_eq!(mqtt.port, 1884);
        assert_eq!(mqtt.username.as_deref(), Some("ha"));
        assert_eq!(mqtt.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_invalid_arguments_rejected() {
        assert!(Args::try_parse_from(["warema-bridge", "--channel", "300"]).is_err());

        let args = parse(&["--mqtt-server", "mqtt://broker:notaport"]);
        assert!(args.mqtt_config().is_err());
    }
}
