use log::{error, info, warn};
use zont_client::models::zont::Envelope;
use zont_client::{Config, ZontClient};

pub fn run() -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (base_url={}, client_name={}, http_timeout={}s, max_retries={}, debug={})",
        cfg.base_url,
        cfg.client_name,
        cfg.http_timeout.as_secs(),
        cfg.max_retries,
        cfg.debug
    );

    // 2) Authenticate
    let mut client = ZontClient::new(&cfg);
    client
        .authenticate()
        .map_err(|e| format!("ZONT authentication failed: {}", e))?;
    if !client.is_authenticated() {
        let reason = client
            .session()
            .and_then(|auth| auth.error_ui().or(auth.error()))
            .unwrap_or("no token issued");
        return Err(format!("ZONT authentication rejected: {}", reason));
    }

    // 3) Discover devices
    let devices = client.list_devices().map_err(|e| format!("devices failed: {}", e))?;
    if !devices.is_ok() {
        return Err(format!(
            "devices rejected: {}",
            devices.error_ui().or(devices.error()).unwrap_or("-")
        ));
    }
    info!("Discovered {} device(s)", devices.devices().len());

    // 4) Current readings
    for device in devices.devices() {
        let Some(id) = device.id else { continue };
        let name = device.display_name().unwrap_or("-");
        let online = device.online.unwrap_or(false);

        let temp = match client.get_current_temperature(id) {
            Ok(v) => v,
            Err(e) => {
                warn!("Device {} ({}): temperature unavailable: {}", id, name, e);
                None
            }
        };
        let dhw = match client.get_current_hot_water_temperature(id) {
            Ok(v) => v,
            Err(e) => {
                warn!("Device {} ({}): hot water temperature unavailable: {}", id, name, e);
                None
            }
        };

        info!(
            "Device {} ({}): online={}, temperature={}, hot_water={}",
            id,
            name,
            online,
            temp.map(|t| format!("{:.1}", t)).unwrap_or_else(|| "-".to_string()),
            dhw.map(|t| format!("{:.1}", t)).unwrap_or_else(|| "-".to_string())
        );
    }

    Ok(())
}

fn main() {
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    info!(
        "zont-client {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
