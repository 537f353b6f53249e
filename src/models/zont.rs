//! Models for the ZONT JSON API (`https://zont-online.ru/api/docs/`).
//!
//! Scope: types only, no API client code.
//!
//! Notes
//! - The vendor omits fields freely and sometimes changes their type between devices, so every
//!   response field is an `Option` decoded through `utils::lenient`: a missing or odd value is `None`
//!   and never fails the rest of the payload. Lists of records and id-keyed maps go through
//!   `lenient_items` / `lenient_entries`, so one bad element only drops itself.
//! - The top-level `devices`, `device_tree` and `responses` lists are decoded strictly: an element
//!   that is not an object fails the whole call instead of shifting or emptying the list.
//! - Fields whose shape varies by device or firmware stay `serde_json::Value` until proven stable.
//! - Maps keyed by numeric strings (zones, sensors, weekdays, ext modes) are sparse and use `BTreeMap`.
//! - Timestamps are unix seconds.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::utils::{decode_or_skip, lenient, lenient_entries, lenient_items};

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub i64);

impl core::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One `[timestamp, value]` pair of a series.
///
/// Timestamps may arrive as floats and are truncated to whole seconds. A value that is `null`
/// or of the wrong type is kept as `None` so the sample still holds its place on the time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample<T>(pub i64, pub Option<T>);

impl<T> Sample<T> {
    pub fn time(&self) -> i64 {
        self.0
    }

    pub fn value(&self) -> Option<&T> {
        self.1.as_ref()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Sample<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut pair = Vec::<Value>::deserialize(deserializer)?.into_iter();
        let time = pair.next().unwrap_or(Value::Null);
        let time = time
            .as_i64()
            .or_else(|| time.as_f64().map(|t| t as i64))
            .ok_or_else(|| D::Error::custom(format!("sample timestamp is not a number: {}", time)))?;
        let value = pair.next().and_then(decode_or_skip);
        Ok(Sample(time, value))
    }
}

/// Latest value of a series: the last sample that carries one.
pub fn last_value<T: Copy>(series: Option<&[Sample<T>]>) -> Option<T> {
    series?.iter().rev().find_map(|s| s.1)
}

/// Common `ok` / `error` envelope carried by every response.
pub trait Envelope {
    fn ok_flag(&self) -> Option<bool>;
    fn error(&self) -> Option<&str>;
    fn error_ui(&self) -> Option<&str>;

    /// Only an explicit `ok: true` counts as success.
    fn is_ok(&self) -> bool {
        self.ok_flag() == Some(true)
    }
}

macro_rules! impl_envelope {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Envelope for $ty {
                fn ok_flag(&self) -> Option<bool> {
                    self.ok
                }

                fn error(&self) -> Option<&str> {
                    self.error.as_deref()
                }

                fn error_ui(&self) -> Option<&str> {
                    self.error_ui.as_deref()
                }
            }
        )+
    };
}

impl_envelope!(
    AuthTokenResponse,
    DevicesResponse,
    UpdateDeviceResponse,
    LoadDataResponse,
    DeviceData,
    ThermostatWorkResponse,
    ThermostatWorkData,
);

// =====================
// Requests
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientNameRequest {
    pub client_name: String,
}

/// One entry of a `load_data` fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataRequest {
    pub device_id: DeviceId,
    pub data_types: Vec<String>,
    pub mintime: i64,
    pub maxtime: i64,
}

impl DataRequest {
    pub fn new(device_id: DeviceId, data_types: &[&str], mintime: i64, maxtime: i64) -> Self {
        DataRequest {
            device_id,
            data_types: data_types.iter().map(|t| t.to_string()).collect(),
            mintime,
            maxtime,
        }
    }
}

/// Body of `load_data`. Responses come back in the same order as `requests`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoadDataRequest<'a> {
    pub requests: &'a [DataRequest],
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatTargetTemp {
    pub manual: bool,
    pub temp: f64,
}

/// Partial `update_device` patch setting target temperatures, keyed by thermostat/zone id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermostatUpdate {
    pub device_id: DeviceId,
    pub thermostat_target_temps: BTreeMap<String, ThermostatTargetTemp>,
}

// =====================
// get_authtoken
// =====================

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct AuthTokenResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_guest: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub permissions: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_staff: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_superuser: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub allow_terminal: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub fullname: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub phone: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email_confirmed: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_demo: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub guest_password_set: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub show_network_events: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub autoscan_system: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub public_api_allowed: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub zth_dashboard: Option<ZthDashboard>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub sims: Option<Vec<AccountSim>>,
    #[serde(default, deserialize_with = "lenient")]
    pub foreign_sims: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub date_last_news_reading: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub webui_beta: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub allow_new_ui: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub use_new_ui: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub ok: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_ui: Option<String>,
}

impl AuthTokenResponse {
    /// The session token, if one was issued in a form that can be sent back as a header.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_graphic()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ZthDashboard {
    #[serde(default, deserialize_with = "lenient")]
    pub show: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub enable_modes: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub enable_zones: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub enable_temperature: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub enable_alert: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct SimId {
    #[serde(default, deserialize_with = "lenient")]
    pub operator: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct SimCard {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<SimId>,
    #[serde(default, deserialize_with = "lenient")]
    pub iccid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub msisdn: Option<String>,
}

/// Billing record of a SIM card attached to the account.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct AccountSim {
    #[serde(default, deserialize_with = "lenient")]
    pub sim_card: Option<SimCard>,
    #[serde(default, deserialize_with = "lenient")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub paid_until: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub auto_prolong: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub terminated: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub first_activate: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub limit: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tariff: Option<String>,
}

// =====================
// devices / update_device
// =====================

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Option<Vec<Device>>,
    #[serde(default)]
    pub device_tree: Option<Vec<DeviceTreeEntry>>,
    #[serde(default, deserialize_with = "lenient")]
    pub ok: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_ui: Option<String>,
}

impl DevicesResponse {
    pub fn devices(&self) -> &[Device] {
        self.devices.as_deref().unwrap_or(&[])
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices().iter().find(|d| d.id == Some(id))
    }
}

/// Hierarchy link, listed next to the devices rather than inside them.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct DeviceTreeEntry {
    #[serde(rename = "ZontId", default, deserialize_with = "lenient")]
    pub zont_id: Option<DeviceId>,
}

/// `update_device` answers with the bare envelope; the rest of the body is not inspected.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct UpdateDeviceResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub ok: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_ui: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct CodeName {
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Device {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<DeviceId>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub access: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub capabilities: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub device_type: Option<CodeName>,
    #[serde(default, deserialize_with = "lenient")]
    pub widget_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub hardware_type: Option<CodeName>,
    #[serde(default, deserialize_with = "lenient")]
    pub visible_device_type: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub online: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub owner_username: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_receive_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_receive_time_relative: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub serial: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub firmware_version: Option<Vec<i64>>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_configured_by_wizard: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_configured_by_zont_wizard: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub suggest_firmware_upgrade: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub individual_device_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub individual_device_note: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub timezone: Option<i64>,

    // UI / presentation
    #[serde(default, deserialize_with = "lenient")]
    pub graphs_config: Option<GraphsConfig>,
    #[serde(default, deserialize_with = "lenient")]
    pub cams_show: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub cams: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub show_heating_tab: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub ui_settings: Option<Value>,

    // Notifications and monitoring
    #[serde(default, deserialize_with = "lenient")]
    pub server_notifications: Option<ServerNotifications>,
    /// Notification rules grouped by topic (`alarm`, `guard`, `info`, `thermostat`, ...).
    #[serde(default, deserialize_with = "lenient_entries")]
    pub notifications: Option<BTreeMap<String, BTreeMap<String, String>>>,
    #[serde(default, deserialize_with = "lenient")]
    pub debug_text_messages_regexp: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub stationary_location: Option<StationaryLocation>,
    #[serde(default, deserialize_with = "lenient")]
    pub specialist_info: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub installation_state: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub maintenances: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub work_state: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_guard_event: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub temperature_alarm: Option<TemperatureAlarm>,

    // Thermostat
    #[serde(default, deserialize_with = "lenient")]
    pub thermostat_error_input_polarity: Option<String>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub thermostat_inputconfig: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub thermostat_enable_guard: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub thermostat_ext_mode: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub thermostat_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub thermostat_gate: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub thermostat_hysteresis: Option<f64>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub thermostat_temps_limits: Option<BTreeMap<String, TempLimits>>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub thermostat_ext_modes_config: Option<BTreeMap<String, ExtModeConfig>>,
    #[serde(default, deserialize_with = "lenient")]
    pub thermostat_ext_modes_advanced: Option<bool>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub thermostat_target_temps: Option<BTreeMap<String, ThermostatTargetTemp>>,
    #[serde(default, deserialize_with = "lenient")]
    pub thermostat_relay_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tempschedule: Option<TempSchedule>,
    #[serde(default, deserialize_with = "lenient")]
    pub tempstep: Option<i64>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub thermometers: Option<Vec<Thermometer>>,

    // Boiler / OpenTherm
    #[serde(default, deserialize_with = "lenient")]
    pub boiler_info: Option<BoilerInfo>,
    #[serde(default, deserialize_with = "lenient")]
    pub boiler_delay: Option<BoilerDelay>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_save_params: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_min_setpoint: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_max_setpoint: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_max_ml: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_dhw_setpoint: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_min_wp: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_config: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_boiler_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_show_dhw_control: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot_gate_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub rf_status: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub pza: Option<Pza>,
    #[serde(default, deserialize_with = "lenient")]
    pub pza_max_delta: Option<Toggle>,
    #[serde(default, deserialize_with = "lenient")]
    pub use_internet_weather_for_pza: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub internet_weather: Option<f64>,

    // GSM / SIM / billing
    #[serde(default, deserialize_with = "lenient")]
    pub sim_in_device: Option<SimInDevice>,
    #[serde(default, deserialize_with = "lenient")]
    pub balance: Option<Balance>,
    #[serde(default, deserialize_with = "lenient")]
    pub trusted_phones: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub gsm_roaming: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub imei: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub iccid: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub filetransfers: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub asp_billing: Option<AspBilling>,
}

impl Device {
    /// Display name, preferring the per-user override.
    pub fn display_name(&self) -> Option<&str> {
        self.individual_device_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.name.as_deref())
    }

    pub fn target_temp(&self, zone_id: &str) -> Option<&ThermostatTargetTemp> {
        self.thermostat_target_temps.as_ref()?.get(zone_id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct GraphsConfig {
    #[serde(default, deserialize_with = "lenient_items")]
    pub blocks: Option<Vec<GraphBlock>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct GraphBlock {
    #[serde(default, deserialize_with = "lenient_items")]
    pub sources: Option<Vec<GraphSource>>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub height_mobile: Option<Value>,
}

/// Params differ per class (`zone_no` for zones, `therm_id` for thermometers, ...).
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct GraphSource {
    #[serde(default, deserialize_with = "lenient")]
    pub class: Option<String>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub params: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Toggle {
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct OfflineNotification {
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub timeout: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ServerNotifications {
    #[serde(default, deserialize_with = "lenient")]
    pub events: Option<Toggle>,
    #[serde(default, deserialize_with = "lenient")]
    pub offline: Option<OfflineNotification>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct StationaryLocation {
    #[serde(default, deserialize_with = "lenient")]
    pub loc: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct TemperatureAlarm {
    #[serde(default, deserialize_with = "lenient")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub low: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct TempLimits {
    #[serde(default, deserialize_with = "lenient")]
    pub max: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub min: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ExtModeConfig {
    #[serde(default, deserialize_with = "lenient")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub schedule_number: Option<Value>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub zone_sensors: Option<BTreeMap<String, Value>>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub zone_temp: Option<BTreeMap<String, f64>>,
}

/// Daily curve plus weekly curves keyed by weekday "0".."6".
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct TempSchedule {
    #[serde(default, deserialize_with = "lenient")]
    pub day: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub week: Option<BTreeMap<String, Vec<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ThermometerLimits {
    #[serde(default, deserialize_with = "lenient")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub high: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ThermometerFunction {
    #[serde(default, deserialize_with = "lenient")]
    pub f: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub zone: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Thermometer {
    #[serde(default, deserialize_with = "lenient")]
    pub is_assigned_to_slot: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub slot: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub serial: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub limits: Option<ThermometerLimits>,
    #[serde(default, deserialize_with = "lenient")]
    pub function: Option<String>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub functions: Option<Vec<ThermometerFunction>>,
    #[serde(default, deserialize_with = "lenient")]
    pub sort: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_value_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct BoilerInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct BoilerDelay {
    #[serde(default, deserialize_with = "lenient")]
    pub off: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub on: Option<i64>,
}

/// Weather-compensated heating curve.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Pza {
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub curve: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct SimInDevice {
    #[serde(default, deserialize_with = "lenient")]
    pub sim_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sim_id: Option<SimId>,
    #[serde(default, deserialize_with = "lenient")]
    pub foreign_msisdn: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Balance {
    #[serde(default, deserialize_with = "lenient")]
    pub limit: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub ussd: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub warning: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct AspBilling {
    #[serde(default, deserialize_with = "lenient")]
    pub in_service: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub allowed_for_user: Option<bool>,
}

// =====================
// load_data: telemetry
// =====================

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct LoadDataResponse {
    /// One entry per request, in request order.
    #[serde(default)]
    pub responses: Option<Vec<DeviceData>>,
    #[serde(default, deserialize_with = "lenient")]
    pub ok: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_ui: Option<String>,
}

impl LoadDataResponse {
    pub fn responses(&self) -> &[DeviceData] {
        self.responses.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct DeviceData {
    #[serde(default, deserialize_with = "lenient")]
    pub device_id: Option<DeviceId>,
    #[serde(default, deserialize_with = "lenient")]
    pub ok: Option<bool>,
    /// The server shortened the requested window.
    #[serde(default, deserialize_with = "lenient")]
    pub time_truncated: Option<bool>,
    /// Temperature series keyed by sensor id.
    #[serde(default, deserialize_with = "lenient_entries")]
    pub temperature: Option<BTreeMap<String, SensorSeries>>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub timings: Option<BTreeMap<String, Timing>>,
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_ui: Option<String>,
}

impl DeviceData {
    /// Sensor with the smallest id that has at least one sample. Ordering by id keeps
    /// the pick stable across calls.
    pub fn first_sensor(&self) -> Option<(&str, &SensorSeries)> {
        self.temperature
            .as_ref()?
            .iter()
            .find(|(_, series)| series.latest().is_some())
            .map(|(id, series)| (id.as_str(), series))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct SensorSeries {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sort: Option<i64>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub temperature: Option<Vec<Sample<f64>>>,
}

impl SensorSeries {
    pub fn latest(&self) -> Option<f64> {
        last_value(self.temperature.as_deref())
    }
}

/// Server-side cost of producing one data type, in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Timing {
    #[serde(default, deserialize_with = "lenient")]
    pub wall: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub proc: Option<f64>,
}

// =====================
// load_data: thermostat_work
// =====================

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ThermostatWorkResponse {
    /// One entry per request, in request order.
    #[serde(default)]
    pub responses: Option<Vec<ThermostatWorkData>>,
    #[serde(default, deserialize_with = "lenient")]
    pub ok: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_ui: Option<String>,
}

impl ThermostatWorkResponse {
    pub fn responses(&self) -> &[ThermostatWorkData] {
        self.responses.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ThermostatWorkData {
    #[serde(default, deserialize_with = "lenient")]
    pub device_id: Option<DeviceId>,
    #[serde(default, deserialize_with = "lenient")]
    pub ok: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub time_truncated: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub thermostat_work: Option<ThermostatWork>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub timings: Option<BTreeMap<String, Timing>>,
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_ui: Option<String>,
}

/// Boiler/thermostat operating state; every metric is its own series over a shared time axis.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ThermostatWork {
    #[serde(default, deserialize_with = "lenient_items")]
    pub thermostat_mode: Option<Vec<Sample<i64>>>,
    /// Domestic hot water temperature.
    #[serde(default, deserialize_with = "lenient_items")]
    pub dhw_t: Option<Vec<Sample<f64>>>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub power: Option<Vec<Sample<Value>>>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub fail: Option<Vec<Sample<Value>>>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub gate: Option<Vec<Sample<Value>>>,
    #[serde(default, deserialize_with = "lenient")]
    pub ot: Option<BurnerControl>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub zones: Option<BTreeMap<String, ZoneWork>>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub boiler_work_time: Option<Vec<Sample<f64>>>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub target_temp: Option<Vec<Sample<f64>>>,
}

impl ThermostatWork {
    pub fn latest_dhw_temp(&self) -> Option<f64> {
        last_value(self.dhw_t.as_deref())
    }
}

/// OpenTherm burner controller metrics.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct BurnerControl {
    /// Control setpoint.
    #[serde(default, deserialize_with = "lenient_items")]
    pub cs: Option<Vec<Sample<f64>>>,
    /// Boiler water temperature.
    #[serde(default, deserialize_with = "lenient_items")]
    pub bt: Option<Vec<Sample<f64>>>,
    /// Hot water temperature.
    #[serde(default, deserialize_with = "lenient_items")]
    pub dt: Option<Vec<Sample<f64>>>,
    /// Return water temperature.
    #[serde(default, deserialize_with = "lenient_items")]
    pub rwt: Option<Vec<Sample<f64>>>,
    /// Relative modulation level.
    #[serde(default, deserialize_with = "lenient_items")]
    pub rml: Option<Vec<Sample<f64>>>,
    /// Water pressure.
    #[serde(default, deserialize_with = "lenient_items")]
    pub wp: Option<Vec<Sample<f64>>>,
    /// Status flags.
    #[serde(default, deserialize_with = "lenient_items")]
    pub s: Option<Vec<Sample<Value>>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ZoneWork {
    #[serde(default, deserialize_with = "lenient_items")]
    pub target_temp: Option<Vec<Sample<f64>>>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub worktime: Option<Vec<Sample<f64>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/data/{name}")).expect("fixture present")
    }

    #[test]
    fn decodes_auth_profile() {
        let auth: AuthTokenResponse = serde_json::from_str(&fixture("get_authtoken.json")).unwrap();
        assert_eq!(auth.token(), Some("d2f1c0ffee"));
        assert!(auth.is_ok());
        assert_eq!(auth.username.as_deref(), Some("heating@example.com"));
        let sims = auth.sims.as_deref().unwrap();
        assert_eq!(sims.len(), 1);
        assert_eq!(
            sims[0].sim_card.as_ref().and_then(|c| c.msisdn.as_deref()),
            Some("79001234567")
        );
        assert_eq!(auth.zth_dashboard.as_ref().and_then(|d| d.enable_zones), Some(true));
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let auth: AuthTokenResponse = serde_json::from_str(r#"{"token":"","ok":false}"#).unwrap();
        assert_eq!(auth.token(), None);
        assert!(!auth.is_ok());

        let auth: AuthTokenResponse = serde_json::from_str(r#"{"token":"tok 123","ok":true}"#).unwrap();
        assert_eq!(auth.token(), None);
    }

    #[test]
    fn decodes_device_tree() {
        let resp: DevicesResponse = serde_json::from_str(&fixture("devices.json")).unwrap();
        assert!(resp.is_ok());
        assert_eq!(resp.devices().len(), 2);

        let tree = resp.device_tree.as_deref().unwrap();
        assert_eq!(tree[0].zont_id, Some(DeviceId(101)));

        let boiler = resp.device(DeviceId(101)).expect("device 101");
        assert_eq!(boiler.display_name(), Some("Дача"));
        assert_eq!(boiler.online, Some(true));
        assert_eq!(
            boiler.target_temp("1"),
            Some(&ThermostatTargetTemp { manual: false, temp: 22.0 })
        );
        let week = boiler.tempschedule.as_ref().and_then(|s| s.week.as_ref()).unwrap();
        assert_eq!(week.keys().map(String::as_str).collect::<Vec<_>>(), ["0", "6"]);
        let modes = boiler.thermostat_ext_modes_config.as_ref().unwrap();
        assert_eq!(modes.get("2").and_then(|m| m.name.as_deref()), Some("Расписание"));
        assert_eq!(
            boiler.thermometers.as_ref().unwrap()[0].kind.as_deref(),
            Some("ds18b20")
        );
    }

    #[test]
    fn heterogeneous_fields_do_not_poison_the_device() {
        let resp: DevicesResponse = serde_json::from_str(&fixture("devices.json")).unwrap();
        let odd = resp.device(DeviceId(202)).expect("device 202");
        // timezone arrives as a string and firmware_version as an object on this unit
        assert_eq!(odd.timezone, None);
        assert_eq!(odd.firmware_version, None);
        assert_eq!(odd.name.as_deref(), Some("Garage"));
        // the only target entry lacks a temperature; the zone is dropped, not the map
        assert_eq!(odd.target_temp("1"), None);
        assert!(odd.thermostat_target_temps.as_ref().is_some_and(BTreeMap::is_empty));
        assert!(odd.visible_device_type.as_ref().is_some_and(Value::is_string));
    }

    #[test]
    fn missing_optional_fields_decode_as_absent() {
        let resp: LoadDataResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(resp.is_ok());
        assert!(resp.responses().is_empty());

        let device: Device = serde_json::from_str(r#"{"id":5}"#).unwrap();
        assert_eq!(device.id, Some(DeviceId(5)));
        assert_eq!(device.balance, None);
    }

    #[test]
    fn picks_latest_sample_of_lowest_sensor() {
        let resp: LoadDataResponse = serde_json::from_str(&fixture("load_data.json")).unwrap();
        let data = &resp.responses()[0];
        assert_eq!(data.time_truncated, Some(true));
        let (id, series) = data.first_sensor().unwrap();
        assert_eq!(id, "10");
        assert_eq!(series.latest(), Some(21.4));
        let timing = data.timings.as_ref().and_then(|t| t.get("temperature")).unwrap();
        assert_eq!(timing.wall, Some(0.012));
    }

    #[test]
    fn decodes_thermostat_work() {
        let resp: ThermostatWorkResponse = serde_json::from_str(&fixture("thermostat_work.json")).unwrap();
        let work = resp.responses()[0].thermostat_work.as_ref().unwrap();
        assert_eq!(work.latest_dhw_temp(), Some(47.5));
        assert_eq!(work.power.as_ref().unwrap()[1].value(), Some(&Value::Bool(true)));
        let zone = work.zones.as_ref().and_then(|z| z.get("1")).unwrap();
        assert_eq!(last_value(zone.target_temp.as_deref()), Some(21.0));
        let ot = work.ot.as_ref().unwrap();
        assert_eq!(last_value(ot.wp.as_deref()), Some(1.6));
    }

    #[test]
    fn null_samples_keep_the_series_and_are_skipped_by_latest() {
        let series: SensorSeries =
            serde_json::from_str(r#"{"temperature":[[1000,20.1],[1060,null],[1120,20.5],[1180,null]]}"#).unwrap();
        let samples = series.temperature.as_deref().unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[1], Sample(1060, None));
        assert_eq!(series.latest(), Some(20.5));
    }

    #[test]
    fn float_timestamps_are_accepted() {
        let series: SensorSeries = serde_json::from_str(r#"{"temperature":[[1000.0,20.1],[1060.7,20.3]]}"#).unwrap();
        let samples = series.temperature.as_deref().unwrap();
        assert_eq!(samples[1].time(), 1060);
        assert_eq!(series.latest(), Some(20.3));
    }

    #[test]
    fn malformed_samples_drop_alone() {
        let series: SensorSeries =
            serde_json::from_str(r#"{"temperature":[[1000,19.5],"noise",[null,1.0],[1060,19.8]]}"#).unwrap();
        let times: Vec<i64> = series.temperature.as_deref().unwrap().iter().map(Sample::time).collect();
        assert_eq!(times, [1000, 1060]);
        assert_eq!(series.latest(), Some(19.8));
    }

    #[test]
    fn one_bad_zone_does_not_hide_the_others() {
        let device: Device = serde_json::from_str(
            r#"{"id":1,"thermostat_target_temps":{"1":{"manual":false,"temp":22.0},"2":{"temp":18.0}},
                "thermostat_ext_modes_config":{"1":{"name":"Эконом","zone_temp":{"1":17.0,"2":"n/a"}}},
                "tempschedule":{"week":{"0":[18.0,21.0],"1":"off"}}}"#,
        )
        .unwrap();
        assert_eq!(
            device.target_temp("1"),
            Some(&ThermostatTargetTemp { manual: false, temp: 22.0 })
        );
        assert_eq!(device.target_temp("2"), None);

        let mode = &device.thermostat_ext_modes_config.as_ref().unwrap()["1"];
        assert_eq!(mode.zone_temp.as_ref().unwrap().get("1"), Some(&17.0));
        assert_eq!(mode.zone_temp.as_ref().unwrap().get("2"), None);

        let week = device.tempschedule.as_ref().and_then(|s| s.week.as_ref()).unwrap();
        assert_eq!(week.keys().map(String::as_str).collect::<Vec<_>>(), ["0"]);
    }

    #[test]
    fn response_list_with_a_non_object_entry_is_rejected() {
        let body = r#"{"ok":true,"responses":[{"device_id":1,"ok":true},null]}"#;
        assert!(serde_json::from_str::<LoadDataResponse>(body).is_err());
        assert!(serde_json::from_str::<ThermostatWorkResponse>(body).is_err());
        assert!(serde_json::from_str::<DevicesResponse>(r#"{"devices":[{"id":1},null]}"#).is_err());

        // a device with odd fields is still a device
        let resp: DevicesResponse = serde_json::from_str(r#"{"devices":[{"id":1},{"id":"two"}]}"#).unwrap();
        assert_eq!(resp.devices().len(), 2);
        assert_eq!(resp.devices()[1].id, None);
    }

    #[test]
    fn target_temp_patch_serializes_in_wire_shape() {
        let patch = ThermostatUpdate {
            device_id: DeviceId(42),
            thermostat_target_temps: BTreeMap::from([(
                "1".to_string(),
                ThermostatTargetTemp { manual: true, temp: 21.5 },
            )]),
        };
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"device_id":42,"thermostat_target_temps":{"1":{"manual":true,"temp":21.5}}}"#
        );
    }
}
