// crates/ethercat-esi/src/model.rs

//! Internal `serde` data structures that map directly to the persisted setup JSON.
//!
//! The editor saves `{ "setups": [ { setupname, vendorname, vendorid, groups } ] }`
//! with the devices stored inside their group. Most fields are optional and
//! numbers may be JSON numbers or strings (`"0x1A"`, `"#x1A"`, `"26"`). Blank
//! strings count as absent. The resolver validates these into the public `types`.

use crate::utils::parse_number;
use serde::{Deserialize, Serialize};

/// A numeric field as written by the editor: a JSON number or a string literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    /// Fractional sizes appear in files written by older editor versions.
    Float(f64),
    Text(String),
}

impl Number {
    /// Unsigned value; strings containing an `x` are hexadecimal.
    /// Fractions are rounded up.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Number::Int(v) => u64::try_from(*v).ok(),
            Number::Float(v) if v.is_finite() && *v >= 0.0 && *v <= u64::MAX as f64 => {
                Some(v.ceil() as u64)
            }
            Number::Float(_) => None,
            Number::Text(s) => parse_number(s),
        }
    }

    /// Signed value; accepts a leading `-` on decimal strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Int(v) => Some(*v),
            Number::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            Number::Float(_) => None,
            Number::Text(s) => s
                .trim()
                .parse()
                .ok()
                .or_else(|| parse_number(s).and_then(|v| i64::try_from(v).ok())),
        }
    }

    /// True for the empty string the editor stores for untouched inputs.
    pub fn is_blank(&self) -> bool {
        matches!(self, Number::Text(s) if s.trim().is_empty())
    }

    /// Renders `value` the way the editor writes identifiers (`"0x1A00"`).
    pub fn hex(value: impl Into<u64>) -> Self {
        Number::Text(format!("0x{:X}", value.into()))
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(v)
    }
}

/// A switch stored either as a JSON boolean or as `0`/`1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    pub fn as_bool(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(v) => v != 0,
        }
    }
}

impl Default for Flag {
    fn default() -> Self {
        Flag::Int(1)
    }
}

/// The root of a persisted setup file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSetupFile {
    #[serde(default)]
    pub setups: Vec<RawSetup>,
}

/// One vendor setup with its groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSetup {
    #[serde(default)]
    pub setupname: String,
    #[serde(default)]
    pub vendorname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendorid: Option<Number>,
    #[serde(default)]
    pub groups: Vec<RawGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGroup {
    #[serde(rename = "type")]
    pub group_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub devices: Vec<RawDevice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_no: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_no: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_manager_setup: Option<RawSyncManagerSetup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc_setup: Option<RawDcSetup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox_setup: Option<RawMailboxSetup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eeprom: Option<RawEeprom>,
    #[serde(default)]
    pub objects: Vec<RawObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawEeprom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSyncManagerSetup {
    /// Channel type codes (object 0x1C00).
    #[serde(rename = "type", default)]
    pub types: Vec<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rxpdo: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txpdo: Option<Number>,
    #[serde(default)]
    pub conf: Vec<RawSmConf>,
}

/// One sync manager channel. The editor uses the ESI attribute names here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSmConf {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_size: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_address: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_byte: Option<Number>,
    #[serde(default)]
    pub enable: Flag,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDcSetup {
    #[serde(default)]
    pub op_modes: Vec<RawOpMode>,
}

/// A DC operating mode. `CycleTymeSyncN` is the spelling the editor stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawOpMode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_activate: Option<Number>,
    #[serde(
        rename = "CycleTymeSync0",
        alias = "CycleTimeSync0",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cycle_time_sync0: Option<RawCycleTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_time_sync0: Option<Number>,
    #[serde(
        rename = "CycleTymeSync1",
        alias = "CycleTimeSync1",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cycle_time_sync1: Option<RawCycleTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_time_sync1: Option<Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCycleTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,
    #[serde(rename = "Factor", default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMailboxSetup {
    #[serde(rename = "DataLinkLayer", default)]
    pub data_link_layer: bool,
    #[serde(rename = "CoE", default, skip_serializing_if = "Option::is_none")]
    pub coe: Option<RawCoe>,
    #[serde(rename = "FoE", default)]
    pub foe: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawCoe {
    #[serde(default)]
    pub sdo_info: bool,
    #[serde(default)]
    pub pdo_assign: bool,
    #[serde(default)]
    pub pdo_config: bool,
    #[serde(default)]
    pub complete_access: bool,
    #[serde(default)]
    pub segmented_sdo: bool,
}

/// A dictionary object as stored by the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Number>,
    /// Explicit object name; the editor itself names objects through sub-index 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// "VARIABLE", "RECORD" or "ARRAY"; RECORD when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub subitems: Vec<RawSubItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_idx: Option<Number>,
    #[serde(rename = "datatype", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_restrictions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_restrictions: Option<String>,
    /// "rx", "tx" or "" for none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdo: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_accepts_json_numbers_and_strings() {
        let parsed: Vec<Number> =
            serde_json::from_str(r##"[26, "26", "0x1A", "#x1A", "-5", 4.125, ""]"##).unwrap();
        assert_eq!(parsed[0].as_u64(), Some(26));
        assert_eq!(parsed[1].as_u64(), Some(26));
        assert_eq!(parsed[2].as_u64(), Some(26));
        assert_eq!(parsed[3].as_u64(), Some(26));
        assert_eq!(parsed[4].as_i64(), Some(-5));
        assert_eq!(parsed[4].as_u64(), None);
        assert_eq!(parsed[5].as_u64(), Some(5));
        assert!(parsed[6].is_blank());
        assert!(!parsed[0].is_blank());
    }

    #[test]
    fn test_editor_file_shape() {
        let file: RawSetupFile = serde_json::from_str(
            r#"{ "setups": [ {
                "setupname": "default", "vendorname": "Acme", "vendorid": "0x1337",
                "groups": [ { "type": "IO", "name": "IO modules", "devices": [ {
                    "name": "Servo", "groupType": "IO",
                    "objects": [ { "index": "0x7000", "type": "RECORD", "subitems": [
                        { "subIdx": "0x0", "datatype": "USINT", "name": "Outputs", "defaultData": "1" },
                        { "subIdx": 1, "datatype": null, "name": null, "pdo": "" }
                    ] } ]
                } ] } ]
            } ] }"#,
        )
        .unwrap();
        let setup = &file.setups[0];
        assert_eq!(setup.vendorname, "Acme");
        assert_eq!(setup.vendorid.as_ref().and_then(Number::as_u64), Some(0x1337));
        let device = &setup.groups[0].devices[0];
        assert_eq!(device.group_type.as_deref(), Some("IO"));
        assert!(device.sync_manager_setup.is_none());
        let items = &device.objects[0].subitems;
        assert_eq!(items[0].sub_idx.as_ref().and_then(Number::as_u64), Some(0));
        assert_eq!(items[0].data_type.as_deref(), Some("USINT"));
        assert_eq!(items[1].data_type, None);
        assert_eq!(items[1].name, None);
    }

    #[test]
    fn test_editor_device_blocks() {
        let device: RawDevice = serde_json::from_str(
            r#"{ "name": "Servo",
                "syncManagerSetup": { "type": [1, 2, 3, 4], "rxpdo": 2, "txpdo": 3, "conf": [
                    { "MinSize": 36, "StartAddress": 4096, "ControlByte": 38, "Enable": 1, "Description": "MBoxOut" },
                    { "StartAddress": 4224, "Enable": false }
                ] },
                "mailboxSetup": { "DataLinkLayer": true, "CoE": { "SdoInfo": true, "SegmentedSdo": true }, "FoE": false },
                "dcSetup": { "opModes": [ { "Name": "DC", "Desc": "DC-Synchron", "AssignActivate": 768,
                    "CycleTymeSync0": { "value": 0, "Factor": 1 } } ] },
                "eeprom": { "ByteSize": 2048, "ConfigData": "06800681000000000000" } }"#,
        )
        .unwrap();

        let sm = device.sync_manager_setup.unwrap();
        assert_eq!(sm.conf[0].min_size.as_ref().and_then(Number::as_u64), Some(36));
        assert!(sm.conf[0].enable.as_bool());
        assert!(!sm.conf[1].enable.as_bool());
        assert_eq!(sm.conf[0].description, "MBoxOut");

        let mailbox = device.mailbox_setup.unwrap();
        assert!(mailbox.data_link_layer);
        let coe = mailbox.coe.unwrap();
        assert!(coe.sdo_info && coe.segmented_sdo && !coe.pdo_assign);

        let mode = &device.dc_setup.unwrap().op_modes[0];
        assert_eq!(mode.name, "DC");
        let cycle = mode.cycle_time_sync0.as_ref().unwrap();
        assert_eq!(cycle.factor.as_ref().and_then(Number::as_i64), Some(1));

        let eeprom = device.eeprom.unwrap();
        assert_eq!(eeprom.config_data.as_deref(), Some("06800681000000000000"));
    }

    #[test]
    fn test_sync_manager_enable_defaults_on() {
        let conf: RawSmConf = serde_json::from_str(r#"{ "Description": "Inputs" }"#).unwrap();
        assert!(conf.enable.as_bool());
    }
}
