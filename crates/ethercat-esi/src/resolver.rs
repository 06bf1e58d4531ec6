// crates/ethercat-esi/src/resolver.rs

//! Resolves the loosely shaped persisted `model` into the validated public `types`,
//! and converts them back for saving.
//!
//! Objects without a usable index are dropped with a warning. Numbers that
//! cannot be parsed in any other field are an error.

use crate::error::EsiError;
use crate::model::{
    Flag, Number, RawCoe, RawCycleTime, RawDcSetup, RawDevice, RawEeprom, RawGroup,
    RawMailboxSetup, RawObject, RawOpMode, RawSetup, RawSetupFile, RawSmConf, RawSubItem,
    RawSyncManagerSetup,
};
use crate::types::{
    Access, CoeSetup, CycleTime, DcSetup, Device, Eeprom, Group, MailboxSetup, Object,
    ObjectKind, OpMode, PdoDirection, Restriction, Setup, SubItem, SyncManagerChannel,
    SyncManagerSetup, Vendor,
};
use log::warn;

// --- Raw -> Typed ---

/// Resolves a persisted setup file. The editor works on the first setup only.
pub fn resolve_setup_file(raw: RawSetupFile) -> Result<Setup, EsiError> {
    if raw.setups.len() > 1 {
        warn!(
            "Setup file holds {} setups; only the first is loaded",
            raw.setups.len()
        );
    }
    match raw.setups.into_iter().next() {
        Some(setup) => resolve_setup(setup),
        None => Ok(Setup::default()),
    }
}

/// Resolves one setup, flattening the devices of all groups.
pub fn resolve_setup(raw: RawSetup) -> Result<Setup, EsiError> {
    let vendor = Vendor {
        id: opt_number(raw.vendorid.as_ref(), "vendorid")?.unwrap_or(0),
        name: raw.vendorname,
    };
    let mut groups = Vec::with_capacity(raw.groups.len());
    let mut devices = Vec::new();
    for group in raw.groups {
        for device in group.devices {
            if let Some(declared) = device.group_type.as_deref().filter(|t| !t.is_empty()) {
                if declared != group.group_type {
                    warn!(
                        "Device '{}' declares group '{}' but is stored under '{}'",
                        device.name, declared, group.group_type
                    );
                }
            }
            let mut device = resolve_device(device)?;
            device.group_type = group.group_type.clone();
            devices.push(device);
        }
        groups.push(Group {
            group_type: group.group_type,
            name: group.name,
        });
    }
    Ok(Setup {
        name: raw.setupname,
        vendor,
        groups,
        devices,
    })
}

/// Resolves one device, filling unset blocks with their defaults.
pub fn resolve_device(raw: RawDevice) -> Result<Device, EsiError> {
    let mut device = Device::new(raw.name);
    device.group_type = raw.group_type.unwrap_or_default();
    if let Some(code) = opt_number(raw.product_code.as_ref(), "productCode")? {
        device.product_code = code;
    }
    if let Some(rev) = opt_number(raw.revision_no.as_ref(), "revisionNo")? {
        device.revision_no = rev;
    }
    if let Some(profile) = opt_number(raw.profile_no.as_ref(), "profileNo")? {
        device.profile_no = profile;
    }
    if let Some(eeprom) = raw.eeprom {
        device.eeprom = resolve_eeprom(eeprom)?;
    }
    if let Some(sm) = raw.sync_manager_setup {
        device.sync_managers = resolve_sync_managers(sm)?;
    }
    if let Some(dc) = raw.dc_setup {
        device.dc = resolve_dc(dc)?;
    }
    if let Some(mailbox) = raw.mailbox_setup {
        device.mailbox = resolve_mailbox(mailbox);
    }
    for object in raw.objects {
        if let Some(object) = resolve_object(object)? {
            device.objects.push(object);
        }
    }
    Ok(device)
}

fn resolve_eeprom(raw: RawEeprom) -> Result<Eeprom, EsiError> {
    let defaults = Eeprom::default();
    Ok(Eeprom {
        byte_size: opt_number(raw.byte_size.as_ref(), "eeprom.ByteSize")?
            .unwrap_or(defaults.byte_size),
        config_data: raw
            .config_data
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(defaults.config_data),
    })
}

fn resolve_sync_managers(raw: RawSyncManagerSetup) -> Result<SyncManagerSetup, EsiError> {
    let mut setup = SyncManagerSetup::default();
    for (slot, code) in setup.types.iter_mut().zip(&raw.types) {
        *slot = number(code, "syncManagerSetup.type")?;
    }
    if raw.types.len() > setup.types.len() {
        warn!(
            "{} sync manager type codes given; only the first {} are used",
            raw.types.len(),
            setup.types.len()
        );
    }
    if !raw.conf.is_empty() {
        setup.channels = raw
            .conf
            .into_iter()
            .map(resolve_channel)
            .collect::<Result<_, _>>()?;
    }
    if let Some(rx) = opt_number(raw.rxpdo.as_ref(), "syncManagerSetup.rxpdo")? {
        setup.rx_pdo = rx;
    }
    if let Some(tx) = opt_number(raw.txpdo.as_ref(), "syncManagerSetup.txpdo")? {
        setup.tx_pdo = tx;
    }
    Ok(setup)
}

fn resolve_channel(raw: RawSmConf) -> Result<SyncManagerChannel, EsiError> {
    Ok(SyncManagerChannel {
        min_size: opt_number(raw.min_size.as_ref(), "MinSize")?,
        max_size: opt_number(raw.max_size.as_ref(), "MaxSize")?,
        default_size: opt_number(raw.default_size.as_ref(), "DefaultSize")?,
        start_address: opt_number(raw.start_address.as_ref(), "StartAddress")?.unwrap_or(0),
        control_byte: opt_number(raw.control_byte.as_ref(), "ControlByte")?.unwrap_or(0),
        enable: raw.enable.as_bool(),
        description: raw.description,
    })
}

fn resolve_dc(raw: RawDcSetup) -> Result<DcSetup, EsiError> {
    let op_modes = raw
        .op_modes
        .into_iter()
        .map(|m| -> Result<OpMode, EsiError> {
            Ok(OpMode {
                assign_activate: opt_number(m.assign_activate.as_ref(), "AssignActivate")?
                    .unwrap_or(0),
                cycle_time_sync0: cycle_time(m.cycle_time_sync0.as_ref(), "CycleTymeSync0")?,
                shift_time_sync0: opt_signed(m.shift_time_sync0.as_ref(), "ShiftTimeSync0")?,
                cycle_time_sync1: cycle_time(m.cycle_time_sync1.as_ref(), "CycleTymeSync1")?,
                shift_time_sync1: opt_signed(m.shift_time_sync1.as_ref(), "ShiftTimeSync1")?,
                name: m.name,
                description: m.desc,
            })
        })
        .collect::<Result<_, _>>()?;
    Ok(DcSetup { op_modes })
}

fn cycle_time(
    raw: Option<&RawCycleTime>,
    field: &'static str,
) -> Result<Option<CycleTime>, EsiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    Ok(Some(CycleTime {
        factor: opt_signed(raw.factor.as_ref(), field)?.unwrap_or(1),
        value: opt_number(raw.value.as_ref(), field)?.unwrap_or(0),
    }))
}

fn resolve_mailbox(raw: RawMailboxSetup) -> MailboxSetup {
    MailboxSetup {
        data_link_layer: raw.data_link_layer,
        coe: raw.coe.map(|c| CoeSetup {
            sdo_info: c.sdo_info,
            pdo_assign: c.pdo_assign,
            pdo_config: c.pdo_config,
            complete_access: c.complete_access,
            segmented_sdo: c.segmented_sdo,
        }),
        foe: raw.foe,
    }
}

/// Resolves one object; `Ok(None)` when it has no usable index or its
/// sub-items do not fit its type.
pub fn resolve_object(raw: RawObject) -> Result<Option<Object>, EsiError> {
    let index = match raw.index.as_ref().map(|n| (n, n.as_u64())) {
        Some((_, Some(index))) if index != 0 && index <= u64::from(u16::MAX) => index as u16,
        other => {
            warn!(
                "Dropping object {:?}: invalid index {:?}",
                raw.name.as_deref().unwrap_or("unnamed"),
                other.map(|(n, _)| n)
            );
            return Ok(None);
        }
    };

    let kind = match raw.kind.as_deref().map(str::to_ascii_uppercase).as_deref() {
        None | Some("RECORD") => ObjectKind::Record,
        Some("VARIABLE") => ObjectKind::Variable,
        Some("ARRAY") => ObjectKind::Array,
        Some(other) => {
            warn!(
                "Object 0x{:04X}: unknown type '{}', treated as RECORD",
                index, other
            );
            ObjectKind::Record
        }
    };

    let items = raw
        .subitems
        .into_iter()
        .map(|item| resolve_sub_item(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    match Object::new(index, raw.name, kind, items) {
        Ok(object) => Ok(Some(object)),
        Err(EsiError::InvalidObject { index, reason }) => {
            warn!("Dropping object 0x{:04X}: {}", index, reason);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn resolve_sub_item(index: u16, raw: RawSubItem) -> Result<SubItem, EsiError> {
    Ok(SubItem {
        sub_index: opt_number(raw.sub_idx.as_ref(), "subIdx")?.unwrap_or(0),
        data_type: raw.data_type.filter(|t| !t.trim().is_empty()),
        name: raw.name.unwrap_or_default(),
        default_data: raw.default_data,
        access: match raw.access.as_deref() {
            None | Some("ro") => Access::ReadOnly,
            Some("rw") => Access::ReadWrite,
            Some("wo") => Access::WriteOnly,
            Some(other) => {
                warn!("Object 0x{:04X}: unknown access '{}', using ro", index, other);
                Access::ReadOnly
            }
        },
        read_restrictions: restriction(index, raw.read_restrictions.as_deref()),
        write_restrictions: restriction(index, raw.write_restrictions.as_deref()),
        pdo: match raw.pdo.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("none") => None,
            Some("rx") | Some("r") => Some(PdoDirection::Rx),
            Some("tx") | Some("t") => Some(PdoDirection::Tx),
            Some(other) => {
                warn!("Object 0x{:04X}: unknown PDO tag '{}'", index, other);
                None
            }
        },
    })
}

fn restriction(index: u16, raw: Option<&str>) -> Option<Restriction> {
    let raw = raw.filter(|r| !r.is_empty())?;
    let parsed = Restriction::from_esi(raw);
    if parsed.is_none() {
        warn!("Object 0x{:04X}: unknown restriction '{}'", index, raw);
    }
    parsed
}

fn number<T: TryFrom<u64>>(value: &Number, field: &'static str) -> Result<T, EsiError> {
    value
        .as_u64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| EsiError::InvalidNumber {
            field,
            value: format!("{:?}", value),
        })
}

/// Like [`number`], with absent and blank values resolving to `None`.
fn opt_number<T: TryFrom<u64>>(
    value: Option<&Number>,
    field: &'static str,
) -> Result<Option<T>, EsiError> {
    value
        .filter(|v| !v.is_blank())
        .map(|v| number(v, field))
        .transpose()
}

fn opt_signed(value: Option<&Number>, field: &'static str) -> Result<Option<i32>, EsiError> {
    value
        .filter(|v| !v.is_blank())
        .map(|v| {
            v.as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| EsiError::InvalidNumber {
                    field,
                    value: format!("{:?}", v),
                })
        })
        .transpose()
}

// --- Typed -> Raw ---

/// Converts a setup back into the persisted file shape.
pub fn unresolve_setup_file(setup: &Setup) -> RawSetupFile {
    RawSetupFile {
        setups: vec![unresolve_setup(setup)],
    }
}

/// Converts a setup back into its persisted shape, storing every device
/// under its group. Devices of an unknown group get a group entry of their own.
pub fn unresolve_setup(setup: &Setup) -> RawSetup {
    let mut groups: Vec<RawGroup> = setup
        .groups
        .iter()
        .map(|g| RawGroup {
            group_type: g.group_type.clone(),
            name: g.name.clone(),
            devices: Vec::new(),
        })
        .collect();
    for device in &setup.devices {
        let slot = match groups
            .iter()
            .position(|g| g.group_type == device.group_type)
        {
            Some(slot) => slot,
            None => {
                warn!(
                    "Device '{}' names unknown group '{}'; adding it to the catalogue",
                    device.name, device.group_type
                );
                groups.push(RawGroup {
                    group_type: device.group_type.clone(),
                    name: device.group_type.clone(),
                    devices: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[slot].devices.push(unresolve_device(device));
    }
    RawSetup {
        setupname: setup.name.clone(),
        vendorname: setup.vendor.name.clone(),
        vendorid: Some(Number::hex(setup.vendor.id)),
        groups,
    }
}

fn unresolve_device(device: &Device) -> RawDevice {
    let sm = &device.sync_managers;
    RawDevice {
        name: device.name.clone(),
        group_type: Some(device.group_type.clone()),
        product_code: Some(Number::hex(device.product_code)),
        revision_no: Some(Number::hex(device.revision_no)),
        profile_no: Some(i64::from(device.profile_no).into()),
        eeprom: Some(RawEeprom {
            byte_size: Some(i64::from(device.eeprom.byte_size).into()),
            config_data: Some(device.eeprom.config_data.clone()),
        }),
        sync_manager_setup: Some(RawSyncManagerSetup {
            types: sm.types.iter().map(|&t| i64::from(t).into()).collect(),
            conf: sm
                .channels
                .iter()
                .map(|c| RawSmConf {
                    min_size: c.min_size.map(|v| i64::from(v).into()),
                    max_size: c.max_size.map(|v| i64::from(v).into()),
                    default_size: c.default_size.map(|v| i64::from(v).into()),
                    start_address: Some(Number::hex(c.start_address)),
                    control_byte: Some(Number::hex(c.control_byte)),
                    enable: Flag::Int(i64::from(c.enable)),
                    description: c.description.clone(),
                })
                .collect(),
            rxpdo: Some((sm.rx_pdo as i64).into()),
            txpdo: Some((sm.tx_pdo as i64).into()),
        }),
        dc_setup: Some(RawDcSetup {
            op_modes: device
                .dc
                .op_modes
                .iter()
                .map(|m| RawOpMode {
                    name: m.name.clone(),
                    desc: m.description.clone(),
                    assign_activate: Some(Number::hex(m.assign_activate)),
                    cycle_time_sync0: m.cycle_time_sync0.map(unresolve_cycle_time),
                    shift_time_sync0: m.shift_time_sync0.map(|s| i64::from(s).into()),
                    cycle_time_sync1: m.cycle_time_sync1.map(unresolve_cycle_time),
                    shift_time_sync1: m.shift_time_sync1.map(|s| i64::from(s).into()),
                })
                .collect(),
        }),
        mailbox_setup: Some(RawMailboxSetup {
            data_link_layer: device.mailbox.data_link_layer,
            coe: device.mailbox.coe.map(|c| RawCoe {
                sdo_info: c.sdo_info,
                pdo_assign: c.pdo_assign,
                pdo_config: c.pdo_config,
                complete_access: c.complete_access,
                segmented_sdo: c.segmented_sdo,
            }),
            foe: device.mailbox.foe,
        }),
        objects: device.objects.iter().map(unresolve_object).collect(),
    }
}

fn unresolve_cycle_time(cycle: CycleTime) -> RawCycleTime {
    RawCycleTime {
        value: Some(i64::from(cycle.value).into()),
        factor: Some(i64::from(cycle.factor).into()),
    }
}

fn unresolve_object(object: &Object) -> RawObject {
    RawObject {
        index: Some(Number::hex(object.index)),
        name: object.name.clone(),
        kind: Some(object.kind().as_str().to_string()),
        subitems: object
            .sub_items()
            .iter()
            .map(|s| RawSubItem {
                sub_idx: Some(Number::hex(s.sub_index)),
                data_type: s.data_type.clone(),
                name: Some(s.name.clone()),
                default_data: s.default_data.clone(),
                access: Some(s.access.as_str().to_string()),
                read_restrictions: s.read_restrictions.map(|r| r.as_str().to_string()),
                write_restrictions: s.write_restrictions.map(|r| r.as_str().to_string()),
                pdo: s.pdo.map(|p| match p {
                    PdoDirection::Rx => "rx".to_string(),
                    PdoDirection::Tx => "tx".to_string(),
                }),
            })
            .collect(),
    }
}
