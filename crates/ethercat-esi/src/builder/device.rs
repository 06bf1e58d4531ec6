// crates/ethercat-esi/src/builder/device.rs

//! Emits the device-level blocks following the profile:
//! `<Fmmu>`, `<Sm>`, `<RxPdo>`/`<TxPdo>`, `<Mailbox>`, `<Dc>` and `<Eeprom>`.

use crate::error::EsiError;
use crate::sink::XmlSink;
use crate::synthesizer::{PdoMappingEntry, Synthesis};
use crate::types::{
    CycleTime, DcSetup, Device, Eeprom, MailboxSetup, OpMode, PdoDirection, SyncManagerChannel,
};
use crate::utils::format_esi_hex;
use log::warn;

/// FMMU usage, fixed in this version.
pub const FMMU_USAGE: [&str; 3] = ["Outputs", "Inputs", "MBoxState"];

pub(super) fn write_fmmus<S: XmlSink>(sink: &mut S) -> Result<(), EsiError> {
    for usage in FMMU_USAGE {
        sink.text_element("Fmmu", usage)?;
    }
    Ok(())
}

pub(super) fn write_sync_managers<S: XmlSink>(
    sink: &mut S,
    channels: &[SyncManagerChannel],
) -> Result<(), EsiError> {
    for sm in channels {
        sink.open_element("Sm")?;
        if let Some(min) = sm.min_size {
            sink.attribute("MinSize", &format_esi_hex(min))?;
        }
        if let Some(max) = sm.max_size {
            sink.attribute("MaxSize", &format_esi_hex(max))?;
        }
        sink.attribute("DefaultSize", &format_esi_hex(sm.default_size.unwrap_or(0)))?;
        sink.attribute("StartAddress", &format_esi_hex(sm.start_address))?;
        sink.attribute("ControlByte", &format_esi_hex(sm.control_byte))?;
        sink.attribute("Enable", if sm.enable { "1" } else { "0" })?;
        sink.text(&sm.description)?;
        sink.close_element()?;
    }
    Ok(())
}

/// Writes one `<RxPdo>`/`<TxPdo>` per mapping object of `direction`.
pub(super) fn write_pdos<S: XmlSink>(
    sink: &mut S,
    device: &Device,
    synthesis: &Synthesis,
    direction: PdoDirection,
) -> Result<(), EsiError> {
    let (element, channel) = match direction {
        PdoDirection::Rx => ("RxPdo", device.sync_managers.rx_pdo),
        PdoDirection::Tx => ("TxPdo", device.sync_managers.tx_pdo),
    };

    for &index in synthesis.mappings(direction) {
        let Some(mapping) = synthesis.object(index) else {
            continue;
        };
        sink.open_element(element)?;
        sink.attribute("Mandatory", "true")?;
        sink.attribute("Fixed", "true")?;
        sink.attribute("Sm", &channel.to_string())?;
        sink.text_element("Index", &format_esi_hex(mapping.index))?;
        sink.text_element("Name", mapping.display_name())?;

        for item in mapping.sub_items().iter().filter(|s| s.sub_index != 0) {
            let Some(entry) = item.default_value().and_then(PdoMappingEntry::from_hex) else {
                warn!(
                    "Mapping 0x{:04X}:{} has malformed entry {:?}",
                    mapping.index, item.sub_index, item.default_data
                );
                continue;
            };
            write_entry(sink, device, &entry)?;
        }
        sink.close_element()?;
    }
    Ok(())
}

fn write_entry<S: XmlSink>(
    sink: &mut S,
    device: &Device,
    entry: &PdoMappingEntry,
) -> Result<(), EsiError> {
    sink.open_element("Entry")?;
    sink.text_element("Index", &format_esi_hex(entry.index))?;
    sink.text_element("SubIndex", &entry.sub_index.to_string())?;
    sink.text_element("BitLen", &entry.bit_length.to_string())?;

    let source = device
        .object(entry.index)
        .and_then(|o| o.sub_item(entry.sub_index));
    match source {
        Some(item) => {
            sink.text_element("Name", &item.name)?;
            if let Some(data_type) = &item.data_type {
                sink.text_element("DataType", data_type)?;
            }
        }
        None => warn!(
            "PDO entry 0x{:04X}:{} does not reference an existing sub-item",
            entry.index, entry.sub_index
        ),
    }
    sink.close_element()
}

pub(super) fn write_mailbox<S: XmlSink>(
    sink: &mut S,
    mailbox: &MailboxSetup,
) -> Result<(), EsiError> {
    sink.open_element("Mailbox")?;
    sink.attribute("DataLinkLayer", bool_str(mailbox.data_link_layer))?;
    if let Some(coe) = &mailbox.coe {
        sink.open_element("CoE")?;
        sink.attribute("SdoInfo", bool_str(coe.sdo_info))?;
        sink.attribute("PdoAssign", bool_str(coe.pdo_assign))?;
        sink.attribute("PdoConfig", bool_str(coe.pdo_config))?;
        sink.attribute("CompleteAccess", bool_str(coe.complete_access))?;
        sink.attribute("SegmentedSdo", bool_str(coe.segmented_sdo))?;
        sink.close_element()?;
    }
    if mailbox.foe {
        sink.open_element("FoE")?;
        sink.close_element()?;
    }
    sink.close_element()
}

/// Writes `<Dc>`; nothing when no operating mode is configured.
pub(super) fn write_dc<S: XmlSink>(sink: &mut S, dc: &DcSetup) -> Result<(), EsiError> {
    if dc.op_modes.is_empty() {
        return Ok(());
    }
    sink.open_element("Dc")?;
    for mode in &dc.op_modes {
        write_op_mode(sink, mode)?;
    }
    sink.close_element()
}

fn write_op_mode<S: XmlSink>(sink: &mut S, mode: &OpMode) -> Result<(), EsiError> {
    sink.open_element("OpMode")?;
    sink.text_element("Name", &mode.name)?;
    sink.text_element("Desc", &mode.description)?;
    sink.text_element("AssignActivate", &format_esi_hex(mode.assign_activate))?;
    if let Some(cycle) = &mode.cycle_time_sync0 {
        write_cycle_time(sink, "CycleTimeSync0", cycle)?;
    }
    if let Some(shift) = mode.shift_time_sync0 {
        sink.text_element("ShiftTimeSync0", &shift.to_string())?;
    }
    if let Some(cycle) = &mode.cycle_time_sync1 {
        write_cycle_time(sink, "CycleTimeSync1", cycle)?;
    }
    if let Some(shift) = mode.shift_time_sync1 {
        sink.text_element("ShiftTimeSync1", &shift.to_string())?;
    }
    sink.close_element()
}

fn write_cycle_time<S: XmlSink>(
    sink: &mut S,
    name: &str,
    cycle: &CycleTime,
) -> Result<(), EsiError> {
    sink.open_element(name)?;
    sink.attribute("Factor", &cycle.factor.to_string())?;
    sink.text(&cycle.value.to_string())?;
    sink.close_element()
}

pub(super) fn write_eeprom<S: XmlSink>(sink: &mut S, eeprom: &Eeprom) -> Result<(), EsiError> {
    sink.open_element("Eeprom")?;
    sink.text_element("ByteSize", &eeprom.byte_size.to_string())?;
    sink.text_element("ConfigData", &eeprom.config_data)?;
    sink.close_element()
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::QuickXmlSink;
    use crate::types::CoeSetup;

    fn render(build: impl FnOnce(&mut QuickXmlSink) -> Result<(), EsiError>) -> String {
        let mut sink = QuickXmlSink::compact();
        build(&mut sink).unwrap();
        String::from_utf8(sink.flush()).unwrap()
    }

    #[test]
    fn test_default_sync_managers() {
        let device = Device::new("Servo");
        let xml = render(|s| write_sync_managers(s, &device.sync_managers.channels));
        assert!(xml.starts_with(
            r##"<Sm MinSize="#x24" MaxSize="#x80" DefaultSize="#x80" StartAddress="#x1000" ControlByte="#x26" Enable="1">MBoxOut</Sm>"##
        ));
        assert!(xml.ends_with(
            r##"<Sm DefaultSize="#x0" StartAddress="#x1400" ControlByte="#x20" Enable="1">Inputs</Sm>"##
        ));
    }

    #[test]
    fn test_mailbox_variants() {
        let plain = MailboxSetup {
            data_link_layer: false,
            coe: None,
            foe: false,
        };
        assert_eq!(
            render(|s| write_mailbox(s, &plain)),
            r#"<Mailbox DataLinkLayer="false"/>"#
        );

        let full = MailboxSetup {
            foe: true,
            ..MailboxSetup::default()
        };
        let xml = render(|s| write_mailbox(s, &full));
        assert_eq!(
            xml,
            "<Mailbox DataLinkLayer=\"true\"><CoE SdoInfo=\"true\" PdoAssign=\"false\" \
             PdoConfig=\"false\" CompleteAccess=\"true\" SegmentedSdo=\"true\"/><FoE/></Mailbox>"
        );
    }

    #[test]
    fn test_dc_is_omitted_without_op_modes() {
        assert_eq!(render(|s| write_dc(s, &DcSetup::default())), "");

        let dc = DcSetup {
            op_modes: vec![OpMode {
                name: "DC".into(),
                description: "DC-Synchron".into(),
                assign_activate: 0x300,
                cycle_time_sync0: Some(CycleTime { factor: 1, value: 0 }),
                shift_time_sync0: Some(0),
                cycle_time_sync1: None,
                shift_time_sync1: None,
            }],
        };
        let xml = render(|s| write_dc(s, &dc));
        assert_eq!(
            xml,
            "<Dc><OpMode><Name>DC</Name><Desc>DC-Synchron</Desc><AssignActivate>#x300</AssignActivate>\
             <CycleTimeSync0 Factor=\"1\">0</CycleTimeSync0><ShiftTimeSync0>0</ShiftTimeSync0></OpMode></Dc>"
        );
    }

    #[test]
    fn test_fmmu_and_eeprom() {
        let xml = render(|s| {
            write_fmmus(s)?;
            write_eeprom(s, &Eeprom::default())
        });
        assert_eq!(
            xml,
            "<Fmmu>Outputs</Fmmu><Fmmu>Inputs</Fmmu><Fmmu>MBoxState</Fmmu>\
             <Eeprom><ByteSize>2048</ByteSize><ConfigData>06800681000000000000</ConfigData></Eeprom>"
        );
    }
}
