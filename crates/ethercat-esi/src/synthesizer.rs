// crates/ethercat-esi/src/synthesizer.rs

//! Synthesizes the protocol-mandated dictionary objects of a device.
//!
//! Besides the fixed communication objects (0x1000..0x1018, 0x1C00) this scans
//! the user objects for PDO-tagged sub-items, creates one mapping object per
//! source object and direction, lists them in the sync manager assignment
//! arrays 0x1C12/0x1C13, and writes the accumulated process data size back into
//! the sync manager configuration.

use crate::primitives;
use crate::types::{Access, Device, Object, ObjectBody, PdoDirection, SubItem};
use log::{debug, warn};

pub const IDX_DEVICE_TYPE: u16 = 0x1000;
pub const IDX_ERROR_REGISTER: u16 = 0x1001;
pub const IDX_DEVICE_NAME: u16 = 0x1008;
pub const IDX_HARDWARE_VERSION: u16 = 0x100A;
pub const IDX_IDENTITY: u16 = 0x1018;
pub const IDX_SM_TYPE: u16 = 0x1C00;
pub const IDX_RX_PDO_ASSIGN: u16 = 0x1C12;
pub const IDX_TX_PDO_ASSIGN: u16 = 0x1C13;

/// First RxPDO mapping object.
pub const RX_PDO_BASE: u16 = 0x1600;
/// First TxPDO mapping object.
pub const TX_PDO_BASE: u16 = 0x1A00;
/// Number of indices reserved for each direction's mapping objects.
pub const PDO_INDEX_RANGE: u16 = 0x200;

/// Device type value written to 0x1000.
pub const DEVICE_TYPE_VALUE: &str = "5001";
const HARDWARE_VERSION_VALUE: &str = "N/A";
/// Type of the device name and hardware version strings.
const VISIBLE_STRING: &str = "VISIBLESTRING";

/// One packed PDO mapping entry: index, sub-index and bit length of the mapped item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdoMappingEntry {
    pub index: u16,
    pub sub_index: u8,
    pub bit_length: u8,
}

impl PdoMappingEntry {
    /// Packs the entry into its 8 hex digit default value (`70000110`).
    pub fn to_hex(&self) -> String {
        format!(
            "{:04X}{:02X}{:02X}",
            self.index, self.sub_index, self.bit_length
        )
    }

    /// Unpacks a default value produced by [`PdoMappingEntry::to_hex`].
    /// An optional `0x`/`#x` prefix is accepted.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s
            .trim()
            .strip_prefix("0x")
            .or_else(|| s.trim().strip_prefix("#x"))
            .unwrap_or(s.trim());
        if digits.len() != 8 || !digits.is_ascii() {
            return None;
        }
        Some(Self {
            index: u16::from_str_radix(&digits[0..4], 16).ok()?,
            sub_index: u8::from_str_radix(&digits[4..6], 16).ok()?,
            bit_length: u8::from_str_radix(&digits[6..8], 16).ok()?,
        })
    }
}

/// Per-direction process data descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdoDescriptor {
    pub direction: PdoDirection,
    pub base_index: u16,
    /// Accumulated length of all mapped entries, in bits.
    pub bit_length: u32,
}

impl PdoDescriptor {
    fn new(direction: PdoDirection, base_index: u16) -> Self {
        Self {
            direction,
            base_index,
            bit_length: 0,
        }
    }

    /// Accumulated length rounded up to whole bytes.
    pub fn byte_length(&self) -> u32 {
        self.bit_length.div_ceil(8)
    }
}

/// The RX/TX descriptor pair of one compilation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdoAccumulator {
    pub rx: PdoDescriptor,
    pub tx: PdoDescriptor,
}

impl Default for PdoAccumulator {
    fn default() -> Self {
        Self {
            rx: PdoDescriptor::new(PdoDirection::Rx, RX_PDO_BASE),
            tx: PdoDescriptor::new(PdoDirection::Tx, TX_PDO_BASE),
        }
    }
}

impl PdoAccumulator {
    pub fn get(&self, direction: PdoDirection) -> &PdoDescriptor {
        match direction {
            PdoDirection::Rx => &self.rx,
            PdoDirection::Tx => &self.tx,
        }
    }

    fn get_mut(&mut self, direction: PdoDirection) -> &mut PdoDescriptor {
        match direction {
            PdoDirection::Rx => &mut self.rx,
            PdoDirection::Tx => &mut self.tx,
        }
    }
}

/// Output of [`synthesize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Mandatory objects in ascending index order.
    pub objects: Vec<Object>,
    /// Indices of the RxPDO mapping objects, in synthesis order.
    pub rx_mappings: Vec<u16>,
    /// Indices of the TxPDO mapping objects, in synthesis order.
    pub tx_mappings: Vec<u16>,
    pub pdo: PdoAccumulator,
}

impl Synthesis {
    /// Mapping object indices of `direction`.
    pub fn mappings(&self, direction: PdoDirection) -> &[u16] {
        match direction {
            PdoDirection::Rx => &self.rx_mappings,
            PdoDirection::Tx => &self.tx_mappings,
        }
    }

    /// Looks up a synthesized object.
    pub fn object(&self, index: u16) -> Option<&Object> {
        self.objects.iter().find(|o| o.index == index)
    }

    /// Stores the accumulated PDO byte lengths as the default size of the
    /// RX/TX sync manager channels.
    pub fn write_back_sizes(&self, device: &mut Device) {
        write_back_sizes(device, &self.pdo);
    }
}

/// Builds the mandatory objects for `device` from its current user objects.
///
/// Writes the RX/TX process data byte length into the default size of the
/// sync manager channels named by `sync_managers.rx_pdo` / `tx_pdo`.
pub fn synthesize(device: &mut Device, vendor_id: u32) -> Synthesis {
    let synthesis = synthesize_objects(device, vendor_id);
    synthesis.write_back_sizes(device);
    synthesis
}

/// Builds the mandatory objects without touching `device`.
///
/// Call [`Synthesis::write_back_sizes`] once the result has been accepted.
pub fn synthesize_objects(device: &Device, vendor_id: u32) -> Synthesis {
    let mut pdo = PdoAccumulator::default();
    let rx = synthesize_mappings(&device.objects, PdoDirection::Rx, &mut pdo);
    let tx = synthesize_mappings(&device.objects, PdoDirection::Tx, &mut pdo);
    let rx_mappings: Vec<u16> = rx.iter().map(|o| o.index).collect();
    let tx_mappings: Vec<u16> = tx.iter().map(|o| o.index).collect();

    let mut objects = vec![
        variable(
            IDX_DEVICE_TYPE,
            "Device type",
            "UDINT",
            DEVICE_TYPE_VALUE.to_string(),
        ),
        variable(IDX_ERROR_REGISTER, "Error register", "USINT", "00".into()),
        variable(IDX_DEVICE_NAME, "Device name", VISIBLE_STRING, device.name.clone()),
        variable(
            IDX_HARDWARE_VERSION,
            "Manufacturer hardware version",
            VISIBLE_STRING,
            HARDWARE_VERSION_VALUE.into(),
        ),
        identity(device, vendor_id),
    ];
    objects.extend(rx);
    objects.extend(tx);
    objects.push(sync_manager_types(device));
    if let Some(assign) = assignment(IDX_RX_PDO_ASSIGN, "RxPDO assign", &rx_mappings) {
        objects.push(assign);
    }
    if let Some(assign) = assignment(IDX_TX_PDO_ASSIGN, "TxPDO assign", &tx_mappings) {
        objects.push(assign);
    }

    debug!(
        "Synthesized {} mandatory objects ({} RxPDO, {} TxPDO mappings)",
        objects.len(),
        rx_mappings.len(),
        tx_mappings.len()
    );

    Synthesis {
        objects,
        rx_mappings,
        tx_mappings,
        pdo,
    }
}

/// Creates one mapping object per user object carrying sub-items tagged with
/// `direction`, accumulating their bit length.
fn synthesize_mappings(
    user_objects: &[Object],
    direction: PdoDirection,
    pdo: &mut PdoAccumulator,
) -> Vec<Object> {
    let descriptor = pdo.get_mut(direction);
    let mut mappings = Vec::new();
    let mut running: u16 = 0;

    for source in user_objects {
        let mapped: Vec<&SubItem> = source
            .sub_items()
            .iter()
            .filter(|s| s.sub_index != 0 && s.pdo == Some(direction))
            .collect();
        if mapped.is_empty() {
            continue;
        }
        if running >= PDO_INDEX_RANGE {
            warn!(
                "{:?} PDO index range exhausted; object 0x{:04X} is not mapped",
                direction, source.index
            );
            break;
        }

        let name = format!("{} process data mapping", source.display_name());
        let mut items = Vec::with_capacity(mapped.len() + 1);
        items.push(
            SubItem::new(0, name.clone(), "USINT")
                .with_default(mapped.len().to_string()),
        );

        for (position, item) in mapped.iter().enumerate() {
            let bit_length = mapped_bit_length(source.index, item);
            let entry = PdoMappingEntry {
                index: source.index,
                sub_index: item.sub_index,
                bit_length,
            };
            items.push(
                SubItem::new(
                    (position + 1) as u8,
                    format!("SubIndex {:03}", position + 1),
                    "UDINT",
                )
                .with_default(entry.to_hex()),
            );
            descriptor.bit_length += u32::from(bit_length);
        }

        mappings.push(Object {
            index: descriptor.base_index + running,
            name: Some(name),
            body: ObjectBody::Record(items),
        });
        running += 1;
    }
    mappings
}

fn mapped_bit_length(index: u16, item: &SubItem) -> u8 {
    let declared = item.data_type.as_deref().unwrap_or_default();
    match primitives::bit_size(declared) {
        Some(bits) => bits as u8,
        None => {
            warn!(
                "Mapped sub-item 0x{:04X}:{} has no primitive data type ('{}'); length 0",
                index, item.sub_index, declared
            );
            0
        }
    }
}

fn write_back_sizes(device: &mut Device, pdo: &PdoAccumulator) {
    let targets = [
        (device.sync_managers.rx_pdo, &pdo.rx),
        (device.sync_managers.tx_pdo, &pdo.tx),
    ];
    for (channel, descriptor) in targets {
        let size = u16::try_from(descriptor.byte_length()).unwrap_or(u16::MAX);
        match device.sync_managers.channels.get_mut(channel) {
            Some(sm) => {
                sm.default_size = Some(size);
                debug!(
                    "Sync manager {} ({:?} PDO) default size set to {} bytes",
                    channel, descriptor.direction, size
                );
            }
            None => warn!(
                "Sync manager {} for {:?} PDO is not configured",
                channel, descriptor.direction
            ),
        }
    }
}

fn variable(index: u16, name: &str, data_type: &str, value: String) -> Object {
    Object::variable(index, name, SubItem::new(0, name, data_type).with_default(value))
}

fn identity(device: &Device, vendor_id: u32) -> Object {
    let items = vec![
        SubItem::new(0, "SubIndex 000", "USINT").with_default("4"),
        SubItem::new(1, "Vendor ID", "UDINT").with_default(format!("{:08X}", vendor_id)),
        SubItem::new(2, "Product code", "UDINT")
            .with_default(format!("{:08X}", device.product_code)),
        SubItem::new(3, "Revision number", "UDINT")
            .with_default(format!("{:08X}", device.revision_no)),
        SubItem::new(4, "Serial number", "UDINT").with_default("0x0"),
    ];
    Object {
        index: IDX_IDENTITY,
        name: Some("Identity".into()),
        body: ObjectBody::Record(items),
    }
}

fn sync_manager_types(device: &Device) -> Object {
    let types = &device.sync_managers.types;
    let mut items = Vec::with_capacity(types.len() + 1);
    items.push(SubItem::new(0, "SubIndex 000", "USINT").with_default(types.len().to_string()));
    for (i, code) in types.iter().enumerate() {
        items.push(
            SubItem::new((i + 1) as u8, format!("SubIndex {:03}", i + 1), "USINT")
                .with_default(format!("{:02X}", code)),
        );
    }
    Object {
        index: IDX_SM_TYPE,
        name: Some("Sync manager type".into()),
        body: ObjectBody::Array(items),
    }
}

fn assignment(index: u16, name: &str, mappings: &[u16]) -> Option<Object> {
    if mappings.is_empty() {
        return None;
    }
    let mut items = Vec::with_capacity(mappings.len() + 1);
    items.push(
        SubItem::new(0, "SubIndex 000", "USINT").with_default(mappings.len().to_string()),
    );
    for (i, mapping) in mappings.iter().enumerate() {
        items.push(
            SubItem::new((i + 1) as u8, format!("SubIndex {:03}", i + 1), "UINT")
                .with_default(format!("{:04X}", mapping))
                .with_access(Access::ReadOnly),
        );
    }
    Some(Object {
        index,
        name: Some(name.into()),
        body: ObjectBody::Array(items),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectKind;

    fn pdo_record(index: u16, name: &str, members: &[(&str, Option<PdoDirection>)]) -> Object {
        let mut items = vec![
            SubItem::new(0, "Max SubIndex", "USINT").with_default(members.len().to_string()),
        ];
        for (i, (data_type, pdo)) in members.iter().enumerate() {
            let mut item = SubItem::new((i + 1) as u8, format!("Member {}", i + 1), *data_type);
            item.pdo = *pdo;
            items.push(item);
        }
        Object::new(index, Some(name.into()), ObjectKind::Record, items).unwrap()
    }

    #[test]
    fn test_mapping_entry_round_trip() {
        let entry = PdoMappingEntry {
            index: 0x7000,
            sub_index: 1,
            bit_length: 16,
        };
        let packed = entry.to_hex();
        assert_eq!(packed, "70000110");
        assert_eq!(packed.len(), 8);
        assert_eq!(PdoMappingEntry::from_hex(&packed), Some(entry));

        let wide = PdoMappingEntry {
            index: 0xFFFF,
            sub_index: 0xFE,
            bit_length: 64,
        };
        assert_eq!(PdoMappingEntry::from_hex(&wide.to_hex()), Some(wide));
    }

    #[test]
    fn test_mapping_entry_rejects_bad_length() {
        assert_eq!(PdoMappingEntry::from_hex("700001"), None);
        assert_eq!(PdoMappingEntry::from_hex("7000011000"), None);
        assert_eq!(PdoMappingEntry::from_hex("ZZZZ0110"), None);
        assert!(PdoMappingEntry::from_hex("0x70000110").is_some());
    }

    #[test]
    fn test_fixed_objects_always_present() {
        let mut device = Device::new("Plain");
        let synthesis = synthesize(&mut device, 0x1337);

        let indices: Vec<u16> = synthesis.objects.iter().map(|o| o.index).collect();
        assert_eq!(
            indices,
            vec![0x1000, 0x1001, 0x1008, 0x100A, 0x1018, 0x1C00]
        );
        assert!(synthesis.rx_mappings.is_empty());
        assert!(synthesis.tx_mappings.is_empty());

        let name = synthesis.object(IDX_DEVICE_NAME).unwrap();
        assert_eq!(name.sub_items()[0].default_data.as_deref(), Some("Plain"));

        let identity = synthesis.object(IDX_IDENTITY).unwrap();
        assert_eq!(identity.sub_items().len(), 5);
        assert_eq!(
            identity.sub_item(1).unwrap().default_data.as_deref(),
            Some("00001337")
        );
        assert_eq!(
            identity.sub_item(4).unwrap().default_data.as_deref(),
            Some("0x0")
        );

        let types = synthesis.object(IDX_SM_TYPE).unwrap();
        let codes: Vec<_> = types
            .sub_items()
            .iter()
            .skip(1)
            .map(|s| s.default_data.clone().unwrap())
            .collect();
        assert_eq!(codes, vec!["01", "02", "03", "04"]);
    }

    #[test]
    fn test_rx_mapping_and_sync_manager_size() {
        let mut device = Device::new("Servo");
        device.objects.push(pdo_record(
            0x7000,
            "Outputs",
            &[("UINT", Some(PdoDirection::Rx))],
        ));

        let synthesis = synthesize(&mut device, 0);
        assert_eq!(synthesis.rx_mappings, vec![0x1600]);

        let mapping = synthesis.object(0x1600).unwrap();
        assert_eq!(mapping.name.as_deref(), Some("Outputs process data mapping"));
        assert_eq!(mapping.sub_items()[0].name, "Outputs process data mapping");
        assert_eq!(mapping.sub_items()[1].default_data.as_deref(), Some("70000110"));

        assert_eq!(synthesis.pdo.rx.bit_length, 16);
        assert_eq!(device.sync_managers.channels[2].default_size, Some(2));
        assert_eq!(device.sync_managers.channels[3].default_size, Some(0));

        let assign = synthesis.object(IDX_RX_PDO_ASSIGN).unwrap();
        assert_eq!(assign.sub_items()[1].default_data.as_deref(), Some("1600"));
        assert!(synthesis.object(IDX_TX_PDO_ASSIGN).is_none());
    }

    #[test]
    fn test_objects_alone_leave_the_device_untouched() {
        let mut device = Device::new("Servo");
        device.objects.push(pdo_record(
            0x7000,
            "Outputs",
            &[("UDINT", Some(PdoDirection::Rx))],
        ));
        let before = device.clone();

        let synthesis = synthesize_objects(&device, 0);
        assert_eq!(synthesis.pdo.rx.byte_length(), 4);
        assert_eq!(device, before);

        synthesis.write_back_sizes(&mut device);
        assert_eq!(device.sync_managers.channels[2].default_size, Some(4));
    }

    #[test]
    fn test_string_objects_use_visible_string() {
        let mut device = Device::new("Plain");
        let synthesis = synthesize(&mut device, 0);
        for index in [IDX_DEVICE_NAME, IDX_HARDWARE_VERSION] {
            let value = &synthesis.object(index).unwrap().sub_items()[0];
            assert_eq!(value.data_type.as_deref(), Some("VISIBLESTRING"));
            assert!(value.is_string());
        }
        let version = synthesis.object(IDX_HARDWARE_VERSION).unwrap();
        assert_eq!(version.sub_items()[0].default_data.as_deref(), Some("N/A"));
    }

    #[test]
    fn test_one_mapping_object_per_source_object() {
        let mut device = Device::new("IO");
        device.objects.push(pdo_record(
            0x6000,
            "Inputs A",
            &[
                ("USINT", Some(PdoDirection::Tx)),
                ("BOOL", None),
                ("UDINT", Some(PdoDirection::Tx)),
            ],
        ));
        device.objects.push(pdo_record(
            0x6001,
            "Inputs B",
            &[("INT", Some(PdoDirection::Tx)), ("UINT", Some(PdoDirection::Rx))],
        ));

        let synthesis = synthesize(&mut device, 0);
        assert_eq!(synthesis.tx_mappings, vec![0x1A00, 0x1A01]);
        assert_eq!(synthesis.rx_mappings, vec![0x1600]);

        let first = synthesis.object(0x1A00).unwrap();
        assert_eq!(first.sub_items().len(), 3);
        assert_eq!(first.sub_items()[0].default_data.as_deref(), Some("2"));
        assert_eq!(first.sub_items()[2].default_data.as_deref(), Some("60000320"));

        // 8 + 32 + 16 bits
        assert_eq!(synthesis.pdo.tx.bit_length, 56);
        assert_eq!(device.sync_managers.channels[3].default_size, Some(7));
        assert_eq!(device.sync_managers.channels[2].default_size, Some(2));

        let indices: Vec<u16> = synthesis.objects.iter().map(|o| o.index).collect();
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        assert_eq!(indices, sorted);
    }

    #[test]
    fn test_unnamed_record_mapping_takes_sub_index_zero_name() {
        let mut device = Device::new("Drive");
        device.objects.push(
            Object::new(
                0x7000,
                None,
                ObjectKind::Record,
                vec![
                    SubItem::new(0, "Motor outputs", "USINT").with_default("1"),
                    SubItem::new(1, "Torque", "INT").with_pdo(PdoDirection::Rx),
                ],
            )
            .unwrap(),
        );
        let synthesis = synthesize(&mut device, 0);
        let mapping = synthesis.object(0x1600).unwrap();
        assert_eq!(mapping.display_name(), "Motor outputs process data mapping");
    }

    #[test]
    fn test_sub_index_zero_is_never_mapped() {
        let mut device = Device::new("Var");
        device.objects.push(Object::variable(
            0x6000,
            "Counter",
            SubItem::new(0, "Counter", "UDINT").with_pdo(PdoDirection::Tx),
        ));
        let synthesis = synthesize(&mut device, 0);
        assert!(synthesis.tx_mappings.is_empty());
        assert_eq!(synthesis.pdo.tx.bit_length, 0);
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let mut device = Device::new("Servo");
        device.objects.push(pdo_record(
            0x7000,
            "Outputs",
            &[("UDINT", Some(PdoDirection::Rx)), ("UINT", Some(PdoDirection::Rx))],
        ));
        let first = synthesize(&mut device, 7);
        let sizes = device.sync_managers.clone();
        let second = synthesize(&mut device, 7);
        assert_eq!(first, second);
        assert_eq!(device.sync_managers, sizes);
        assert_eq!(second.pdo.rx.byte_length(), 6);
    }
}
