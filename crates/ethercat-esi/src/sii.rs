// crates/ethercat-esi/src/sii.rs

//! Slave Information Interface (SII) EEPROM image encoding and decoding (ETG.2010).
//!
//! The image starts with the 16-byte ConfigData area and the identity and
//! mailbox words, followed at word 0x40 by a list of categories terminated
//! by 0xFFFF. All words are little-endian.

use crate::builder::{FMMU_USAGE, PHYSICS};
use crate::error::EsiError;
use crate::primitives;
use crate::synthesizer::{PdoMappingEntry, Synthesis};
use crate::types::{
    CoeSetup, Device, Eeprom, PdoDirection, SM_TYPE_MBOX_IN, SM_TYPE_MBOX_OUT,
};
use log::{debug, warn};

pub const CONFIG_DATA_SIZE: usize = 16;
const CONFIG_DATA_CRC_OFFSET: usize = 14;
/// Smallest image ever produced, in bytes.
pub const MIN_EEPROM_SIZE: usize = 1024;
pub const SII_VERSION: u16 = 1;

const VENDOR_OFFSET: usize = 0x08 * 2;
const MAILBOX_OUT_OFFSET: usize = 0x18 * 2;
const MAILBOX_IN_OFFSET: usize = 0x1A * 2;
const MAILBOX_PROTO_OFFSET: usize = 0x1C * 2;
const SIZE_OFFSET: usize = 0x3E * 2;
const FIRST_CATEGORY_OFFSET: usize = 0x40 * 2;

const CAT_STRINGS: u16 = 10;
const CAT_GENERAL: u16 = 30;
const CAT_FMMU: u16 = 40;
const CAT_SYNCM: u16 = 41;
const CAT_TXPDO: u16 = 50;
const CAT_RXPDO: u16 = 51;
const CAT_DC: u16 = 60;
const CAT_END: u16 = 0xFFFF;

const MBOX_PROTO_COE: u16 = 0x0004;
const MBOX_PROTO_FOE: u16 = 0x0008;

/// CRC-8 as used for the ConfigData checksum: polynomial 0x07, initial 0xFF.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0xFF, |mut crc, byte| {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            };
        }
        crc
    })
}

impl Eeprom {
    /// Decodes `config_data` into the 16-byte ConfigData area with its CRC in byte 14.
    ///
    /// Short strings are zero-padded. A CRC present in the string that does
    /// not match is replaced with a warning.
    pub fn config_bytes(&self) -> Result<[u8; CONFIG_DATA_SIZE], EsiError> {
        let decoded = hex::decode(self.config_data.trim())?;
        if decoded.len() > CONFIG_DATA_SIZE {
            warn!(
                "ConfigData has {} bytes; only the first {} are used",
                decoded.len(),
                CONFIG_DATA_SIZE
            );
        }

        let mut bytes = [0u8; CONFIG_DATA_SIZE];
        for (dst, src) in bytes.iter_mut().zip(&decoded) {
            *dst = *src;
        }
        let crc = crc8(&bytes[..CONFIG_DATA_CRC_OFFSET]);
        if decoded.len() > CONFIG_DATA_CRC_OFFSET && bytes[CONFIG_DATA_CRC_OFFSET] != crc {
            warn!(
                "ConfigData CRC 0x{:02X} does not match computed 0x{:02X}",
                bytes[CONFIG_DATA_CRC_OFFSET], crc
            );
        }
        bytes[CONFIG_DATA_CRC_OFFSET] = crc;
        Ok(bytes)
    }
}

/// Encodes the SII image of `device` without PDO categories.
pub fn encode_eeprom(
    vendor_id: u32,
    device: &Device,
    group_type: &str,
) -> Result<Vec<u8>, EsiError> {
    SiiImage::new(vendor_id, device, group_type).encode(None)
}

/// Encodes the SII image including TXPDO/RXPDO categories for the mapping
/// objects of `synthesis`.
pub fn encode_eeprom_with_pdos(
    vendor_id: u32,
    device: &Device,
    group_type: &str,
    synthesis: &Synthesis,
) -> Result<Vec<u8>, EsiError> {
    SiiImage::new(vendor_id, device, group_type).encode(Some(synthesis))
}

struct SiiImage<'a> {
    vendor_id: u32,
    device: &'a Device,
    group_type: &'a str,
    size: usize,
    buf: Vec<u8>,
}

impl<'a> SiiImage<'a> {
    fn new(vendor_id: u32, device: &'a Device, group_type: &'a str) -> Self {
        let size = MIN_EEPROM_SIZE.max(device.eeprom.byte_size as usize);
        Self {
            vendor_id,
            device,
            group_type,
            size,
            buf: Vec::with_capacity(size),
        }
    }

    fn encode(mut self, synthesis: Option<&Synthesis>) -> Result<Vec<u8>, EsiError> {
        self.header()?;
        self.strings();
        self.general();
        self.fmmu();
        self.sync_managers();
        if let Some(synthesis) = synthesis {
            self.pdos(synthesis, PdoDirection::Tx);
            self.pdos(synthesis, PdoDirection::Rx);
        }
        self.dc();
        self.put_u16(CAT_END);

        if self.buf.len() > self.size {
            return Err(EsiError::EepromOverflow {
                needed: self.buf.len(),
                size: self.size,
            });
        }
        debug!(
            "Encoded SII image for '{}': {} of {} bytes used",
            self.device.name,
            self.buf.len(),
            self.size
        );
        self.buf.resize(self.size, 0);
        Ok(self.buf)
    }

    fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn pad_to(&mut self, offset: usize) {
        if self.buf.len() < offset {
            self.buf.resize(offset, 0);
        }
    }

    /// Writes the 16-bit word at a fixed byte offset.
    fn set_u16(&mut self, offset: usize, v: u16) {
        self.pad_to(offset + 2);
        self.buf[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn category(&mut self, code: u16, words: usize) {
        self.put_u16(code);
        self.put_u16(words as u16);
    }

    fn header(&mut self) -> Result<(), EsiError> {
        let config = self.device.eeprom.config_bytes()?;
        self.buf.extend_from_slice(&config);

        self.pad_to(VENDOR_OFFSET);
        self.put_u32(self.vendor_id);
        self.put_u32(self.device.product_code);
        self.put_u32(self.device.revision_no);

        let device = self.device;
        let sm = &device.sync_managers;
        let mailboxes: Vec<(usize, u16, u16)> = sm
            .channels
            .iter()
            .zip(sm.types.iter())
            .filter_map(|(channel, &code)| {
                let offset = match code {
                    SM_TYPE_MBOX_OUT => MAILBOX_OUT_OFFSET,
                    SM_TYPE_MBOX_IN => MAILBOX_IN_OFFSET,
                    _ => return None,
                };
                Some((offset, channel.start_address, channel.default_size.unwrap_or(0)))
            })
            .collect();
        for (offset, start, size) in mailboxes {
            self.set_u16(offset, start);
            self.set_u16(offset + 2, size);
        }

        let mut proto = 0;
        if self.device.mailbox.coe.is_some() {
            proto |= MBOX_PROTO_COE;
        }
        if self.device.mailbox.foe {
            proto |= MBOX_PROTO_FOE;
        }
        self.set_u16(MAILBOX_PROTO_OFFSET, proto);

        let kbit = (self.size * 8 / 1024).saturating_sub(1);
        self.set_u16(SIZE_OFFSET, kbit as u16);
        self.set_u16(SIZE_OFFSET + 2, SII_VERSION);
        self.pad_to(FIRST_CATEGORY_OFFSET);
        Ok(())
    }

    /// STRINGS: 1 = group type, 2 = device name.
    fn strings(&mut self) {
        let device = self.device;
        let strings = [self.group_type, device.name.as_str()];
        let len: usize = 1 + strings.iter().map(|s| s.len().min(255) + 1).sum::<usize>();
        let padding = len % 2;
        self.category(CAT_STRINGS, (len + padding) / 2);
        self.put_u8(strings.len() as u8);
        for s in strings {
            let bytes = &s.as_bytes()[..s.len().min(255)];
            self.put_u8(bytes.len() as u8);
            self.buf.extend_from_slice(bytes);
        }
        let end = self.buf.len() + padding;
        self.pad_to(end);
    }

    fn general(&mut self) {
        let device = self.device;
        let mailbox = &device.mailbox;
        let coe_details = mailbox.coe.map_or(0, |c| {
            0x01 | u8::from(c.sdo_info) << 1
                | u8::from(c.pdo_assign) << 2
                | u8::from(c.pdo_config) << 3
                | u8::from(c.complete_access) << 5
        });
        let flags = u8::from(mailbox.data_link_layer) << 2;

        self.category(CAT_GENERAL, 0x10);
        let start = self.buf.len();
        self.put_u8(1); // group type
        self.put_u8(0); // image name
        self.put_u8(0); // order number
        self.put_u8(2); // device name
        self.put_u8(0);
        self.put_u8(coe_details);
        self.put_u8(u8::from(mailbox.foe));
        self.put_u8(0); // EoE
        self.put_u8(0);
        self.put_u8(0);
        self.put_u8(0);
        self.put_u8(flags);
        self.put_u16(0); // E-Bus current
        self.put_u8(0);
        self.put_u8(0);
        self.put_u16(physical_ports(PHYSICS));
        self.pad_to(start + 0x20);
    }

    fn fmmu(&mut self) {
        let padding = FMMU_USAGE.len() % 2;
        self.category(CAT_FMMU, (FMMU_USAGE.len() + padding) / 2);
        for usage in FMMU_USAGE {
            self.put_u8(match usage {
                "Outputs" => 1,
                "Inputs" => 2,
                "MBoxState" => 3,
                _ => 0,
            });
        }
        let end = self.buf.len() + padding;
        self.pad_to(end);
    }

    fn sync_managers(&mut self) {
        let device = self.device;
        let sm = &device.sync_managers;
        if sm.channels.is_empty() {
            return;
        }
        let entries: Vec<[u8; 8]> = sm
            .channels
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let start = c.start_address.to_le_bytes();
                let size = c.default_size.unwrap_or(0).to_le_bytes();
                [
                    start[0],
                    start[1],
                    size[0],
                    size[1],
                    c.control_byte,
                    0,
                    u8::from(c.enable),
                    sm.types.get(i).copied().unwrap_or(0),
                ]
            })
            .collect();
        self.category(CAT_SYNCM, entries.len() * 4);
        for entry in entries {
            self.buf.extend_from_slice(&entry);
        }
    }

    fn pdos(&mut self, synthesis: &Synthesis, direction: PdoDirection) {
        let device = self.device;
        let (code, channel) = match direction {
            PdoDirection::Tx => (CAT_TXPDO, device.sync_managers.tx_pdo),
            PdoDirection::Rx => (CAT_RXPDO, device.sync_managers.rx_pdo),
        };
        for &index in synthesis.mappings(direction) {
            let Some(mapping) = synthesis.object(index) else {
                continue;
            };
            let entries: Vec<PdoMappingEntry> = mapping
                .sub_items()
                .iter()
                .filter(|s| s.sub_index != 0)
                .filter_map(|s| s.default_value().and_then(PdoMappingEntry::from_hex))
                .collect();

            self.category(code, (entries.len() * 8 + 8) / 2);
            self.put_u16(mapping.index);
            self.put_u8(entries.len() as u8);
            self.put_u8(channel as u8);
            self.put_u8(0); // DC
            self.put_u8(0); // name
            self.put_u16(0x0011); // mandatory | fixed
            for entry in entries {
                let coe_type = device
                    .object(entry.index)
                    .and_then(|o| o.sub_item(entry.sub_index))
                    .and_then(|s| s.data_type.as_deref())
                    .and_then(primitives::lookup)
                    .map_or(0, |p| p.coe_code as u8);
                self.put_u16(entry.index);
                self.put_u8(entry.sub_index);
                self.put_u8(0);
                self.put_u8(coe_type);
                self.put_u8(entry.bit_length);
                self.put_u16(0);
            }
        }
    }

    fn dc(&mut self) {
        let device = self.device;
        let modes = &device.dc.op_modes;
        if modes.is_empty() {
            return;
        }
        let mut body = Vec::with_capacity(modes.len() * 24);
        for mode in modes {
            let cycle0 = mode.cycle_time_sync0.unwrap_or_default();
            let cycle1 = mode.cycle_time_sync1.unwrap_or_default();
            body.extend_from_slice(&cycle0.value.to_le_bytes());
            body.extend_from_slice(&mode.shift_time_sync0.unwrap_or(0).to_le_bytes());
            body.extend_from_slice(&mode.shift_time_sync1.unwrap_or(0).to_le_bytes());
            body.extend_from_slice(&(cycle1.factor as i16).to_le_bytes());
            body.extend_from_slice(&mode.assign_activate.to_le_bytes());
            body.extend_from_slice(&(cycle0.factor as i16).to_le_bytes());
            body.extend_from_slice(&[0; 6]);
        }
        self.category(CAT_DC, modes.len() * 0x0C);
        self.buf.extend_from_slice(&body);
    }
}

// --- Decoding ---

/// Mailbox area announced in the SII header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxArea {
    pub offset: u16,
    pub size: u16,
}

/// Contents of a GENERAL category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiiGeneral {
    pub group_index: u8,
    pub image_index: u8,
    pub order_index: u8,
    pub name_index: u8,
    /// CoE detail bits: 0x01 supported, 0x02 SDO info, 0x04 PDO assign,
    /// 0x08 PDO config, 0x10 PDO upload, 0x20 complete access.
    pub coe_details: u8,
    pub foe: bool,
    pub eoe: bool,
    pub data_link_layer: bool,
    pub ebus_current: i16,
    pub physical_ports: u16,
}

impl SiiGeneral {
    /// The CoE features as the device model describes them, if CoE is supported.
    pub fn coe(&self) -> Option<CoeSetup> {
        (self.coe_details & 0x01 != 0).then(|| CoeSetup {
            sdo_info: self.coe_details & 0x02 != 0,
            pdo_assign: self.coe_details & 0x04 != 0,
            pdo_config: self.coe_details & 0x08 != 0,
            complete_access: self.coe_details & 0x20 != 0,
            // Not carried by the SII.
            segmented_sdo: false,
        })
    }
}

/// One 8-byte SyncM entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiiSyncManager {
    pub start_address: u16,
    pub length: u16,
    pub control: u8,
    pub status: u8,
    pub enable: u8,
    pub sm_type: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiiPdoEntry {
    pub index: u16,
    pub sub_index: u8,
    pub name_index: u8,
    pub data_type: u8,
    pub bit_length: u8,
}

/// A TXPDO or RXPDO category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiiPdo {
    pub direction: PdoDirection,
    pub index: u16,
    pub sync_manager: u8,
    pub dc: u8,
    pub name_index: u8,
    pub flags: u16,
    pub entries: Vec<SiiPdoEntry>,
}

/// One 24-byte DC op mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiiDcMode {
    pub cycle_time_sync0: u32,
    pub shift_time_sync0: u32,
    pub shift_time_sync1: u32,
    pub sync1_factor: i16,
    pub assign_activate: u16,
    pub sync0_factor: i16,
    pub name_index: u8,
    pub description_index: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiiCategory {
    Strings(Vec<String>),
    General(SiiGeneral),
    /// FMMU usage bytes: 1 outputs, 2 inputs, 3 mailbox state.
    Fmmu(Vec<u8>),
    SyncManagers(Vec<SiiSyncManager>),
    Pdo(SiiPdo),
    Dc(Vec<SiiDcMode>),
    /// A category this decoder does not interpret, kept as raw bytes.
    Other { code: u16, data: Vec<u8> },
}

/// A decoded SII image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSii {
    pub config_data: [u8; CONFIG_DATA_SIZE],
    pub vendor_id: u32,
    pub product_code: u32,
    pub revision_no: u32,
    pub serial_no: u32,
    pub mailbox_out: MailboxArea,
    pub mailbox_in: MailboxArea,
    pub mailbox_protocols: u16,
    /// EEPROM size in KiBit minus one.
    pub size_kbit: u16,
    pub version: u16,
    pub categories: Vec<SiiCategory>,
}

impl DecodedSii {
    /// The STRINGS table, if the image has one.
    pub fn strings(&self) -> &[String] {
        self.categories
            .iter()
            .find_map(|c| match c {
                SiiCategory::Strings(strings) => Some(strings.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Looks up a 1-based string index. Index 0 means "no string".
    pub fn string(&self, index: u8) -> Option<&str> {
        let index = usize::from(index).checked_sub(1)?;
        self.strings().get(index).map(String::as_str)
    }

    pub fn general(&self) -> Option<&SiiGeneral> {
        self.categories.iter().find_map(|c| match c {
            SiiCategory::General(general) => Some(general),
            _ => None,
        })
    }

    pub fn sync_managers(&self) -> &[SiiSyncManager] {
        self.categories
            .iter()
            .find_map(|c| match c {
                SiiCategory::SyncManagers(sms) => Some(sms.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn pdos(&self, direction: PdoDirection) -> impl Iterator<Item = &SiiPdo> {
        self.categories.iter().filter_map(move |c| match c {
            SiiCategory::Pdo(pdo) if pdo.direction == direction => Some(pdo),
            _ => None,
        })
    }
}

/// Decodes an SII image produced by `encode_eeprom` or read from a device.
///
/// Categories are read until the END marker, a zero code or the end of the
/// image. A ConfigData CRC that does not match is logged, not rejected.
///
/// # Errors
/// Returns `EsiError::InvalidSii` if the header is truncated or a category
/// claims more bytes than the image holds.
pub fn decode_eeprom(image: &[u8]) -> Result<DecodedSii, EsiError> {
    let mut reader = SiiReader::new(image);

    let config_data: [u8; CONFIG_DATA_SIZE] = reader
        .bytes(CONFIG_DATA_SIZE)?
        .try_into()
        .map_err(|_| reader.error("truncated ConfigData"))?;
    let crc = crc8(&config_data[..CONFIG_DATA_CRC_OFFSET]);
    if config_data[CONFIG_DATA_CRC_OFFSET] != crc {
        warn!(
            "SII ConfigData CRC 0x{:02X} does not match computed 0x{:02X}",
            config_data[CONFIG_DATA_CRC_OFFSET], crc
        );
    }

    reader.seek(VENDOR_OFFSET)?;
    let vendor_id = reader.u32()?;
    let product_code = reader.u32()?;
    let revision_no = reader.u32()?;
    let serial_no = reader.u32()?;

    reader.seek(MAILBOX_OUT_OFFSET)?;
    let mailbox_out = MailboxArea {
        offset: reader.u16()?,
        size: reader.u16()?,
    };
    let mailbox_in = MailboxArea {
        offset: reader.u16()?,
        size: reader.u16()?,
    };
    let mailbox_protocols = reader.u16()?;

    reader.seek(SIZE_OFFSET)?;
    let size_kbit = reader.u16()?;
    let version = reader.u16()?;

    let mut categories = Vec::new();
    while reader.remaining() >= 2 {
        let code = reader.u16()?;
        if code == CAT_END || code == 0 {
            break;
        }
        let words = reader.u16()?;
        let start = reader.pos;
        let body = reader
            .bytes(usize::from(words) * 2)
            .map_err(|_| EsiError::InvalidSii {
                offset: start,
                reason: "category runs past the end of the image",
            })?;
        categories.push(decode_category(code, body, start)?);
    }
    debug!(
        "Decoded SII image of product 0x{:08X}: {} categories",
        product_code,
        categories.len()
    );

    Ok(DecodedSii {
        config_data,
        vendor_id,
        product_code,
        revision_no,
        serial_no,
        mailbox_out,
        mailbox_in,
        mailbox_protocols,
        size_kbit,
        version,
        categories,
    })
}

fn decode_category(code: u16, body: &[u8], start: usize) -> Result<SiiCategory, EsiError> {
    let mut r = SiiReader::at(body, start);
    Ok(match code {
        CAT_STRINGS => {
            let count = r.u8()?;
            let mut strings = Vec::with_capacity(usize::from(count));
            for _ in 0..count {
                let len = r.u8()?;
                strings.push(String::from_utf8_lossy(r.bytes(usize::from(len))?).into_owned());
            }
            SiiCategory::Strings(strings)
        }
        CAT_GENERAL => {
            let b = r.bytes(18)?;
            SiiCategory::General(SiiGeneral {
                group_index: b[0],
                image_index: b[1],
                order_index: b[2],
                name_index: b[3],
                coe_details: b[5],
                foe: b[6] != 0,
                eoe: b[7] != 0,
                data_link_layer: b[11] & 0x04 != 0,
                ebus_current: i16::from_le_bytes([b[12], b[13]]),
                physical_ports: u16::from_le_bytes([b[16], b[17]]),
            })
        }
        CAT_FMMU => SiiCategory::Fmmu(body.to_vec()),
        CAT_SYNCM => {
            let mut sms = Vec::with_capacity(body.len() / 8);
            while r.remaining() >= 8 {
                sms.push(SiiSyncManager {
                    start_address: r.u16()?,
                    length: r.u16()?,
                    control: r.u8()?,
                    status: r.u8()?,
                    enable: r.u8()?,
                    sm_type: r.u8()?,
                });
            }
            SiiCategory::SyncManagers(sms)
        }
        CAT_TXPDO | CAT_RXPDO => {
            let direction = if code == CAT_TXPDO {
                PdoDirection::Tx
            } else {
                PdoDirection::Rx
            };
            let index = r.u16()?;
            let count = r.u8()?;
            let sync_manager = r.u8()?;
            let dc = r.u8()?;
            let name_index = r.u8()?;
            let flags = r.u16()?;
            let mut entries = Vec::with_capacity(usize::from(count));
            for _ in 0..count {
                let entry = SiiPdoEntry {
                    index: r.u16()?,
                    sub_index: r.u8()?,
                    name_index: r.u8()?,
                    data_type: r.u8()?,
                    bit_length: r.u8()?,
                };
                r.u16()?; // flags
                entries.push(entry);
            }
            SiiCategory::Pdo(SiiPdo {
                direction,
                index,
                sync_manager,
                dc,
                name_index,
                flags,
                entries,
            })
        }
        CAT_DC => {
            let mut modes = Vec::with_capacity(body.len() / 24);
            while r.remaining() >= 24 {
                let mode = SiiDcMode {
                    cycle_time_sync0: r.u32()?,
                    shift_time_sync0: r.u32()?,
                    shift_time_sync1: r.u32()?,
                    sync1_factor: r.u16()? as i16,
                    assign_activate: r.u16()?,
                    sync0_factor: r.u16()? as i16,
                    name_index: r.u8()?,
                    description_index: r.u8()?,
                };
                r.bytes(4)?;
                modes.push(mode);
            }
            SiiCategory::Dc(modes)
        }
        _ => {
            debug!("Keeping SII category {} as {} raw bytes", code, body.len());
            SiiCategory::Other {
                code,
                data: body.to_vec(),
            }
        }
    })
}

/// Little-endian cursor over an image slice. `base` is the slice's offset in
/// the whole image, for error reporting.
struct SiiReader<'a> {
    data: &'a [u8],
    base: usize,
    pos: usize,
}

impl<'a> SiiReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    fn at(data: &'a [u8], base: usize) -> Self {
        Self { data, base, pos: 0 }
    }

    fn error(&self, reason: &'static str) -> EsiError {
        EsiError::InvalidSii {
            offset: self.base + self.pos,
            reason,
        }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn seek(&mut self, pos: usize) -> Result<(), EsiError> {
        if pos > self.data.len() {
            return Err(self.error("image too short for its header"));
        }
        self.pos = pos;
        Ok(())
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], EsiError> {
        let data = self.data;
        let out = data
            .get(self.pos..self.pos + len)
            .ok_or_else(|| self.error("unexpected end of data"))?;
        self.pos += len;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, EsiError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, EsiError> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, EsiError> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Physical port nibbles of a `Physics` string: Y = MII, K = EBUS, H = fast hot connect.
fn physical_ports(physics: &str) -> u16 {
    physics
        .bytes()
        .take(4)
        .enumerate()
        .fold(0, |ports, (i, port)| {
            let code = match port {
                b'Y' => 0x1,
                b'K' => 0x3,
                b'H' => 0x4,
                _ => 0x0,
            };
            ports | code << (i * 4)
        })
}
