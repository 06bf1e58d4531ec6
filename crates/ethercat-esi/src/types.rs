// crates/ethercat-esi/src/types.rs

//! Public, strongly typed device model edited by the user and consumed by the compiler.

use crate::error::EsiError;
use std::slice;

// --- Root Setup Structure ---

/// Everything the editor persists: vendor information, the group catalogue
/// and the devices of this vendor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Setup {
    /// Setup name shown by the editor ("default").
    pub name: String,
    pub vendor: Vendor,
    pub groups: Vec<Group>,
    /// All devices of all groups; each names its group in `group_type`.
    pub devices: Vec<Device>,
}

impl Setup {
    /// Looks up a device by its name.
    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Devices belonging to the group `group_type`, in setup order.
    pub fn group_devices<'a>(&'a self, group_type: &'a str) -> impl Iterator<Item = &'a Device> {
        self.devices.iter().filter(move |d| d.group_type == group_type)
    }
}

/// `<Vendor>` block of the descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vendor {
    pub id: u32,
    pub name: String,
}

/// A device group (`<Group>`), referenced by its type string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub group_type: String,
    pub name: String,
}

// --- Device ---

/// A single slave device and its object dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Device {
    pub name: String,
    /// Type of the group the device is stored under.
    pub group_type: String,
    pub product_code: u32,
    pub revision_no: u32,
    pub profile_no: u32,
    pub eeprom: Eeprom,
    pub sync_managers: SyncManagerSetup,
    pub dc: DcSetup,
    pub mailbox: MailboxSetup,
    /// User-authored objects. Sorted by index before every compilation.
    pub objects: Vec<Object>,
}

impl Device {
    /// Creates a device with the default SOES-style sync manager layout and
    /// an empty dictionary.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile_no: 5001,
            ..Default::default()
        }
    }

    /// Returns the user object at `index`, if any.
    pub fn object(&self, index: u16) -> Option<&Object> {
        self.objects.iter().find(|o| o.index == index)
    }
}

/// EEPROM bootstrap image settings (`<Eeprom>`).
#[derive(Debug, Clone, PartialEq)]
pub struct Eeprom {
    /// EEPROM size in bytes.
    pub byte_size: u32,
    /// Raw ConfigData hex string, copied verbatim into the descriptor.
    pub config_data: String,
}

impl Default for Eeprom {
    fn default() -> Self {
        Self {
            byte_size: 2048,
            config_data: "06800681000000000000".into(),
        }
    }
}

// --- Sync Managers ---

/// Sync manager type codes as stored in object 0x1C00.
pub const SM_TYPE_MBOX_OUT: u8 = 1;
pub const SM_TYPE_MBOX_IN: u8 = 2;
pub const SM_TYPE_OUTPUTS: u8 = 3;
pub const SM_TYPE_INPUTS: u8 = 4;

/// Configuration of the four sync manager channels.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncManagerSetup {
    /// Channel type codes, copied into object 0x1C00.
    pub types: [u8; 4],
    /// Per-channel buffer configuration, in channel order.
    pub channels: Vec<SyncManagerChannel>,
    /// Channel carrying RxPDOs (outputs).
    pub rx_pdo: usize,
    /// Channel carrying TxPDOs (inputs).
    pub tx_pdo: usize,
}

impl Default for SyncManagerSetup {
    fn default() -> Self {
        Self {
            types: [
                SM_TYPE_MBOX_OUT,
                SM_TYPE_MBOX_IN,
                SM_TYPE_OUTPUTS,
                SM_TYPE_INPUTS,
            ],
            channels: vec![
                SyncManagerChannel::mailbox("MBoxOut", 0x1000, 0x26),
                SyncManagerChannel::mailbox("MBoxIn", 0x1080, 0x22),
                SyncManagerChannel::process_data("Outputs", 0x1100, 0x64),
                SyncManagerChannel::process_data("Inputs", 0x1400, 0x20),
            ],
            rx_pdo: 2,
            tx_pdo: 3,
        }
    }
}

/// One `<Sm>` channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncManagerChannel {
    pub min_size: Option<u16>,
    pub max_size: Option<u16>,
    /// Buffer size in bytes. Recomputed for the PDO channels on every compilation.
    pub default_size: Option<u16>,
    pub start_address: u16,
    pub control_byte: u8,
    pub enable: bool,
    /// Element text, e.g. "MBoxOut".
    pub description: String,
}

impl SyncManagerChannel {
    fn mailbox(description: &str, start_address: u16, control_byte: u8) -> Self {
        Self {
            min_size: Some(0x24),
            max_size: Some(0x80),
            default_size: Some(0x80),
            start_address,
            control_byte,
            enable: true,
            description: description.into(),
        }
    }

    fn process_data(description: &str, start_address: u16, control_byte: u8) -> Self {
        Self {
            min_size: None,
            max_size: None,
            default_size: None,
            start_address,
            control_byte,
            enable: true,
            description: description.into(),
        }
    }
}

// --- Distributed Clocks ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DcSetup {
    pub op_modes: Vec<OpMode>,
}

/// A DC operating mode (`<OpMode>`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpMode {
    pub name: String,
    pub description: String,
    pub assign_activate: u16,
    pub cycle_time_sync0: Option<CycleTime>,
    pub shift_time_sync0: Option<i32>,
    pub cycle_time_sync1: Option<CycleTime>,
    pub shift_time_sync1: Option<i32>,
}

/// `<CycleTimeSyncN Factor="..">value</CycleTimeSyncN>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTime {
    pub factor: i32,
    pub value: u32,
}

// --- Mailbox ---

#[derive(Debug, Clone, PartialEq)]
pub struct MailboxSetup {
    pub data_link_layer: bool,
    /// `None` when the device has no CoE support.
    pub coe: Option<CoeSetup>,
    pub foe: bool,
}

/// A new device speaks CoE with SDO information, complete access and segmented SDO.
impl Default for MailboxSetup {
    fn default() -> Self {
        Self {
            data_link_layer: true,
            coe: Some(CoeSetup {
                sdo_info: true,
                pdo_assign: false,
                pdo_config: false,
                complete_access: true,
                segmented_sdo: true,
            }),
            foe: false,
        }
    }
}

/// CoE feature flags (`<CoE>` attributes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoeSetup {
    pub sdo_info: bool,
    pub pdo_assign: bool,
    pub pdo_config: bool,
    pub complete_access: bool,
    pub segmented_sdo: bool,
}

// --- Object Dictionary ---

/// Access rights of a sub-item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Access {
    #[default]
    ReadOnly,
    ReadWrite,
    WriteOnly,
}

impl Access {
    /// The ESI `<Access>` text.
    pub fn as_str(self) -> &'static str {
        match self {
            Access::ReadOnly => "ro",
            Access::ReadWrite => "rw",
            Access::WriteOnly => "wo",
        }
    }
}

/// Device states in which a read or write is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restriction {
    PreOp,
    PreOpSafeOp,
    PreOpOp,
    SafeOp,
    SafeOpOp,
    Op,
}

impl Restriction {
    pub fn as_str(self) -> &'static str {
        match self {
            Restriction::PreOp => "PreOP",
            Restriction::PreOpSafeOp => "PreOP_SafeOP",
            Restriction::PreOpOp => "PreOP_OP",
            Restriction::SafeOp => "SafeOP",
            Restriction::SafeOpOp => "SafeOP_OP",
            Restriction::Op => "OP",
        }
    }

    pub fn from_esi(s: &str) -> Option<Self> {
        match s {
            "PreOP" => Some(Restriction::PreOp),
            "PreOP_SafeOP" => Some(Restriction::PreOpSafeOp),
            "PreOP_OP" => Some(Restriction::PreOpOp),
            "SafeOP" => Some(Restriction::SafeOp),
            "SafeOP_OP" => Some(Restriction::SafeOpOp),
            "OP" => Some(Restriction::Op),
            _ => None,
        }
    }
}

/// Direction of a cyclic process data mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdoDirection {
    /// Controller to device (outputs).
    Rx,
    /// Device to controller (inputs).
    Tx,
}

impl PdoDirection {
    /// The `<PdoMapping>` flag letter.
    pub fn flag(self) -> &'static str {
        match self {
            PdoDirection::Rx => "R",
            PdoDirection::Tx => "T",
        }
    }
}

/// One addressable position inside an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubItem {
    pub sub_index: u8,
    /// Primitive name (e.g. "UINT") or "STRING". `None` if the user left it blank.
    pub data_type: Option<String>,
    pub name: String,
    /// Raw default value: a hex byte string for numeric types, literal text for strings.
    pub default_data: Option<String>,
    pub access: Access,
    pub read_restrictions: Option<Restriction>,
    pub write_restrictions: Option<Restriction>,
    pub pdo: Option<PdoDirection>,
}

impl SubItem {
    pub fn new(sub_index: u8, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            sub_index,
            name: name.into(),
            data_type: Some(data_type.into()),
            ..Default::default()
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_data = Some(value.into());
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_pdo(mut self, direction: PdoDirection) -> Self {
        self.pdo = Some(direction);
        self
    }

    /// True if the data type names a string type.
    pub fn is_string(&self) -> bool {
        self.data_type
            .as_deref()
            .is_some_and(|t| t.to_ascii_uppercase().contains("STRING"))
    }

    /// Default value, ignoring empty strings.
    pub fn default_value(&self) -> Option<&str> {
        self.default_data.as_deref().filter(|d| !d.is_empty())
    }
}

/// Object shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Variable,
    Record,
    Array,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Variable => "VARIABLE",
            ObjectKind::Record => "RECORD",
            ObjectKind::Array => "ARRAY",
        }
    }
}

/// Sub-items of an object, tagged by shape.
///
/// For `Record` and `Array` the first entry is the sub-index 0 count.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectBody {
    Variable(SubItem),
    Record(Vec<SubItem>),
    Array(Vec<SubItem>),
}

/// A dictionary object.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub index: u16,
    pub name: Option<String>,
    pub body: ObjectBody,
}

impl Object {
    /// Builds an object of `kind` from its sub-items.
    ///
    /// # Errors
    /// Returns `EsiError::InvalidObject` if a VARIABLE has no sub-item or a
    /// RECORD/ARRAY lacks its sub-index 0 entry.
    pub fn new(
        index: u16,
        name: Option<String>,
        kind: ObjectKind,
        mut sub_items: Vec<SubItem>,
    ) -> Result<Self, EsiError> {
        let body = match kind {
            ObjectKind::Variable => {
                if sub_items.len() > 1 {
                    log::warn!(
                        "VARIABLE 0x{:04X} has {} sub-items; only the first is kept",
                        index,
                        sub_items.len()
                    );
                }
                if sub_items.is_empty() {
                    return Err(EsiError::InvalidObject {
                        index,
                        reason: "VARIABLE without a value sub-item",
                    });
                }
                ObjectBody::Variable(sub_items.swap_remove(0))
            }
            ObjectKind::Record | ObjectKind::Array => {
                if sub_items.first().is_none_or(|s| s.sub_index != 0) {
                    return Err(EsiError::InvalidObject {
                        index,
                        reason: "composite object without sub-index 0",
                    });
                }
                if kind == ObjectKind::Record {
                    ObjectBody::Record(sub_items)
                } else {
                    ObjectBody::Array(sub_items)
                }
            }
        };
        Ok(Self { index, name, body })
    }

    pub fn variable(index: u16, name: impl Into<String>, value: SubItem) -> Self {
        Self {
            index,
            name: Some(name.into()),
            body: ObjectBody::Variable(value),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self.body {
            ObjectBody::Variable(_) => ObjectKind::Variable,
            ObjectBody::Record(_) => ObjectKind::Record,
            ObjectBody::Array(_) => ObjectKind::Array,
        }
    }

    pub fn sub_items(&self) -> &[SubItem] {
        match &self.body {
            ObjectBody::Variable(item) => slice::from_ref(item),
            ObjectBody::Record(items) | ObjectBody::Array(items) => items,
        }
    }

    pub fn sub_item(&self, sub_index: u8) -> Option<&SubItem> {
        self.sub_items().iter().find(|s| s.sub_index == sub_index)
    }

    /// The object's name, falling back to the name of its first sub-item.
    ///
    /// The editor names RECORD and ARRAY objects through sub-index 0, so the
    /// fallback applies to every kind.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| {
                self.sub_items()
                    .first()
                    .map(|s| s.name.as_str())
                    .filter(|n| !n.is_empty())
            })
            .unwrap_or("unnamed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_requires_value() {
        let result = Object::new(0x6000, None, ObjectKind::Variable, Vec::new());
        assert!(matches!(
            result,
            Err(EsiError::InvalidObject { index: 0x6000, .. })
        ));
    }

    #[test]
    fn test_record_requires_sub_index_zero() {
        let items = vec![SubItem::new(1, "Value", "UINT")];
        let result = Object::new(0x7000, None, ObjectKind::Record, items);
        assert!(matches!(result, Err(EsiError::InvalidObject { .. })));
    }

    #[test]
    fn test_variable_keeps_first_sub_item() {
        let items = vec![
            SubItem::new(0, "Counter", "UDINT"),
            SubItem::new(1, "Stray", "USINT"),
        ];
        let obj = Object::new(0x6000, None, ObjectKind::Variable, items).unwrap();
        assert_eq!(obj.kind(), ObjectKind::Variable);
        assert_eq!(obj.sub_items().len(), 1);
        assert_eq!(obj.sub_items()[0].name, "Counter");
    }

    #[test]
    fn test_display_name_fallbacks() {
        let named = Object::variable(0x6000, "Inputs", SubItem::new(0, "Value", "USINT"));
        assert_eq!(named.display_name(), "Inputs");

        let from_value = Object::new(
            0x6001,
            None,
            ObjectKind::Variable,
            vec![SubItem::new(0, "Temperature", "INT")],
        )
        .unwrap();
        assert_eq!(from_value.display_name(), "Temperature");

        let record = Object::new(
            0x7000,
            Some(String::new()),
            ObjectKind::Record,
            vec![SubItem::new(0, "Motor outputs", "USINT")],
        )
        .unwrap();
        assert_eq!(record.display_name(), "Motor outputs");

        let array = Object::new(
            0x8000,
            None,
            ObjectKind::Array,
            vec![SubItem::new(0, "Gains", "USINT")],
        )
        .unwrap();
        assert_eq!(array.display_name(), "Gains");

        let blank = Object::new(
            0x7001,
            None,
            ObjectKind::Record,
            vec![SubItem::new(0, "", "USINT")],
        )
        .unwrap();
        assert_eq!(blank.display_name(), "unnamed");
    }

    #[test]
    fn test_is_string_is_case_insensitive() {
        assert!(SubItem::new(0, "Name", "string").is_string());
        assert!(SubItem::new(0, "Name", "VISIBLE_STRING").is_string());
        assert!(!SubItem::new(0, "Value", "UINT").is_string());
    }

    #[test]
    fn test_restriction_names_round_trip() {
        for r in [
            Restriction::PreOp,
            Restriction::PreOpSafeOp,
            Restriction::PreOpOp,
            Restriction::SafeOp,
            Restriction::SafeOpOp,
            Restriction::Op,
        ] {
            assert_eq!(Restriction::from_esi(r.as_str()), Some(r));
        }
        assert_eq!(Restriction::from_esi("Init"), None);
    }
}
