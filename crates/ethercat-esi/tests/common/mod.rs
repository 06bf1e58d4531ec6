// crates/ethercat-esi/tests/common/mod.rs

//! Test-only view of the produced ESI document, deserialized with `quick_xml::de`.
//! Only the elements the tests look at are modelled.

#![allow(dead_code)]

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EtherCatInfo {
    #[serde(rename = "@Version")]
    pub version: String,
    #[serde(rename = "@noNamespaceSchemaLocation")]
    pub schema_location: String,
    #[serde(rename = "Vendor")]
    pub vendor: VendorXml,
    #[serde(rename = "Descriptions")]
    pub descriptions: Descriptions,
}

impl EtherCatInfo {
    pub fn device(&self) -> &DeviceXml {
        &self.descriptions.devices.device[0]
    }
}

#[derive(Debug, Deserialize)]
pub struct VendorXml {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Descriptions {
    #[serde(rename = "Groups")]
    pub groups: Groups,
    #[serde(rename = "Devices")]
    pub devices: Devices,
}

#[derive(Debug, Deserialize)]
pub struct Groups {
    #[serde(rename = "Group")]
    pub group: Vec<GroupXml>,
}

#[derive(Debug, Deserialize)]
pub struct GroupXml {
    #[serde(rename = "Type")]
    pub group_type: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Devices {
    #[serde(rename = "Device")]
    pub device: Vec<DeviceXml>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceXml {
    #[serde(rename = "@Physics")]
    pub physics: String,
    #[serde(rename = "Type")]
    pub device_type: DeviceTypeXml,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "GroupType")]
    pub group_type: String,
    #[serde(rename = "Profile")]
    pub profile: ProfileXml,
    #[serde(rename = "Fmmu", default)]
    pub fmmu: Vec<String>,
    #[serde(rename = "Sm", default)]
    pub sm: Vec<SmXml>,
    #[serde(rename = "RxPdo", default)]
    pub rx_pdo: Vec<PdoXml>,
    #[serde(rename = "TxPdo", default)]
    pub tx_pdo: Vec<PdoXml>,
    #[serde(rename = "Mailbox")]
    pub mailbox: MailboxXml,
    #[serde(rename = "Dc")]
    pub dc: Option<DcXml>,
    #[serde(rename = "Eeprom")]
    pub eeprom: EepromXml,
}

impl DeviceXml {
    pub fn data_types(&self) -> &[DataTypeXml] {
        &self.profile.dictionary.data_types.data_type
    }

    pub fn objects(&self) -> &[ObjectXml] {
        &self.profile.dictionary.objects.object
    }

    pub fn data_type(&self, name: &str) -> Option<&DataTypeXml> {
        self.data_types().iter().find(|t| t.name == name)
    }

    pub fn object(&self, index: u16) -> Option<&ObjectXml> {
        self.objects().iter().find(|o| o.index() == index)
    }
}

#[derive(Debug, Deserialize)]
pub struct DeviceTypeXml {
    #[serde(rename = "@ProductCode")]
    pub product_code: String,
    #[serde(rename = "@RevisionNo")]
    pub revision_no: String,
    #[serde(rename = "$text")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileXml {
    #[serde(rename = "ProfileNo")]
    pub profile_no: u32,
    #[serde(rename = "Dictionary")]
    pub dictionary: DictionaryXml,
}

#[derive(Debug, Deserialize)]
pub struct DictionaryXml {
    #[serde(rename = "DataTypes")]
    pub data_types: DataTypesXml,
    #[serde(rename = "Objects")]
    pub objects: ObjectsXml,
}

#[derive(Debug, Deserialize)]
pub struct DataTypesXml {
    #[serde(rename = "DataType", default)]
    pub data_type: Vec<DataTypeXml>,
}

#[derive(Debug, Deserialize)]
pub struct DataTypeXml {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "BaseType")]
    pub base_type: Option<String>,
    #[serde(rename = "BitSize")]
    pub bit_size: u32,
    #[serde(rename = "ArrayInfo")]
    pub array_info: Option<ArrayInfoXml>,
    #[serde(rename = "SubItem", default)]
    pub sub_item: Vec<DataTypeSubItemXml>,
}

#[derive(Debug, Deserialize)]
pub struct ArrayInfoXml {
    #[serde(rename = "LBound")]
    pub lower_bound: u32,
    #[serde(rename = "Elements")]
    pub elements: u32,
}

#[derive(Debug, Deserialize)]
pub struct DataTypeSubItemXml {
    #[serde(rename = "SubIdx")]
    pub sub_idx: Option<u8>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub type_name: String,
    #[serde(rename = "BitSize")]
    pub bit_size: u32,
    #[serde(rename = "BitOffs")]
    pub bit_offs: u32,
}

#[derive(Debug, Deserialize)]
pub struct ObjectsXml {
    #[serde(rename = "Object", default)]
    pub object: Vec<ObjectXml>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectXml {
    #[serde(rename = "Index")]
    pub index: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub type_name: Option<String>,
    #[serde(rename = "BitSize")]
    pub bit_size: Option<u32>,
    #[serde(rename = "Info")]
    pub info: Option<InfoXml>,
}

impl ObjectXml {
    pub fn index(&self) -> u16 {
        parse_esi_hex(&self.index) as u16
    }
}

#[derive(Debug, Deserialize)]
pub struct InfoXml {
    #[serde(rename = "DefaultData")]
    pub default_data: Option<String>,
    #[serde(rename = "SubItem", default)]
    pub sub_item: Vec<InfoSubItemXml>,
}

#[derive(Debug, Deserialize)]
pub struct InfoSubItemXml {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Info")]
    pub info: InfoXml,
}

#[derive(Debug, Deserialize)]
pub struct SmXml {
    #[serde(rename = "@MinSize")]
    pub min_size: Option<String>,
    #[serde(rename = "@MaxSize")]
    pub max_size: Option<String>,
    #[serde(rename = "@DefaultSize")]
    pub default_size_hex: String,
    #[serde(rename = "@StartAddress")]
    pub start_address: String,
    #[serde(rename = "@Enable")]
    pub enable: String,
    #[serde(rename = "$text")]
    pub description: String,
}

impl SmXml {
    pub fn default_size(&self) -> u64 {
        parse_esi_hex(&self.default_size_hex)
    }
}

#[derive(Debug, Deserialize)]
pub struct PdoXml {
    #[serde(rename = "@Mandatory")]
    pub mandatory: String,
    #[serde(rename = "@Fixed")]
    pub fixed: String,
    #[serde(rename = "@Sm")]
    pub sm: u32,
    #[serde(rename = "Index")]
    pub index: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Entry", default)]
    pub entry: Vec<EntryXml>,
}

#[derive(Debug, Deserialize)]
pub struct EntryXml {
    #[serde(rename = "Index")]
    pub index: String,
    #[serde(rename = "SubIndex")]
    pub sub_index: u32,
    #[serde(rename = "BitLen")]
    pub bit_len: u32,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "DataType")]
    pub data_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MailboxXml {
    #[serde(rename = "@DataLinkLayer")]
    pub data_link_layer: String,
    #[serde(rename = "CoE")]
    pub coe: Option<CoeXml>,
}

#[derive(Debug, Deserialize)]
pub struct CoeXml {
    #[serde(rename = "@SdoInfo")]
    pub sdo_info: String,
    #[serde(rename = "@CompleteAccess")]
    pub complete_access: String,
}

#[derive(Debug, Deserialize)]
pub struct DcXml {
    #[serde(rename = "OpMode", default)]
    pub op_mode: Vec<OpModeXml>,
}

#[derive(Debug, Deserialize)]
pub struct OpModeXml {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "AssignActivate")]
    pub assign_activate: String,
}

#[derive(Debug, Deserialize)]
pub struct EepromXml {
    #[serde(rename = "ByteSize")]
    pub byte_size: u32,
    #[serde(rename = "ConfigData")]
    pub config_data: String,
}

/// Parses `#x1A00`.
pub fn parse_esi_hex(s: &str) -> u64 {
    let digits = s
        .strip_prefix("#x")
        .unwrap_or_else(|| panic!("not an ESI hex value: {}", s));
    u64::from_str_radix(digits, 16).unwrap()
}

/// Deserializes a compiled document.
pub fn parse(bytes: &[u8]) -> EtherCatInfo {
    let xml = std::str::from_utf8(bytes).expect("document is not UTF-8");
    quick_xml::de::from_str(xml).unwrap_or_else(|e| panic!("{}\n{}", e, xml))
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
