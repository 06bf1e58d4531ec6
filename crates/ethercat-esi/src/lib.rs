// src/lib.rs

#![doc = "Compiles EtherCAT slave device descriptions into ESI (EtherCAT Slave Information) documents."]
#![doc = ""]
#![doc = "The device model (identity, object dictionary, sync managers, mailbox, DC and"]
#![doc = "EEPROM settings) is compiled into an ETG.1000.6 `EtherCATInfo` document:"]
#![doc = "- `compile`: Synthesizes the mandatory objects, derives all data types and writes the document."]
#![doc = "- `load_setup_from_str` / `save_setup_to_string`: The persisted JSON form of a `Setup`."]
#![doc = "- `sii::encode_eeprom`: The binary SII EEPROM image of a device."]
#![doc = "- `sii::decode_eeprom`: Reads an SII image back into its header and categories."]

// --- Crate Modules ---

mod builder;
mod error;
mod model;
mod parser;
mod primitives;
mod resolver;
mod types;
mod utils;

pub mod deriver;
pub mod sii;
pub mod sink;
pub mod store;
pub mod synthesizer;

// --- Public API Re-exports ---

pub use builder::{ESI_VERSION, FMMU_USAGE, NULL_GROUP, PHYSICS, compile, compile_into};
pub use deriver::{DataType, derive_data_types};
pub use error::EsiError;
pub use parser::{load_setup_from_str, save_setup_to_string};
pub use primitives::{Primitive, bit_size, lookup as lookup_primitive};
pub use sink::{QuickXmlSink, XmlSink};
pub use store::{DirectoryPublisher, JsonFileStore, Publisher, SetupStore};
pub use synthesizer::{PdoMappingEntry, Synthesis, synthesize, synthesize_objects};
pub use types::{
    Access, CoeSetup, CycleTime, DcSetup, Device, Eeprom, Group, MailboxSetup, Object,
    ObjectBody, ObjectKind, OpMode, PdoDirection, Restriction, SM_TYPE_INPUTS, SM_TYPE_MBOX_IN,
    SM_TYPE_MBOX_OUT, SM_TYPE_OUTPUTS, Setup, SubItem, SyncManagerChannel, SyncManagerSetup,
    Vendor,
};
pub use utils::format_esi_hex;
