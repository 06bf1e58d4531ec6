// crates/ethercat-esi/src/builder/mod.rs

//! Compiles a `Device` into an EtherCAT Slave Information (ESI) document.
//!
//! A run prunes and sorts the user objects, synthesizes the mandatory
//! objects, derives the data types of the whole dictionary and then writes
//! the document through an [`XmlSink`] in the order fixed by the ETG.1000.6
//! schema. All derived state is local to the run.

mod device;
mod dictionary;

pub use device::FMMU_USAGE;

use crate::deriver::TypeDeriver;
use crate::error::EsiError;
use crate::sink::{QuickXmlSink, XmlSink};
use crate::synthesizer::{Synthesis, synthesize_objects};
use crate::types::{Device, Group, PdoDirection, Setup, Vendor};
use crate::utils::format_esi_hex;
use log::{debug, warn};

/// `Version` attribute of `<EtherCATInfo>`.
pub const ESI_VERSION: &str = "1.6";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "EtherCATInfo.xsd";
/// `Physics` attribute of `<Device>`. Not configurable yet.
pub const PHYSICS: &str = "YY";
/// Substituted for a group selection that does not resolve.
pub const NULL_GROUP: &str = "(null)";

/// Compiles `device` into an indented ESI document.
///
/// Updates the default size of the PDO sync managers as a side effect.
///
/// # Errors
/// `EsiError::DuplicateIndex` if two objects share an index, or a writer error.
pub fn compile(
    device: &mut Device,
    vendor: &Vendor,
    groups: &[Group],
    selected_group: &str,
) -> Result<Vec<u8>, EsiError> {
    let mut sink = QuickXmlSink::new();
    compile_into(device, vendor, groups, selected_group, &mut sink)?;
    Ok(sink.flush())
}

/// Same as [`compile`], writing into a caller-provided sink.
pub fn compile_into<S: XmlSink>(
    device: &mut Device,
    vendor: &Vendor,
    groups: &[Group],
    selected_group: &str,
    sink: &mut S,
) -> Result<(), EsiError> {
    // 1. + 2. Prune and sort
    prepare_objects(device)?;

    // 3. Synthesize, then derive over mandatory objects first
    let synthesis = synthesize_objects(device, vendor.id);
    check_collisions(device, &synthesis)?;
    synthesis.write_back_sizes(device);

    let mut deriver = TypeDeriver::new();
    deriver.string_type(&vendor.name);
    deriver.derive(&synthesis.objects);
    deriver.derive(&device.objects);
    let types = deriver.finish();

    let group = resolve_group(groups, selected_group);

    // 4. Root
    sink.start_document()?;
    sink.open_element("EtherCATInfo")?;
    sink.attribute("xmlns:xsi", XSI_NAMESPACE)?;
    sink.attribute("xsi:noNamespaceSchemaLocation", SCHEMA_LOCATION)?;
    sink.attribute("Version", ESI_VERSION)?;

    // 5. Vendor
    sink.open_element("Vendor")?;
    sink.text_element("Id", &format_esi_hex(vendor.id))?;
    sink.cdata_element("Name", &vendor.name)?;
    sink.close_element()?;

    // 6. Group and device
    sink.open_element("Descriptions")?;
    sink.open_element("Groups")?;
    sink.open_element("Group")?;
    sink.text_element("Type", group.0)?;
    sink.cdata_element("Name", group.1)?;
    sink.close_element()?;
    sink.close_element()?;

    sink.open_element("Devices")?;
    sink.open_element("Device")?;
    sink.attribute("Physics", PHYSICS)?;

    // 7. Identity and profile
    sink.open_element("Type")?;
    sink.attribute("ProductCode", &format_esi_hex(device.product_code))?;
    sink.attribute("RevisionNo", &format_esi_hex(device.revision_no))?;
    sink.text(&device.name)?;
    sink.close_element()?;
    sink.cdata_element("Name", &device.name)?;
    sink.text_element("GroupType", group.0)?;

    sink.open_element("Profile")?;
    sink.text_element("ProfileNo", &device.profile_no.to_string())?;
    sink.text_element("AddInfo", "0")?;
    dictionary::write_dictionary(
        sink,
        &types,
        synthesis.objects.iter().chain(device.objects.iter()),
    )?;
    sink.close_element()?;

    // 8. - 13.
    device::write_fmmus(sink)?;
    device::write_sync_managers(sink, &device.sync_managers.channels)?;
    device::write_pdos(sink, device, &synthesis, PdoDirection::Rx)?;
    device::write_pdos(sink, device, &synthesis, PdoDirection::Tx)?;
    device::write_mailbox(sink, &device.mailbox)?;
    device::write_dc(sink, &device.dc)?;
    device::write_eeprom(sink, &device.eeprom)?;

    // 14. Device, Devices, Descriptions, EtherCATInfo
    sink.close_element()?;
    sink.close_element()?;
    sink.close_element()?;
    sink.close_element()?;
    sink.end_document()?;

    debug!(
        "Compiled device '{}': {} data types, {} objects",
        device.name,
        types.len(),
        synthesis.objects.len() + device.objects.len()
    );
    Ok(())
}

/// Drops zero-index objects, sorts by index (stable) and rejects duplicates.
fn prepare_objects(device: &mut Device) -> Result<(), EsiError> {
    device.objects.retain(|o| {
        if o.index == 0 {
            warn!("Dropping object '{}' with index 0", o.display_name());
        }
        o.index != 0
    });
    device.objects.sort_by_key(|o| o.index);

    if let Some(pair) = device.objects.windows(2).find(|w| w[0].index == w[1].index) {
        return Err(EsiError::DuplicateIndex {
            index: pair[0].index,
        });
    }
    debug!("Sorted {} user objects", device.objects.len());
    Ok(())
}

/// Rejects user objects occupying an index the synthesizer generates.
fn check_collisions(device: &Device, synthesis: &Synthesis) -> Result<(), EsiError> {
    match synthesis
        .objects
        .iter()
        .find(|m| device.object(m.index).is_some())
    {
        Some(taken) => Err(EsiError::DuplicateIndex { index: taken.index }),
        None => Ok(()),
    }
}

/// (type, name) of the selected group, or the `(null)` placeholder.
fn resolve_group<'a>(groups: &'a [Group], selected: &str) -> (&'a str, &'a str) {
    match groups.iter().find(|g| g.group_type == selected) {
        Some(group) => (&group.group_type, &group.name),
        None => {
            warn!("Group '{}' not found; writing placeholder group", selected);
            (NULL_GROUP, NULL_GROUP)
        }
    }
}

impl Setup {
    /// Compiles the device called `device_name` against this setup's vendor
    /// and group catalogue.
    pub fn compile_device(
        &mut self,
        device_name: &str,
        selected_group: &str,
    ) -> Result<Vec<u8>, EsiError> {
        let device = self
            .devices
            .iter_mut()
            .find(|d| d.name == device_name)
            .ok_or_else(|| EsiError::DeviceNotFound(device_name.to_string()))?;
        compile(device, &self.vendor, &self.groups, selected_group)
    }
}
