// crates/ethercat-esi/src/builder/dictionary.rs

//! Emits `<Dictionary>`: the derived `<DataTypes>` and the `<Objects>`.

use crate::deriver::{DataType, SubItemLayout, type_reference};
use crate::error::EsiError;
use crate::primitives;
use crate::sink::XmlSink;
use crate::types::{Access, Object, ObjectBody, PdoDirection, Restriction, SubItem};
use crate::utils::{ascii_hex, byte_width, format_esi_hex, normalize_hex_data, parse_number, zero_fill};
use log::warn;

/// Writes `<Dictionary>` with all `types` and the objects in emission order.
pub(super) fn write_dictionary<'a, S: XmlSink>(
    sink: &mut S,
    types: &[DataType],
    objects: impl IntoIterator<Item = &'a Object>,
) -> Result<(), EsiError> {
    sink.open_element("Dictionary")?;

    sink.open_element("DataTypes")?;
    for data_type in types {
        write_data_type(sink, data_type)?;
    }
    sink.close_element()?;

    sink.open_element("Objects")?;
    for object in objects {
        write_object(sink, object, types)?;
    }
    sink.close_element()?;

    sink.close_element()
}

fn write_data_type<S: XmlSink>(sink: &mut S, data_type: &DataType) -> Result<(), EsiError> {
    sink.open_element("DataType")?;
    sink.text_element("Name", &data_type.name)?;
    if let Some(base) = &data_type.base_type {
        sink.text_element("BaseType", base)?;
    }
    sink.text_element("BitSize", &data_type.bit_size.to_string())?;
    if let Some(info) = data_type.array_info {
        sink.open_element("ArrayInfo")?;
        sink.text_element("LBound", &info.lower_bound.to_string())?;
        sink.text_element("Elements", &info.elements.to_string())?;
        sink.close_element()?;
    }
    for layout in &data_type.sub_items {
        write_layout(sink, layout)?;
    }
    sink.close_element()
}

fn write_layout<S: XmlSink>(sink: &mut S, layout: &SubItemLayout) -> Result<(), EsiError> {
    sink.open_element("SubItem")?;
    if let Some(sub_index) = layout.sub_index {
        sink.text_element("SubIdx", &sub_index.to_string())?;
    }
    sink.text_element("Name", &layout.name)?;
    sink.text_element("Type", &layout.type_name)?;
    sink.text_element("BitSize", &layout.bit_size.to_string())?;
    sink.text_element("BitOffs", &layout.bit_offset.to_string())?;
    write_flags(
        sink,
        layout.access,
        layout.read_restrictions,
        layout.write_restrictions,
        layout.pdo,
    )?;
    sink.close_element()
}

fn write_flags<S: XmlSink>(
    sink: &mut S,
    access: Access,
    read: Option<Restriction>,
    write: Option<Restriction>,
    pdo: Option<PdoDirection>,
) -> Result<(), EsiError> {
    sink.open_element("Flags")?;
    sink.open_element("Access")?;
    if let Some(r) = read {
        sink.attribute("ReadRestrictions", r.as_str())?;
    }
    if let Some(w) = write {
        sink.attribute("WriteRestrictions", w.as_str())?;
    }
    sink.text(access.as_str())?;
    sink.close_element()?;
    if let Some(direction) = pdo {
        sink.text_element("PdoMapping", direction.flag())?;
    }
    sink.close_element()
}

fn write_object<S: XmlSink>(
    sink: &mut S,
    object: &Object,
    types: &[DataType],
) -> Result<(), EsiError> {
    sink.open_element("Object")?;
    sink.text_element("Index", &format_esi_hex(object.index))?;
    sink.text_element("Name", object.display_name())?;

    match type_reference(object) {
        Some(type_name) => {
            sink.text_element("Type", &type_name)?;
            match types.iter().find(|t| t.name == type_name) {
                Some(dt) => sink.text_element("BitSize", &dt.bit_size.to_string())?,
                None => warn!(
                    "Object 0x{:04X}: type {} was not derived; BitSize omitted",
                    object.index, type_name
                ),
            }
        }
        None => warn!(
            "Object 0x{:04X} has no data type; Type omitted",
            object.index
        ),
    }

    match &object.body {
        ObjectBody::Variable(item) => {
            if let Some(data) = variable_default(item) {
                sink.open_element("Info")?;
                sink.text_element("DefaultData", &data)?;
                sink.close_element()?;
            }
            write_flags(
                sink,
                item.access,
                item.read_restrictions,
                item.write_restrictions,
                item.pdo,
            )?;
        }
        ObjectBody::Record(items) | ObjectBody::Array(items) => {
            let is_array = matches!(object.body, ObjectBody::Array(_));
            sink.open_element("Info")?;
            for item in items {
                sink.open_element("SubItem")?;
                // Sub-index 0 carries the object name, so its entry gets the positional name.
                if item.sub_index == 0 || is_array {
                    sink.text_element("Name", &positional_name(item.sub_index))?;
                } else {
                    sink.text_element("Name", &item.name)?;
                }
                sink.open_element("Info")?;
                sink.text_element("DefaultData", &composite_default(object.index, item))?;
                sink.close_element()?;
                sink.close_element()?;
            }
            sink.close_element()?;
            let access = items.first().map(|s| s.access).unwrap_or_default();
            write_flags(sink, access, None, None, None)?;
        }
    }

    sink.close_element()
}

/// Bit width of a scalar sub-item, 0 if its type is unknown.
fn scalar_bits(item: &SubItem) -> u32 {
    item.data_type
        .as_deref()
        .and_then(primitives::bit_size)
        .unwrap_or(0)
}

/// `<DefaultData>` of a VARIABLE; `None` when there is no default.
fn variable_default(item: &SubItem) -> Option<String> {
    let value = item.default_value()?;
    if item.is_string() {
        Some(ascii_hex(value))
    } else {
        Some(normalize_hex_data(value, byte_width(scalar_bits(item))))
    }
}

/// `SubIndex 003`
fn positional_name(sub_index: u8) -> String {
    format!("SubIndex {:03}", sub_index)
}

/// `<DefaultData>` of a RECORD/ARRAY sub-item, zero-filled when absent.
fn composite_default(index: u16, item: &SubItem) -> String {
    if item.sub_index == 0 {
        return match item.default_value().map(|v| (v, parse_number(v))) {
            Some((_, Some(count))) => {
                let count = u8::try_from(count).unwrap_or_else(|_| {
                    warn!(
                        "Object 0x{:04X}: sub-index 0 value {} exceeds 255; clamped",
                        index, count
                    );
                    u8::MAX
                });
                format!("{:02X}", count)
            }
            Some((raw, None)) => {
                warn!(
                    "Object 0x{:04X}: unreadable sub-index 0 value '{}'; using 0",
                    index, raw
                );
                zero_fill(1)
            }
            None => zero_fill(1),
        };
    }
    match (item.is_string(), item.default_value()) {
        (true, Some(text)) => ascii_hex(text),
        (_, Some(value)) => normalize_hex_data(value, byte_width(scalar_bits(item))),
        (_, None) => zero_fill(byte_width(scalar_bits(item))),
    }
}
