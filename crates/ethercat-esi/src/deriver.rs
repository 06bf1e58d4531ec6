// crates/ethercat-esi/src/deriver.rs

//! Derives the `<DataTypes>` of a dictionary from its objects.
//!
//! Every RECORD gets one composite type, every ARRAY gets an outer type plus
//! an element-array type, string defaults get a fixed-length `STRING(n)` type,
//! and every primitive that is actually referenced is listed once. Composite
//! layouts are 16-bit aligned after sub-index 0 and at the end of the type.

use crate::primitives;
use crate::types::{Access, Object, ObjectBody, PdoDirection, Restriction, SubItem};
use crate::utils::{align16, parse_number};
use log::{debug, warn};
use std::collections::BTreeSet;

/// Element type assumed for an ARRAY without any typed element.
const FALLBACK_ELEMENT_TYPE: &str = "USINT";

/// Sub-indices are 8 bit, so an ARRAY holds at most 255 elements.
const MAX_ARRAY_ELEMENTS: u64 = u8::MAX as u64;

/// Layout of one sub-item inside a composite type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubItemLayout {
    /// `None` for the "Elements" reference of an ARRAY type.
    pub sub_index: Option<u8>,
    pub name: String,
    pub type_name: String,
    pub bit_size: u32,
    pub bit_offset: u32,
    pub access: Access,
    pub read_restrictions: Option<Restriction>,
    pub write_restrictions: Option<Restriction>,
    pub pdo: Option<PdoDirection>,
}

/// `<ArrayInfo>` of an element-array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayInfo {
    pub lower_bound: u32,
    pub elements: u32,
}

/// A derived `<DataType>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataType {
    pub name: String,
    pub bit_size: u32,
    pub base_type: Option<String>,
    pub array_info: Option<ArrayInfo>,
    pub sub_items: Vec<SubItemLayout>,
}

impl DataType {
    fn scalar(name: impl Into<String>, bit_size: u32) -> Self {
        Self {
            name: name.into(),
            bit_size,
            base_type: None,
            array_info: None,
            sub_items: Vec::new(),
        }
    }

    /// Layout entry for `sub_index`, if the sub-item is part of this type.
    pub fn sub_item(&self, sub_index: u8) -> Option<&SubItemLayout> {
        self.sub_items
            .iter()
            .find(|s| s.sub_index == Some(sub_index))
    }
}

/// Name of the composite type of the object at `index` (`DT1018`).
pub fn composite_name(index: u16) -> String {
    format!("DT{:04X}", index)
}

/// Name of the element-array type of the ARRAY at `index` (`DT1C12ARR`).
pub fn array_name(index: u16) -> String {
    format!("DT{:04X}ARR", index)
}

/// Name of the fixed-length string type holding `len` characters.
pub fn string_type_name(len: usize) -> String {
    format!("STRING({})", len)
}

/// Bit size of `STRING(len)`: `len*8 + (len*8) % 16`.
pub fn string_bit_size(len: usize) -> u32 {
    let bits = (len * 8) as u32;
    bits + bits % 16
}

/// Canonical spelling of a declared data type: the table name for known
/// primitives, the trimmed declaration otherwise.
pub fn canonical_type(declared: &str) -> String {
    primitives::lookup(declared)
        .map(|p| p.name.to_string())
        .unwrap_or_else(|| declared.trim().to_string())
}

/// The type an object's `<Type>` element refers to.
///
/// Returns `None` for a VARIABLE without a declared data type.
pub fn type_reference(object: &Object) -> Option<String> {
    match &object.body {
        ObjectBody::Variable(item) => match (item.is_string(), item.default_value()) {
            (true, Some(text)) => Some(string_type_name(text.len())),
            _ => item.data_type.as_deref().map(canonical_type),
        },
        ObjectBody::Record(_) | ObjectBody::Array(_) => Some(composite_name(object.index)),
    }
}

/// Accumulates the data types of one compilation run.
///
/// A fresh deriver is created per run; nothing survives between runs.
#[derive(Debug, Default)]
pub struct TypeDeriver {
    types: Vec<DataType>,
    names: BTreeSet<String>,
}

impl TypeDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the string type able to hold `literal` and returns its name.
    /// Deduplicated by name over the whole run.
    pub fn string_type(&mut self, literal: &str) -> String {
        let name = string_type_name(literal.len());
        if self.names.insert(name.clone()) {
            self.types
                .push(DataType::scalar(name.clone(), string_bit_size(literal.len())));
        }
        name
    }

    /// Derives the types of all `objects`, in order.
    pub fn derive(&mut self, objects: &[Object]) {
        for object in objects {
            self.derive_object(object);
        }
    }

    /// Derives the types of a single object.
    pub fn derive_object(&mut self, object: &Object) {
        match &object.body {
            ObjectBody::Variable(item) => self.derive_variable(object.index, item),
            ObjectBody::Record(items) => self.derive_record(object.index, items),
            ObjectBody::Array(items) => self.derive_array(object.index, items),
        }
    }

    /// Consumes the deriver, returning the types in derivation order.
    pub fn finish(self) -> Vec<DataType> {
        debug!("Derived {} data types", self.types.len());
        self.types
    }

    /// Looks up a primitive and lists it on first use.
    fn primitive(&mut self, declared: &str) -> Option<(String, u32)> {
        let primitive = primitives::lookup(declared)?;
        if self.names.insert(primitive.name.to_string()) {
            self.types
                .push(DataType::scalar(primitive.name, primitive.bit_size));
        }
        Some((primitive.name.to_string(), primitive.bit_size))
    }

    fn push_composite(&mut self, data_type: DataType) {
        if self.names.insert(data_type.name.clone()) {
            self.types.push(data_type);
        } else {
            warn!("Data type {} derived twice; keeping the first", data_type.name);
        }
    }

    fn derive_variable(&mut self, index: u16, item: &SubItem) {
        let Some(declared) = item.data_type.as_deref() else {
            warn!("Object 0x{:04X} has no data type", index);
            return;
        };
        match (item.is_string(), item.default_value()) {
            (true, Some(text)) => {
                self.string_type(text);
            }
            _ => {
                if self.primitive(declared).is_none() {
                    warn!("Object 0x{:04X}: unknown data type '{}'", index, declared);
                }
            }
        }
    }

    fn derive_record(&mut self, index: u16, items: &[SubItem]) {
        let mut offset = 0;
        let mut layouts = Vec::with_capacity(items.len());

        for (position, item) in items.iter().enumerate() {
            match item.data_type.as_deref() {
                None => warn!(
                    "Object 0x{:04X} sub-index {}: no data type, skipped",
                    index, item.sub_index
                ),
                Some(_) if item.is_string() && item.default_value().is_some() => {
                    self.string_type(item.default_value().unwrap_or_default());
                }
                Some(declared) => {
                    let (type_name, bit_size) = self.primitive(declared).unwrap_or_else(|| {
                        warn!(
                            "Object 0x{:04X} sub-index {}: unknown data type '{}'",
                            index, item.sub_index, declared
                        );
                        (declared.trim().to_string(), 0)
                    });
                    layouts.push(layout(item, type_name, bit_size, offset));
                    offset += bit_size;
                }
            }
            if position == 0 {
                offset = align16(offset);
            }
        }

        self.push_composite(DataType {
            name: composite_name(index),
            bit_size: align16(offset),
            base_type: None,
            array_info: None,
            sub_items: layouts,
        });
    }

    fn derive_array(&mut self, index: u16, items: &[SubItem]) {
        let (count_item, elements) = match items.split_first() {
            Some(split) => split,
            None => return,
        };

        let element = elements.iter().find(|e| e.data_type.is_some());
        let declared = match element.and_then(|e| e.data_type.as_deref()) {
            Some(declared) => declared,
            None => {
                warn!(
                    "ARRAY 0x{:04X} has no typed element; assuming {}",
                    index, FALLBACK_ELEMENT_TYPE
                );
                FALLBACK_ELEMENT_TYPE
            }
        };
        let (element_type, element_bits) = self.primitive(declared).unwrap_or_else(|| {
            warn!("ARRAY 0x{:04X}: unknown element type '{}'", index, declared);
            (declared.trim().to_string(), 0)
        });

        let listed = u32::try_from(elements.len()).unwrap_or(u32::MAX);
        let count = match count_item.default_value().and_then(parse_number) {
            Some(count) if count <= MAX_ARRAY_ELEMENTS => count as u32,
            Some(count) => {
                warn!(
                    "ARRAY 0x{:04X}: element count {} exceeds {}; using {} listed elements",
                    index,
                    count,
                    MAX_ARRAY_ELEMENTS,
                    elements.len()
                );
                listed
            }
            None => {
                warn!(
                    "ARRAY 0x{:04X}: unreadable element count {:?}; using {} listed elements",
                    index,
                    count_item.default_data,
                    elements.len()
                );
                listed
            }
        };

        // Sub-index 0 of the outer type is always USINT.
        let (count_type, count_bits) = self
            .primitive(FALLBACK_ELEMENT_TYPE)
            .unwrap_or_else(|| (FALLBACK_ELEMENT_TYPE.to_string(), 8));

        let Some((array_bits, outer_bits)) = element_bits
            .checked_mul(count)
            .and_then(|bits| Some((bits, bits.checked_add(16)?)))
        else {
            warn!(
                "ARRAY 0x{:04X}: {} elements of {} bits do not fit a bit size; type skipped",
                index, count, element_bits
            );
            return;
        };
        let inner = DataType {
            name: array_name(index),
            bit_size: array_bits,
            base_type: Some(element_type),
            array_info: Some(ArrayInfo {
                lower_bound: 1,
                elements: count,
            }),
            sub_items: Vec::new(),
        };

        let mut count_layout = layout(count_item, count_type, count_bits, 0);
        count_layout.access = Access::ReadOnly;
        let elements_layout = SubItemLayout {
            sub_index: None,
            name: "Elements".into(),
            type_name: inner.name.clone(),
            bit_size: array_bits,
            bit_offset: 16,
            access: element.map(|e| e.access).unwrap_or_default(),
            read_restrictions: element.and_then(|e| e.read_restrictions),
            write_restrictions: element.and_then(|e| e.write_restrictions),
            pdo: None,
        };
        let outer = DataType {
            name: composite_name(index),
            bit_size: outer_bits,
            base_type: None,
            array_info: None,
            sub_items: vec![count_layout, elements_layout],
        };

        self.push_composite(inner);
        self.push_composite(outer);
    }
}

fn layout(item: &SubItem, type_name: String, bit_size: u32, bit_offset: u32) -> SubItemLayout {
    SubItemLayout {
        sub_index: Some(item.sub_index),
        name: item.name.clone(),
        type_name,
        bit_size,
        bit_offset,
        access: item.access,
        read_restrictions: item.read_restrictions,
        write_restrictions: item.write_restrictions,
        pdo: item.pdo,
    }
}

/// Derives the data types of `objects` in one fresh run.
pub fn derive_data_types(objects: &[Object]) -> Vec<DataType> {
    let mut deriver = TypeDeriver::new();
    deriver.derive(objects);
    deriver.finish()
}
