// crates/ethercat-esi/src/primitives.rs

//! Static table of the scalar data types known to the dictionary.

/// A scalar type with its size and CoE data type code (ETG.1000.6, Table 64).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    pub name: &'static str,
    pub bit_size: u32,
    pub coe_code: u16,
}

const PRIMITIVES: &[Primitive] = &[
    Primitive { name: "BOOL", bit_size: 1, coe_code: 0x0001 },
    Primitive { name: "SINT", bit_size: 8, coe_code: 0x0002 },
    Primitive { name: "INT", bit_size: 16, coe_code: 0x0003 },
    Primitive { name: "DINT", bit_size: 32, coe_code: 0x0004 },
    Primitive { name: "USINT", bit_size: 8, coe_code: 0x0005 },
    Primitive { name: "UINT", bit_size: 16, coe_code: 0x0006 },
    Primitive { name: "UDINT", bit_size: 32, coe_code: 0x0007 },
    Primitive { name: "REAL", bit_size: 32, coe_code: 0x0008 },
    Primitive { name: "LREAL", bit_size: 64, coe_code: 0x0011 },
    Primitive { name: "LINT", bit_size: 64, coe_code: 0x0015 },
    Primitive { name: "ULINT", bit_size: 64, coe_code: 0x001B },
    Primitive { name: "BYTE", bit_size: 8, coe_code: 0x001E },
    Primitive { name: "WORD", bit_size: 16, coe_code: 0x001F },
    Primitive { name: "DWORD", bit_size: 32, coe_code: 0x0020 },
];

/// Looks up a primitive by name, ignoring ASCII case.
pub fn lookup(name: &str) -> Option<&'static Primitive> {
    let name = name.trim();
    PRIMITIVES.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Bit size of a primitive, or `None` if the name is unknown.
pub fn bit_size(name: &str) -> Option<u32> {
    lookup(name).map(|p| p.bit_size)
}
