//! Element Types Carried in Frames

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unrecognized element type name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown element type: {0}")]
pub struct UnknownElementType(pub String);

/// Numeric sample type of the stream.
///
/// Complex variants are interleaved real/imaginary pairs, so one element is
/// two components wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    U8,
    I8,
    I16,
    I32,
    I64,
    #[default]
    F32,
    F64,
    Ci8,
    Ci16,
    Ci32,
    Ci64,
    Cf32,
    Cf64,
}

impl ElementType {
    /// All supported element types
    pub const ALL: [ElementType; 13] = [
        ElementType::U8,
        ElementType::I8,
        ElementType::I16,
        ElementType::I32,
        ElementType::I64,
        ElementType::F32,
        ElementType::F64,
        ElementType::Ci8,
        ElementType::Ci16,
        ElementType::Ci32,
        ElementType::Ci64,
        ElementType::Cf32,
        ElementType::Cf64,
    ];

    /// Lowercase name used in configuration
    pub fn name(self) -> &'static str {
        match self {
            ElementType::U8 => "u8",
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            ElementType::Ci8 => "ci8",
            ElementType::Ci16 => "ci16",
            ElementType::Ci32 => "ci32",
            ElementType::Ci64 => "ci64",
            ElementType::Cf32 => "cf32",
            ElementType::Cf64 => "cf64",
        }
    }

    /// Whether elements are interleaved complex pairs
    pub fn is_complex(self) -> bool {
        matches!(
            self,
            ElementType::Ci8
                | ElementType::Ci16
                | ElementType::Ci32
                | ElementType::Ci64
                | ElementType::Cf32
                | ElementType::Cf64
        )
    }

    /// Bytes per scalar component
    pub fn component_width(self) -> usize {
        match self {
            ElementType::U8 | ElementType::I8 | ElementType::Ci8 => 1,
            ElementType::I16 | ElementType::Ci16 => 2,
            ElementType::I32 | ElementType::F32 | ElementType::Ci32 | ElementType::Cf32 => 4,
            ElementType::I64 | ElementType::F64 | ElementType::Ci64 | ElementType::Cf64 => 8,
        }
    }

    /// Bytes per element
    pub fn element_width(self) -> usize {
        if self.is_complex() {
            2 * self.component_width()
        } else {
            self.component_width()
        }
    }

    /// Decode native-endian samples into `f32`, appending to `out`.
    ///
    /// Complex types yield interleaved re/im values. A trailing incomplete
    /// component is ignored.
    pub fn decode_f32(self, raw: &[u8], out: &mut Vec<f32>) {
        let width = self.component_width();
        out.reserve(raw.len() / width);
        let components = raw.chunks_exact(width);
        match self {
            ElementType::U8 => out.extend(raw.iter().map(|&b| b as f32)),
            ElementType::I8 | ElementType::Ci8 => out.extend(raw.iter().map(|&b| b as i8 as f32)),
            ElementType::I16 | ElementType::Ci16 => {
                out.extend(components.map(|c| i16::from_ne_bytes(array(c)) as f32))
            }
            ElementType::I32 | ElementType::Ci32 => {
                out.extend(components.map(|c| i32::from_ne_bytes(array(c)) as f32))
            }
            ElementType::I64 | ElementType::Ci64 => {
                out.extend(components.map(|c| i64::from_ne_bytes(array(c)) as f32))
            }
            ElementType::F32 | ElementType::Cf32 => {
                out.extend(components.map(|c| f32::from_ne_bytes(array(c))))
            }
            ElementType::F64 | ElementType::Cf64 => {
                out.extend(components.map(|c| f64::from_ne_bytes(array(c)) as f32))
            }
        }
    }
}

fn array<const N: usize>(component: &[u8]) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(component);
    bytes
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = UnknownElementType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ElementType::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| UnknownElementType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(ElementType::U8.element_width(), 1);
        assert_eq!(ElementType::F32.element_width(), 4);
        assert_eq!(ElementType::F64.element_width(), 8);
        assert_eq!(ElementType::Ci16.element_width(), 4);
        assert_eq!(ElementType::Cf64.element_width(), 16);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("F32".parse::<ElementType>().unwrap(), ElementType::F32);
        assert_eq!(" cf32 ".parse::<ElementType>().unwrap(), ElementType::Cf32);
        assert!("f16".parse::<ElementType>().is_err());
        for t in ElementType::ALL {
            assert_eq!(t.to_string().parse::<ElementType>().unwrap(), t);
        }
    }

    #[test]
    fn test_decode_real() {
        let raw: Vec<u8> = [1.5f32, -2.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let mut out = Vec::new();
        ElementType::F32.decode_f32(&raw, &mut out);
        assert_eq!(out, vec![1.5, -2.0]);

        out.clear();
        ElementType::I8.decode_f32(&[0xFF, 0x02], &mut out);
        assert_eq!(out, vec![-1.0, 2.0]);
    }

    #[test]
    fn test_decode_complex_interleaves() {
        let raw: Vec<u8> = [3i16, -4].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let mut out = Vec::new();
        ElementType::Ci16.decode_f32(&raw, &mut out);
        assert_eq!(out, vec![3.0, -4.0]);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut raw = 7.0f64.to_ne_bytes().to_vec();
        raw.extend_from_slice(&[1, 2, 3]);
        let mut out = Vec::new();
        ElementType::F64.decode_f32(&raw, &mut out);
        assert_eq!(out, vec![7.0]);
    }
}
