//! Cross-language comparator test vectors.
//!
//! These vectors pin the baseline order so every binding of the bridge can
//! check its comparators against the same file.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;

/// One comparison with its expected result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparatorVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// First operand (hex-encoded).
    #[serde(deserialize_with = "hex_field")]
    pub a_hex: String,
    /// Second operand (hex-encoded).
    #[serde(deserialize_with = "hex_field")]
    pub b_hex: String,
    /// Expected sign: -1, 0 or 1.
    pub expected: i8,
}

impl ComparatorVector {
    fn new(id: &str, description: &str, a: &[u8], b: &[u8], expected: i8) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            a_hex: hex_encode(a),
            b_hex: hex_encode(b),
            expected,
        }
    }

    /// Decoded first operand. Panics if `a_hex` was set to malformed hex
    /// after loading.
    pub fn a(&self) -> Vec<u8> {
        hex_decode(&self.a_hex).expect("operand hex is validated on load")
    }

    /// Decoded second operand. Panics if `b_hex` was set to malformed hex
    /// after loading.
    pub fn b(&self) -> Vec<u8> {
        hex_decode(&self.b_hex).expect("operand hex is validated on load")
    }

    /// The expected result as an [`Ordering`].
    pub fn expected_ordering(&self) -> Ordering {
        self.expected.cmp(&0)
    }
}

/// Vectors for the baseline byte order.
pub fn baseline_vectors() -> Vec<ComparatorVector> {
    vec![
        ComparatorVector::new("empty_empty", "Two empty buffers", b"", b"", 0),
        ComparatorVector::new("empty_first", "Empty sorts first", b"", b"\x00", -1),
        ComparatorVector::new("prefix", "Proper prefix sorts first", b"ab", b"abc", -1),
        ComparatorVector::new(
            "first_byte",
            "First differing byte wins",
            &[0x02, 0x01],
            &[0x01, 0x02],
            1,
        ),
        ComparatorVector::new("equal", "Identical content", b"same", b"same", 0),
        ComparatorVector::new("unsigned", "Bytes compare unsigned", &[0x80], &[0x7f], 1),
        ComparatorVector::new("high_byte", "0xff after 0x00", &[0x00], &[0xff], -1),
        ComparatorVector::new("embedded_nul", "NUL is ordinary data", b"a\0b", b"a\0c", -1),
        ComparatorVector::new("trailing_nul", "Trailing NUL lengthens", b"a\0", b"a", 1),
        ComparatorVector::new(
            "length_after_content",
            "Content before length",
            b"b",
            b"aaaa",
            1,
        ),
    ]
}

/// All vectors as JSON for cross-language use.
pub fn all_vectors_json() -> String {
    let vectors = AllTestVectors {
        baseline: baseline_vectors(),
    };
    serde_json::to_string_pretty(&vectors).expect("Failed to serialize vectors")
}

/// Parses the `baseline` vectors from [`all_vectors_json`] output.
///
/// Malformed hex operands are a parse error.
pub fn vectors_from_json(json: &str) -> serde_json::Result<Vec<ComparatorVector>> {
    let all: AllTestVectors = serde_json::from_str(json)?;
    Ok(all.baseline)
}

#[derive(Debug, Serialize, Deserialize)]
struct AllTestVectors {
    baseline: Vec<ComparatorVector>,
}

/// Encodes bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decodes lowercase or uppercase hex. `None` on odd length or any
/// character that is not a hex digit.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let hi = char::from(pair[0]).to_digit(16)?;
            let lo = char::from(pair[1]).to_digit(16)?;
            u8::try_from((hi << 4) | lo).ok()
        })
        .collect()
}

fn hex_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let hex = String::deserialize(deserializer)?;
    match hex_decode(&hex) {
        Some(_) => Ok(hex),
        None => Err(D::Error::custom(format!("malformed hex operand {hex:?}"))),
    }
}
