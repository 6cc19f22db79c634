use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A valid lowercase hexadecimal encoding of binary data.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Hex(String);

/// Why a string could not be decoded as hex.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum HexError {
    OddLength(usize),
    BadDigit(char),
}

impl Display for HexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HexError::OddLength(n) => write!(f, "odd number of hex digits ({})", n),
            HexError::BadDigit(c) => write!(f, "non-hex character {:?}", c),
        }
    }
}

impl Serialize for Hex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Hex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Hex::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Hex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'a> From<&'a [u8]> for Hex {
    fn from(bytes: &[u8]) -> Self {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";

        let mut out = String::with_capacity(bytes.len() * 2);
        for &b in bytes {
            out.push(DIGITS[(b >> 4) as usize] as char);
            out.push(DIGITS[(b & 0x0f) as usize] as char);
        }
        Hex(out)
    }
}

impl Hex {
    /// Checks that `s` is an even-length run of hex digits. Uppercase
    /// digits are accepted and folded to lowercase.
    pub fn parse(s: &str) -> Result<Self, HexError> {
        if s.len() % 2 != 0 {
            return Err(HexError::OddLength(s.len()));
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(HexError::BadDigit(c));
        }
        Ok(Hex(s.to_ascii_lowercase()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        fn unhex_digit(h: u8) -> u8 {
            match h {
                b'0'..=b'9' => h - b'0',
                // parse() only lets lowercase digits through
                _ => h - b'a' + 10,
            }
        }

        self.0
            .as_bytes()
            .chunks_exact(2)
            .map(|pair| (unhex_digit(pair[0]) << 4) | unhex_digit(pair[1]))
            .collect()
    }
}

#[test]
fn test_hex_round_trip() {
    let example: &[u8] = b"hello, world";
    let hex: Hex = Hex::from(example);
    let bytes: Vec<u8> = hex.to_bytes();
    let bytes_ref: &[u8] = &bytes;
    assert_eq!(example, bytes_ref);
}

#[test]
fn test_hex_deserialize() {
    let example: &[u8] = b"hello, world";
    let hex: Hex = Hex::from(example);
    let json = serde_json::to_vec(&hex).unwrap();
    let hex_: Hex = serde_json::from_slice(&json).unwrap();
    assert_eq!(hex, hex_);
}

#[test]
fn test_hex_parse_rejects() {
    assert_eq!(Hex::parse("abc"), Err(HexError::OddLength(3)));
    assert_eq!(Hex::parse("zz"), Err(HexError::BadDigit('z')));
    assert!(serde_json::from_str::<Hex>("\"xy\"").is_err());
}

#[test]
fn test_hex_parse_folds_case() {
    let hex = Hex::parse("DEADbeef").unwrap();
    assert_eq!(hex.to_string(), "deadbeef");
    assert_eq!(hex.to_bytes(), vec![0xde, 0xad, 0xbe, 0xef]);
}
