//! Fixed-width, validated identifiers.
//!
//! Names are specified as fixed-width zero-padded decimal fields, validated
//! on ingest; there is no arithmetic performed on the name strings
//! themselves once parsed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The 6-character name of a tenant file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileName(String);

impl FileName {
    pub const WIDTH: usize = 6;

    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.len() != Self::WIDTH || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::invalid_argument(format!(
                "file name {name:?} must be exactly {} ASCII alphanumeric characters",
                Self::WIDTH
            )));
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stripe sequence number, zero-padded to 4 digits (`0000`..=`9999`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StripeSeq(u16);

impl StripeSeq {
    pub const WIDTH: usize = 4;
    pub const MAX: u16 = 9999;

    pub fn new(seq: u16) -> Result<Self> {
        if seq > Self::MAX {
            return Err(Error::invalid_argument(format!(
                "stripe sequence {seq} exceeds {}-digit width",
                Self::WIDTH
            )));
        }
        Ok(Self(seq))
    }

    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for StripeSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = Self::WIDTH)
    }
}

/// A block sequence number within a stripe, zero-padded to 2 digits (`00`..=`99`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockSeq(u8);

impl BlockSeq {
    pub const WIDTH: usize = 2;
    pub const MAX: u8 = 99;

    pub fn new(seq: u8) -> Result<Self> {
        if seq > Self::MAX {
            return Err(Error::invalid_argument(format!(
                "block sequence {seq} exceeds {}-digit width",
                Self::WIDTH
            )));
        }
        Ok(Self(seq))
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for BlockSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = Self::WIDTH)
    }
}

/// Stripe identifier: `<FileName>-<StripeSeq4>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StripeId {
    pub file: FileName,
    pub seq: StripeSeq,
}

impl StripeId {
    #[must_use]
    pub const fn new(file: FileName, seq: StripeSeq) -> Self {
        Self { file, seq }
    }

    pub fn block(&self, index: BlockSeq) -> BlockId {
        BlockId::new(self.clone(), index)
    }
}

impl fmt::Display for StripeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.file, self.seq)
    }
}

impl std::str::FromStr for StripeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (file, seq) = s
            .split_once('-')
            .ok_or_else(|| Error::invalid_argument(format!("malformed stripe id {s:?}")))?;
        let seq: u16 = seq
            .parse()
            .map_err(|_| Error::invalid_argument(format!("malformed stripe sequence in {s:?}")))?;
        Ok(Self::new(FileName::new(file)?, StripeSeq::new(seq)?))
    }
}

/// Block identifier: `<FileName>-<StripeSeq4>-<BlockSeq2>`, exactly 14 characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId {
    pub stripe: StripeId,
    pub index: BlockSeq,
}

impl BlockId {
    pub const WIDTH: usize = FileName::WIDTH + 1 + StripeSeq::WIDTH + 1 + BlockSeq::WIDTH;

    #[must_use]
    pub const fn new(stripe: StripeId, index: BlockSeq) -> Self {
        Self { stripe, index }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.stripe, self.index)
    }
}

impl std::str::FromStr for BlockId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != Self::WIDTH {
            return Err(Error::invalid_argument(format!(
                "block id {s:?} must be exactly {} characters",
                Self::WIDTH
            )));
        }
        let (stripe, index) = s
            .rsplit_once('-')
            .ok_or_else(|| Error::invalid_argument(format!("malformed block id {s:?}")))?;
        let index: u8 = index
            .parse()
            .map_err(|_| Error::invalid_argument(format!("malformed block index in {s:?}")))?;
        Ok(Self::new(stripe.parse()?, BlockSeq::new(index)?))
    }
}

/// A data node address, modeled as four octets rather than a raw string so
/// the 15-character fixed-width wire encoding (`%03d.%03d.%03d.%03d`) is a
/// property of the type, not of ad-hoc formatting at call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 4]);

impl NodeId {
    /// Width of the fixed encoding used on the wire (§4.1: "IPs are emitted
    /// as 15-character fixed-width dotted strings").
    pub const WIRE_WIDTH: usize = 15;

    #[must_use]
    pub const fn new(octets: [u8; 4]) -> Self {
        Self(octets)
    }

    /// Encode as the fixed 15-character dotted string used on the wire.
    #[must_use]
    pub fn encode_fixed(&self) -> String {
        format!(
            "{:03}.{:03}.{:03}.{:03}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }

    /// Decode a 15-character fixed-width dotted string produced by
    /// [`Self::encode_fixed`].
    pub fn decode_fixed(s: &str) -> Result<Self> {
        if s.len() != Self::WIRE_WIDTH {
            return Err(Error::ProtocolViolation(format!(
                "node address {s:?} must be exactly {} characters",
                Self::WIRE_WIDTH
            )));
        }
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return Err(Error::ProtocolViolation(format!(
                "node address {s:?} must have four dotted octets"
            )));
        }
        let mut octets = [0u8; 4];
        for (i, part) in parts.iter().enumerate() {
            octets[i] = part
                .parse()
                .map_err(|_| Error::ProtocolViolation(format!("bad octet {part:?} in {s:?}")))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_requires_six_chars() {
        assert!(FileName::new("abcdef").is_ok());
        assert!(FileName::new("abcde").is_err());
        assert!(FileName::new("abcdefg").is_err());
    }

    #[test]
    fn stripe_id_round_trips() {
        let id = StripeId::new(FileName::new("abcdef").unwrap(), StripeSeq::new(7).unwrap());
        assert_eq!(id.to_string(), "abcdef-0007");
        assert_eq!(id.to_string().parse::<StripeId>().unwrap(), id);
    }

    #[test]
    fn block_id_is_fourteen_chars_and_round_trips() {
        let stripe = StripeId::new(FileName::new("abcdef").unwrap(), StripeSeq::new(7).unwrap());
        let block = BlockId::new(stripe, BlockSeq::new(3).unwrap());
        let encoded = block.to_string();
        assert_eq!(encoded.len(), BlockId::WIDTH);
        assert_eq!(encoded, "abcdef-0007-03");
        assert_eq!(encoded.parse::<BlockId>().unwrap(), block);
    }

    #[test]
    fn node_id_fixed_width_round_trips() {
        let node = NodeId::new([192, 168, 1, 10]);
        let encoded = node.encode_fixed();
        assert_eq!(encoded.len(), NodeId::WIRE_WIDTH);
        assert_eq!(encoded, "192.168.001.010");
        assert_eq!(NodeId::decode_fixed(&encoded).unwrap(), node);
    }
}
