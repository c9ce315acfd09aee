//! Node → coordinator ack grammar (§4.1).

use std::fmt;

/// An ack received from a data node or the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AckVerb {
    WriteBlkSuccess,
    BlkEx,
    BlkMi,
    FiDeco,
    FiUpco,
    FiDoco,
    /// Anything that does not match a known literal. The coordinator never
    /// panics on an unrecognized ack; it treats it as a protocol violation
    /// for the stripe.
    Error(String),
}

impl AckVerb {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "write blk success" => Self::WriteBlkSuccess,
            "blk_ex" => Self::BlkEx,
            "blk_mi" => Self::BlkMi,
            "fi_deco" => Self::FiDeco,
            "fi_upco" => Self::FiUpco,
            "fi_doco" => Self::FiDoco,
            other => Self::Error(other.to_string()),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(
            self,
            Self::WriteBlkSuccess | Self::FiDeco | Self::FiUpco | Self::FiDoco
        )
    }
}

impl fmt::Display for AckVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteBlkSuccess => f.write_str("write blk success"),
            Self::BlkEx => f.write_str("blk_ex"),
            Self::BlkMi => f.write_str("blk_mi"),
            Self::FiDeco => f.write_str("fi_deco"),
            Self::FiUpco => f.write_str("fi_upco"),
            Self::FiDoco => f.write_str("fi_doco"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_literals_parse() {
        assert_eq!(AckVerb::parse("write blk success"), AckVerb::WriteBlkSuccess);
        assert_eq!(AckVerb::parse("blk_mi"), AckVerb::BlkMi);
        assert_eq!(AckVerb::parse("fi_upco"), AckVerb::FiUpco);
    }

    #[test]
    fn unknown_ack_becomes_error_not_a_panic() {
        assert_eq!(
            AckVerb::parse("garbage"),
            AckVerb::Error("garbage".to_string())
        );
    }

    #[test]
    fn success_classification() {
        assert!(AckVerb::WriteBlkSuccess.is_success());
        assert!(!AckVerb::BlkMi.is_success());
    }
}
