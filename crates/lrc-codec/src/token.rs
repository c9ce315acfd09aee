//! Sub-tokens used inside compound (`de`/`up`/`do`/`ga`) verbs.

use std::str::FromStr;

use lrc_common::{BlockId, Error, NodeId, Result};

/// One sub-instruction inside a compound command program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `wa<N>blk<ip1><ip2>…<ipN>` — wait for `N` block payloads from those
    /// peers and XOR them.
    Wait { peers: Vec<NodeId> },
    /// `se<blkName><dstIp>` — after producing the local block (or received
    /// sum), send it to `dstIp`.
    Send { block: BlockId, dst: NodeId },
    /// `reco<blkName>` — produce-and-keep (use result as the re-written
    /// local parity).
    RecoInto { block: BlockId },
    /// `reco` alone at the end of a decode — produce-and-keep
    /// reconstruction of the missing block.
    Reco,
    /// `st` — sub-program separator ("stage").
    Stage,
    /// `castfi<blkName>` — store the result locally as a new block, flagged
    /// as a freshly computed fast-code local parity.
    CastFastLocalParity { block: BlockId },
}

impl Token {
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Wait { peers } => {
                let mut s = format!("wa{}blk", peers.len());
                for peer in peers {
                    s.push_str(&peer.encode_fixed());
                }
                s
            }
            Self::Send { block, dst } => format!("se{block}{}", dst.encode_fixed()),
            Self::RecoInto { block } => format!("reco{block}"),
            Self::Reco => "reco".to_string(),
            Self::Stage => "st".to_string(),
            Self::CastFastLocalParity { block } => format!("castfi{block}"),
        }
    }

    /// Parse one token from the front of `s`, returning the token and the
    /// remaining unparsed suffix.
    pub fn parse_one(s: &str) -> Result<(Self, &str)> {
        if let Some(rest) = s.strip_prefix("wa") {
            let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits_end == 0 {
                return Err(Error::ProtocolViolation(format!(
                    "malformed wait token, missing count: {s:?}"
                )));
            }
            let count: usize = rest[..digits_end]
                .parse()
                .map_err(|_| Error::ProtocolViolation(format!("bad wait count in {s:?}")))?;
            let rest = rest[digits_end..]
                .strip_prefix("blk")
                .ok_or_else(|| Error::ProtocolViolation(format!("expected 'blk' in {s:?}")))?;
            let needed = count * NodeId::WIRE_WIDTH;
            if rest.len() < needed {
                return Err(Error::ProtocolViolation(format!(
                    "truncated wait peer list in {s:?}"
                )));
            }
            let mut peers = Vec::with_capacity(count);
            for i in 0..count {
                let start = i * NodeId::WIRE_WIDTH;
                let chunk = &rest[start..start + NodeId::WIRE_WIDTH];
                peers.push(NodeId::decode_fixed(chunk)?);
            }
            Ok((Self::Wait { peers }, &rest[needed..]))
        } else if let Some(rest) = s.strip_prefix("se") {
            let (block, rest) = take_block(rest)?;
            let (dst, rest) = take_node(rest)?;
            Ok((Self::Send { block, dst }, rest))
        } else if let Some(rest) = s.strip_prefix("reco") {
            if rest.len() >= BlockId::WIDTH {
                let (block, rest) = take_block(rest)?;
                Ok((Self::RecoInto { block }, rest))
            } else {
                Ok((Self::Reco, rest))
            }
        } else if let Some(rest) = s.strip_prefix("castfi") {
            let (block, rest) = take_block(rest)?;
            Ok((Self::CastFastLocalParity { block }, rest))
        } else if let Some(rest) = s.strip_prefix("st") {
            Ok((Self::Stage, rest))
        } else {
            Err(Error::ProtocolViolation(format!(
                "unrecognized token at {s:?}"
            )))
        }
    }

    /// Parse every token in `s` until the input is exhausted.
    pub fn parse_all(mut s: &str) -> Result<Vec<Self>> {
        let mut tokens = Vec::new();
        while !s.is_empty() {
            let (token, rest) = Self::parse_one(s)?;
            tokens.push(token);
            s = rest;
        }
        Ok(tokens)
    }
}

fn take_block(s: &str) -> Result<(BlockId, &str)> {
    if s.len() < BlockId::WIDTH {
        return Err(Error::ProtocolViolation(format!(
            "truncated block name in {s:?}"
        )));
    }
    let (name, rest) = s.split_at(BlockId::WIDTH);
    Ok((BlockId::from_str(name)?, rest))
}

fn take_node(s: &str) -> Result<(NodeId, &str)> {
    if s.len() < NodeId::WIRE_WIDTH {
        return Err(Error::ProtocolViolation(format!(
            "truncated node address in {s:?}"
        )));
    }
    let (ip, rest) = s.split_at(NodeId::WIRE_WIDTH);
    Ok((NodeId::decode_fixed(ip)?, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrc_common::{BlockSeq, FileName, StripeId, StripeSeq};

    fn block(index: u8) -> BlockId {
        let stripe = StripeId::new(FileName::new("abcdef").unwrap(), StripeSeq::new(1).unwrap());
        BlockId::new(stripe, BlockSeq::new(index).unwrap())
    }

    fn node(n: u8) -> NodeId {
        NodeId::new([10, 0, 0, n])
    }

    #[test]
    fn wait_round_trips() {
        let token = Token::Wait {
            peers: vec![node(1), node(2)],
        };
        let encoded = token.encode();
        let (decoded, rest) = Token::parse_one(&encoded).unwrap();
        assert_eq!(decoded, token);
        assert!(rest.is_empty());
    }

    #[test]
    fn send_round_trips() {
        let token = Token::Send {
            block: block(3),
            dst: node(7),
        };
        let encoded = token.encode();
        let (decoded, rest) = Token::parse_one(&encoded).unwrap();
        assert_eq!(decoded, token);
        assert!(rest.is_empty());
    }

    #[test]
    fn bare_reco_is_distinguished_from_reco_into() {
        assert_eq!(Token::parse_one("reco").unwrap().0, Token::Reco);
        let into = Token::RecoInto { block: block(0) };
        let encoded = into.encode();
        assert_eq!(Token::parse_one(&encoded).unwrap().0, into);
    }

    #[test]
    fn parse_all_handles_a_chained_program() {
        let tokens = vec![
            Token::RecoInto { block: block(4) },
            Token::Wait {
                peers: vec![node(1)],
            },
        ];
        let encoded: String = tokens.iter().map(Token::encode).collect();
        assert_eq!(Token::parse_all(&encoded).unwrap(), tokens);
    }
}
