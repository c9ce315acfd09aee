//! Top-level verbs (§4.1).

use lrc_common::{BlockId, Error, Result};

use crate::token::Token;

/// One coordinator→node or coordinator→gateway command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `en<blkName>` — expect an incoming write for this block on the data
    /// port.
    Expect { block: BlockId },
    /// `dl<blkName>` — prepare to serve this block.
    PrepareServe { block: BlockId },
    /// `re` — re-send your block on the data port (post-repair retry).
    Resend,
    /// `de …` — decode subprogram.
    Decode { program: Vec<Token> },
    /// `up …` — upcode subprogram.
    Upcode { program: Vec<Token> },
    /// `do …` — downcode subprogram.
    Downcode { program: Vec<Token> },
    /// `ga …` — gateway program.
    ///
    /// `program_count` is the `ga<N>` header emitted once at the start of a
    /// gateway command (§4.5 step 3: "chained with `ga<l_c>` header the
    /// first time"), generalized here to the number of distinct per-target
    /// (or per-rack) relay sections the program contains.
    Gateway { program_count: u32, program: Vec<Token> },
}

impl Command {
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Expect { block } => format!("en{block}"),
            Self::PrepareServe { block } => format!("dl{block}"),
            Self::Resend => "re".to_string(),
            Self::Decode { program } => encode_compound("de", program),
            Self::Upcode { program } => encode_compound("up", program),
            Self::Downcode { program } => encode_compound("do", program),
            Self::Gateway {
                program_count,
                program,
            } => {
                let mut s = format!("ga{program_count}");
                for token in program {
                    s.push_str(&token.encode());
                }
                s
            }
        }
    }

    pub fn decode(s: &str) -> Result<Self> {
        if let Some(rest) = s.strip_prefix("en") {
            Ok(Self::Expect {
                block: rest.parse()?,
            })
        } else if let Some(rest) = s.strip_prefix("dl") {
            Ok(Self::PrepareServe {
                block: rest.parse()?,
            })
        } else if s == "re" {
            Ok(Self::Resend)
        } else if let Some(rest) = s.strip_prefix("de") {
            Ok(Self::Decode {
                program: Token::parse_all(rest)?,
            })
        } else if let Some(rest) = s.strip_prefix("up") {
            Ok(Self::Upcode {
                program: Token::parse_all(rest)?,
            })
        } else if let Some(rest) = s.strip_prefix("do") {
            Ok(Self::Downcode {
                program: Token::parse_all(rest)?,
            })
        } else if let Some(rest) = s.strip_prefix("ga") {
            let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            let program_count: u32 = rest[..digits_end]
                .parse()
                .map_err(|_| Error::ProtocolViolation(format!("bad gateway count in {s:?}")))?;
            Ok(Self::Gateway {
                program_count,
                program: Token::parse_all(&rest[digits_end..])?,
            })
        } else {
            Err(Error::ProtocolViolation(format!(
                "unrecognized verb in {s:?}"
            )))
        }
    }
}

fn encode_compound(verb: &str, program: &[Token]) -> String {
    let mut s = verb.to_string();
    for token in program {
        s.push_str(&token.encode());
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrc_common::{BlockSeq, FileName, NodeId, StripeId, StripeSeq};

    fn block(index: u8) -> BlockId {
        let stripe = StripeId::new(FileName::new("abcdef").unwrap(), StripeSeq::new(1).unwrap());
        BlockId::new(stripe, BlockSeq::new(index).unwrap())
    }

    #[test]
    fn expect_round_trips() {
        let cmd = Command::Expect { block: block(0) };
        assert_eq!(Command::decode(&cmd.encode()).unwrap(), cmd);
    }

    #[test]
    fn decode_scenario_matches_spec_example() {
        // §8 scenario 2: "Node 0's command is dewa1blk<ip1>reco"
        let ip = NodeId::new([10, 0, 0, 1]);
        let cmd = Command::Decode {
            program: vec![
                Token::Wait { peers: vec![ip] },
                Token::Reco,
            ],
        };
        assert_eq!(cmd.encode(), format!("dewa1blk{}reco", ip.encode_fixed()));
    }

    #[test]
    fn gateway_header_round_trips() {
        let cmd = Command::Gateway {
            program_count: 1,
            program: vec![Token::Stage],
        };
        assert_eq!(cmd.encode(), "ga1st");
        assert_eq!(Command::decode("ga1st").unwrap(), cmd);
    }

    #[test]
    fn resend_round_trips() {
        assert_eq!(Command::decode("re").unwrap(), Command::Resend);
    }
}
