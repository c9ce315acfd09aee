//! Gateway command builder.
//!
//! Models the source's two raw char buffers (`gw_cmd`, `gw_cmd_f`) as an
//! ordered builder with two slots — primary and continuation — rather than
//! in-place string concatenation. The continuation is only emitted once the
//! primary slot is non-empty, and is joined to the primary by a `st`
//! (stage) separator, matching the staged `st re` / `st de` redirects used
//! by downcode under OPT_S and FLAT.

use crate::command::Command;
use crate::token::Token;

/// Accumulates a gateway program across one or more per-target (or
/// per-rack) sections.
#[derive(Debug, Default)]
pub struct GatewayProgramBuilder {
    program_count: u32,
    primary: Vec<Token>,
    continuation: Vec<Token>,
}

impl GatewayProgramBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token to the primary slot and count it towards the
    /// `ga<N>` header.
    pub fn push_primary(&mut self, token: Token) -> &mut Self {
        self.primary.push(token);
        self
    }

    /// Begin (or continue) a new primary section, incrementing the
    /// `ga<N>` header count.
    pub fn next_section(&mut self) -> &mut Self {
        self.program_count += 1;
        self
    }

    /// Append a token to the continuation slot, emitted after the primary
    /// program and a `st` separator.
    pub fn push_continuation(&mut self, token: Token) -> &mut Self {
        self.continuation.push(token);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.continuation.is_empty()
    }

    #[must_use]
    pub fn build(self) -> Command {
        let mut program = self.primary;
        if !self.continuation.is_empty() {
            if !program.is_empty() {
                program.push(Token::Stage);
            }
            program.extend(self.continuation);
        }
        Command::Gateway {
            program_count: self.program_count,
            program,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrc_common::NodeId;

    fn node(n: u8) -> NodeId {
        NodeId::new([10, 0, 0, n])
    }

    #[test]
    fn continuation_only_appears_after_primary() {
        let mut builder = GatewayProgramBuilder::new();
        builder.next_section();
        builder.push_primary(Token::Wait {
            peers: vec![node(1)],
        });
        builder.push_continuation(Token::Reco);

        let Command::Gateway {
            program_count,
            program,
        } = builder.build()
        else {
            unreachable!()
        };
        assert_eq!(program_count, 1);
        assert_eq!(
            program,
            vec![
                Token::Wait {
                    peers: vec![node(1)]
                },
                Token::Stage,
                Token::Reco,
            ]
        );
    }

    #[test]
    fn empty_continuation_emits_no_stage_separator() {
        let mut builder = GatewayProgramBuilder::new();
        builder.next_section();
        builder.push_primary(Token::Reco);
        let Command::Gateway { program, .. } = builder.build() else {
            unreachable!()
        };
        assert_eq!(program, vec![Token::Reco]);
    }
}
