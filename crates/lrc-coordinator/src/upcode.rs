//! Transcoder — Upcode, fast → compact (§4.5).
//!
//! Index math: fast parity `f ∈ [0, l_f)` belongs to compact group
//! `c = ⌊f / δ⌋`; `f` is the **target** of that group iff `f mod δ == 0`,
//! else a **contributor**. Fast-parity block indices never move (invariant
//! 5); only the live/reserved-shadow role attached to `f` changes, which is
//! why [`lrc_meta::model::StripeMeta::role`] keys off `f % delta` rather
//! than a contiguous index range.

use lrc_codec::{Command, GatewayProgramBuilder, Token};
use lrc_common::{BlockSeq, CoordinatorConfig, Error, NodeId, PlaceMethod, Result};
use lrc_meta::{MetaStore, MetaUpdate, StripeMeta};

use crate::decode::NodeCommand;
use crate::dispatch::Dispatcher;
use crate::state_machine::{StripeOutcome, StripeState};

/// The planned command set for one stripe's upcode.
#[derive(Clone, Debug)]
pub struct UpcodePlan {
    pub node_commands: Vec<NodeCommand>,
    pub gateway_command: Option<NodeCommand>,
    /// Every target node; upcode's `AWAIT_ACK` set is exactly these (§4.7).
    pub ack_targets: Vec<NodeId>,
}

/// Plan the upcode of one hot stripe.
pub fn plan_upcode(stripe: &StripeMeta, schema: &lrc_common::SchemaParams, gateway: NodeId) -> Result<UpcodePlan> {
    if stripe.state != lrc_common::CodeState::Hot {
        return Err(Error::invalid_argument("upcode requires a hot stripe"));
    }

    let delta = schema.delta();
    let mut node_commands = Vec::new();
    let mut ack_targets = Vec::with_capacity(schema.l_c as usize);
    let mut gateway_builder = GatewayProgramBuilder::new();
    let relay_through_gateway = !matches!(schema.place_method, PlaceMethod::OptS);

    for c in 0..schema.l_c {
        let target_f = c * delta;
        let target_index = schema.k + target_f;
        let target_block = stripe.id.block(BlockSeq::new(target_index as u8)?);
        let target_node = stripe
            .node(target_index)
            .ok_or_else(|| Error::internal("upcode target missing node mapping"))?;

        let mut contributor_nodes = Vec::with_capacity((delta - 1) as usize);
        for j in 1..delta {
            let contributor_index = schema.k + target_f + j;
            let contributor_block = stripe.id.block(BlockSeq::new(contributor_index as u8)?);
            let contributor_node = stripe
                .node(contributor_index)
                .ok_or_else(|| Error::internal("upcode contributor missing node mapping"))?;

            let dst = if relay_through_gateway { gateway } else { target_node };
            node_commands.push(NodeCommand {
                node: contributor_node,
                command: Command::Upcode {
                    program: vec![Token::Send {
                        block: contributor_block,
                        dst,
                    }],
                },
            });
            contributor_nodes.push(contributor_node);

            if relay_through_gateway {
                gateway_builder.push_primary(Token::Wait {
                    peers: vec![contributor_node],
                });
                gateway_builder.push_primary(Token::Send {
                    block: target_block.clone(),
                    dst: target_node,
                });
            }
        }

        let wait_peers = if relay_through_gateway {
            vec![gateway; (delta - 1) as usize]
        } else {
            contributor_nodes
        };

        node_commands.push(NodeCommand {
            node: target_node,
            command: Command::Upcode {
                program: vec![
                    Token::RecoInto {
                        block: target_block,
                    },
                    Token::Wait { peers: wait_peers },
                ],
            },
        });
        ack_targets.push(target_node);

        if relay_through_gateway {
            gateway_builder.next_section();
        }
    }

    let gateway_command = if relay_through_gateway {
        Some(NodeCommand {
            node: gateway,
            command: gateway_builder.build(),
        })
    } else {
        None
    };

    Ok(UpcodePlan {
        node_commands,
        gateway_command,
        ack_targets,
    })
}

/// Drive one stripe's upcode to completion: dispatch, await every target's
/// `fi_upco`, and on full success flip the stripe (and file, if it was the
/// last hot one) to cold.
pub fn upcode_stripe(
    dispatcher: &dyn Dispatcher,
    meta: &MetaStore,
    config: &CoordinatorConfig,
    gateway: NodeId,
    stripe: &StripeMeta,
) -> Result<StripeOutcome> {
    let plan = plan_upcode(stripe, &config.schema, gateway)?;

    for nc in &plan.node_commands {
        dispatcher.send_command(nc.node, &nc.command)?;
    }
    if let Some(nc) = &plan.gateway_command {
        dispatcher.send_command(nc.node, &nc.command)?;
    }

    let acks = crate::state_machine::await_acks(dispatcher, &plan.ack_targets, config.ack_timeout);
    let failed_acks: Vec<(NodeId, lrc_codec::AckVerb)> = acks
        .into_iter()
        .filter_map(|(node, ack)| match ack {
            Ok(verb) if matches!(verb, lrc_codec::AckVerb::FiUpco) => None,
            Ok(verb) => Some((node, verb)),
            Err(_) => Some((node, lrc_codec::AckVerb::Error("no ack received".to_string()))),
        })
        .collect();

    if failed_acks.is_empty() {
        meta.apply(MetaUpdate::FlipCold {
            stripe_id: stripe.id.clone(),
        })?;
        Ok(StripeOutcome {
            stripe_id: stripe.id.clone(),
            state: StripeState::Committed,
            failed_acks,
        })
    } else {
        Ok(StripeOutcome {
            stripe_id: stripe.id.clone(),
            state: StripeState::Aborted,
            failed_acks,
        })
    }
}
