//! Transcoder — Downcode, compact → fast (§4.6).
//!
//! Per compact group with base fast id `B = c·δ`: the `δ−1` reserved
//! shadows (`B+1..B+δ`) always hold their original, untouched fast-parity
//! bytes (upcode never rewrote them — only the target `B` was overwritten
//! in place to become the compact parity), so they are recomputed fresh
//! from their own `r_f` data blocks purely as a from-authoritative-data
//! re-derivation rather than a trust-the-cache read. Target `B` is then
//! recovered either the same way (OPT_R, since data and parity never left
//! one rack) or algebraically as `compact_parity ⊕ shadow_1 ⊕ … ⊕
//! shadow_{δ−1}` (OPT_S/FLAT), which avoids a second cross-rack data fetch
//! for the one subgroup whose data is not already local to the target.
//!
//! This chooses the target's own node as the point where the algebraic
//! XOR completes (rather than the source's two-phase `st re` redirect to
//! "the last reserved shadow"), so block `B` never changes resident node —
//! required by invariant 5. See `DESIGN.md` for the full writeup.

use lrc_codec::{AckVerb, Command, GatewayProgramBuilder, Token};
use lrc_common::{BlockSeq, CodeState, CoordinatorConfig, Error, NodeId, PlaceMethod, Result, SchemaParams};
use lrc_meta::{MetaStore, MetaUpdate, StripeMeta};

use crate::decode::NodeCommand;
use crate::dispatch::Dispatcher;
use crate::state_machine::{StripeOutcome, StripeState};

/// The planned command set for one stripe's downcode.
#[derive(Clone, Debug)]
pub struct DowncodePlan {
    pub node_commands: Vec<NodeCommand>,
    pub gateway_command: Option<NodeCommand>,
    /// Compact-parity (target) nodes only — downcode's `AWAIT_ACK` set
    /// (§4.7): "only compact parity nodes ack; the reconstructed shadows
    /// report through them".
    pub ack_targets: Vec<NodeId>,
}

/// Plan the downcode of one cold stripe.
pub fn plan_downcode(stripe: &StripeMeta, schema: &SchemaParams, gateway: NodeId) -> Result<DowncodePlan> {
    if stripe.state != CodeState::Cold {
        return Err(Error::invalid_argument("downcode requires a cold stripe"));
    }

    let delta = schema.delta();
    let r_f = schema.r_f();
    let mut node_commands = Vec::new();
    let mut ack_targets = Vec::with_capacity(schema.l_c as usize);
    let mut gateway_builder = GatewayProgramBuilder::new();
    let mut gateway_used = false;

    for c in 0..schema.l_c {
        let b = c * delta;

        // Fatal precondition: every reserved shadow must still have a
        // known resident node before any command is issued.
        for j in 1..delta {
            let shadow_index = schema.k + b + j;
            if stripe.node(shadow_index).is_none() {
                return Err(Error::ReservedShadowMissing(format!(
                    "{}-{:02}",
                    stripe.id, shadow_index
                )));
            }
        }

        let target_index = schema.k + b;
        let target_block = stripe.id.block(BlockSeq::new(target_index as u8)?);
        let target_node = stripe
            .node(target_index)
            .ok_or_else(|| Error::internal("downcode target missing node mapping"))?;

        // Each shadow always rebuilds itself from its own r_f data; under
        // OPT_S/FLAT it additionally forwards the result on to the target
        // in the same program, since the target's own algebraic recompute
        // needs it.
        let shadow_forward = match schema.place_method {
            PlaceMethod::OptR => None,
            PlaceMethod::OptS => Some(target_node),
            PlaceMethod::Flat => {
                gateway_used = true;
                Some(gateway)
            }
        };

        let mut shadow_nodes = Vec::with_capacity((delta - 1) as usize);
        for j in 1..delta {
            let shadow_f = b + j;
            let shadow_node = recompute_from_own_data(
                stripe,
                schema,
                shadow_f,
                r_f,
                gateway,
                shadow_forward,
                &mut node_commands,
                &mut gateway_builder,
                &mut gateway_used,
            )?;
            shadow_nodes.push(shadow_node);

            if matches!(schema.place_method, PlaceMethod::Flat) {
                gateway_builder.push_primary(Token::Wait {
                    peers: vec![shadow_node],
                });
                gateway_builder.push_primary(Token::Send {
                    block: target_block.clone(),
                    dst: target_node,
                });
            }
        }
        if matches!(schema.place_method, PlaceMethod::Flat) {
            gateway_builder.next_section();
        }

        match schema.place_method {
            PlaceMethod::OptR => {
                recompute_from_own_data(
                    stripe,
                    schema,
                    b,
                    r_f,
                    gateway,
                    None,
                    &mut node_commands,
                    &mut gateway_builder,
                    &mut gateway_used,
                )?;
            }
            PlaceMethod::OptS => {
                node_commands.push(NodeCommand {
                    node: target_node,
                    command: Command::Downcode {
                        program: vec![
                            Token::Wait {
                                peers: shadow_nodes.clone(),
                            },
                            Token::RecoInto {
                                block: target_block,
                            },
                        ],
                    },
                });
            }
            PlaceMethod::Flat => {
                node_commands.push(NodeCommand {
                    node: target_node,
                    command: Command::Downcode {
                        program: vec![
                            Token::Wait {
                                peers: vec![gateway; shadow_nodes.len()],
                            },
                            Token::RecoInto {
                                block: target_block,
                            },
                        ],
                    },
                });
            }
        }

        ack_targets.push(target_node);
    }

    let gateway_command = if gateway_used {
        Some(NodeCommand {
            node: gateway,
            command: gateway_builder.build(),
        })
    } else {
        None
    };

    Ok(DowncodePlan {
        node_commands,
        gateway_command,
        ack_targets,
    })
}

/// Emit the command set that reconstructs fast-parity index `f` fresh from
/// its own `r_f` data blocks, and return the node that will hold the
/// result. OPT_R keeps this purely in-rack; OPT_S sends cross-rack
/// directly (one source rack to one destination, so no multi-rack
/// consolidation — and hence no gateway — is required); FLAT relays
/// through the gateway since it never co-locates anything.
#[allow(clippy::too_many_arguments)]
fn recompute_from_own_data(
    stripe: &StripeMeta,
    schema: &SchemaParams,
    f: u32,
    r_f: u32,
    gateway: NodeId,
    forward_to: Option<NodeId>,
    node_commands: &mut Vec<NodeCommand>,
    gateway_builder: &mut GatewayProgramBuilder,
    gateway_used: &mut bool,
) -> Result<NodeId> {
    let parity_index = schema.k + f;
    let parity_block = stripe.id.block(BlockSeq::new(parity_index as u8)?);
    let parity_node = stripe
        .node(parity_index)
        .ok_or_else(|| Error::internal("downcode parity missing node mapping"))?;

    let data_nodes: Vec<NodeId> = (f * r_f..(f + 1) * r_f)
        .map(|idx| stripe.node(idx).ok_or_else(|| Error::internal("downcode data block missing node mapping")))
        .collect::<Result<Vec<_>>>()?;
    let data_blocks: Vec<lrc_common::BlockId> = (f * r_f..(f + 1) * r_f)
        .map(|idx| BlockSeq::new(idx as u8).map(|seq| stripe.id.block(seq)))
        .collect::<Result<Vec<_>>>()?;

    let relay_through_gateway = matches!(schema.place_method, PlaceMethod::Flat);

    for (data_node, data_block) in data_nodes.iter().zip(data_blocks.iter()) {
        let dst = if relay_through_gateway { gateway } else { parity_node };
        node_commands.push(NodeCommand {
            node: *data_node,
            command: Command::Downcode {
                program: vec![Token::Send {
                    block: data_block.clone(),
                    dst,
                }],
            },
        });
    }

    let wait_peers = if relay_through_gateway {
        *gateway_used = true;
        gateway_builder.push_primary(Token::Wait {
            peers: data_nodes.clone(),
        });
        gateway_builder.push_primary(Token::Send {
            block: parity_block.clone(),
            dst: parity_node,
        });
        gateway_builder.next_section();
        vec![gateway]
    } else {
        data_nodes
    };

    let mut program = vec![
        Token::Wait { peers: wait_peers },
        Token::RecoInto {
            block: parity_block.clone(),
        },
    ];
    if let Some(dst) = forward_to {
        program.push(Token::Send {
            block: parity_block,
            dst,
        });
    }

    node_commands.push(NodeCommand {
        node: parity_node,
        command: Command::Downcode { program },
    });

    Ok(parity_node)
}

/// Drive one stripe's downcode to completion: dispatch, await every
/// compact-parity node's `fi_doco`, and on full success flip the stripe
/// (and file, if it was the last cold one) to hot.
pub fn downcode_stripe(
    dispatcher: &dyn Dispatcher,
    meta: &MetaStore,
    config: &CoordinatorConfig,
    gateway: NodeId,
    stripe: &StripeMeta,
) -> Result<StripeOutcome> {
    let plan = plan_downcode(stripe, &config.schema, gateway)?;

    for nc in &plan.node_commands {
        dispatcher.send_command(nc.node, &nc.command)?;
    }
    if let Some(nc) = &plan.gateway_command {
        dispatcher.send_command(nc.node, &nc.command)?;
    }

    let acks = crate::state_machine::await_acks(dispatcher, &plan.ack_targets, config.ack_timeout);
    let failed_acks: Vec<(NodeId, AckVerb)> = acks
        .into_iter()
        .filter_map(|(node, ack)| match ack {
            Ok(verb) if matches!(verb, AckVerb::FiDoco) => None,
            Ok(verb) => Some((node, verb)),
            Err(_) => Some((node, AckVerb::Error("no ack received".to_string()))),
        })
        .collect();

    if failed_acks.is_empty() {
        meta.apply(MetaUpdate::FlipHot {
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

#[cfg(test)]
mod tests {
    use super::*;
    use lrc_common::{FileName, StripeId, StripeSeq};
    use lrc_placement::plan_placement;
    use lrc_topology::{RackId, RackTopology};

    fn node(n: u8) -> NodeId {
        NodeId::new([10, 0, 0, n])
    }

    fn three_two_node_racks() -> RackTopology {
        let mut topo = RackTopology::new();
        topo.upsert_rack(RackId::new("R0"), vec![node(1), node(2)]);
        topo.upsert_rack(RackId::new("R1"), vec![node(3), node(4)]);
        topo.upsert_rack(RackId::new("R2"), vec![node(5), node(6)]);
        topo
    }

    fn cold_stripe_from_placement(topo: &RackTopology, schema: &SchemaParams) -> StripeMeta {
        let placement = plan_placement(topo, schema).unwrap();
        let nodes: Vec<NodeId> = (0..placement.len() as u32)
            .map(|i| placement.node_for(i).unwrap())
            .collect();
        let id = StripeId::new(FileName::new("abcdef").unwrap(), StripeSeq::new(0).unwrap());
        let mut stripe = StripeMeta::new(id, nodes);
        stripe.state = CodeState::Cold;
        stripe
    }

    #[test]
    fn opt_r_downcode_is_fully_in_rack() {
        let topo = three_two_node_racks();
        let schema = SchemaParams::new(4, 2, 1, 0, 4096, 1024, PlaceMethod::OptR).unwrap();
        let stripe = cold_stripe_from_placement(&topo, &schema);

        let plan = plan_downcode(&stripe, &schema, node(99)).unwrap();
        assert!(plan.gateway_command.is_none());
        assert_eq!(plan.ack_targets, vec![stripe.node(4).unwrap()]);
    }

    #[test]
    fn opt_s_downcode_sends_shadow_result_direct_to_target() {
        let topo = three_two_node_racks();
        let schema = SchemaParams::new(4, 2, 1, 0, 4096, 1024, PlaceMethod::OptS).unwrap();
        let stripe = cold_stripe_from_placement(&topo, &schema);

        let plan = plan_downcode(&stripe, &schema, node(99)).unwrap();
        assert!(plan.gateway_command.is_none());

        let shadow_node = stripe.node(5).unwrap();
        let shadow_cmd = plan
            .node_commands
            .iter()
            .find(|nc| nc.node == shadow_node)
            .unwrap();
        assert!(matches!(
            &shadow_cmd.command,
            Command::Downcode { program }
                if matches!(program.as_slice(), [Token::Wait { .. }, Token::RecoInto { .. }, Token::Send { dst, .. }] if *dst == stripe.node(4).unwrap())
        ));
    }

    #[test]
    fn flat_downcode_routes_through_gateway() {
        let mut topo = RackTopology::new();
        for i in 0..6u8 {
            topo.upsert_rack(RackId::new(format!("R{i}")), vec![node(i + 1)]);
        }
        let schema = SchemaParams::new(4, 2, 1, 0, 4096, 1024, PlaceMethod::Flat).unwrap();
        let stripe = cold_stripe_from_placement(&topo, &schema);

        let plan = plan_downcode(&stripe, &schema, node(99)).unwrap();
        assert!(plan.gateway_command.is_some());
    }

    #[test]
    fn missing_reserved_shadow_aborts_before_any_command() {
        let topo = three_two_node_racks();
        let schema = SchemaParams::new(4, 2, 1, 0, 4096, 1024, PlaceMethod::OptS).unwrap();
        let placement = plan_placement(&topo, &schema).unwrap();
        // Truncate the node list so the reserved shadow (index 5) has no
        // known resident node.
        let nodes: Vec<NodeId> = (0..5u32).map(|i| placement.node_for(i).unwrap()).collect();
        let id = StripeId::new(FileName::new("abcdef").unwrap(), StripeSeq::new(0).unwrap());
        let mut stripe = StripeMeta::new(id, nodes);
        stripe.state = CodeState::Cold;

        let err = plan_downcode(&stripe, &schema, node(99)).unwrap_err();
        assert!(matches!(err, Error::ReservedShadowMissing(_)));
    }
}
