//! Upload Orchestrator (§4.3).
//!
//! Splits a file into `k`-data-block stripes, computes the `l_f` fast local
//! parities for each stripe by XOR, places every stripe's blocks, and
//! commits only the stripes whose blocks all acked `write blk success`
//! (§9 Q3: unlike the source, a stripe with any failed ack is simply left
//! out of the file's stripe list rather than partially recorded).

use bytes::Bytes;
use lrc_codec::{AckVerb, Command};
use lrc_common::{BlockChecksum, BlockSeq, CoordinatorConfig, Error, FileName, NodeId, Result, SchemaParams, StripeId, StripeSeq};
use lrc_erasure::xor_many;
use lrc_meta::{FileMeta, MetaStore, MetaUpdate, StripeMeta};
use lrc_placement::plan_placement;
use lrc_topology::RackTopology;
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::state_machine::{StripeOutcome, StripeState};

/// Outcome of uploading one whole file.
#[derive(Clone, Debug)]
pub struct UploadReport {
    pub file: FileName,
    pub committed_stripes: Vec<StripeId>,
    pub failed_stripes: Vec<StripeOutcome>,
    pub tail_bytes_dropped: u64,
}

/// Upload `data` as `file_name`, splitting it into stripes of
/// `k * chunk_size` bytes and dropping any partial tail (§9 Q1).
pub fn upload_file(
    dispatcher: &dyn Dispatcher,
    meta: &MetaStore,
    topology: &RackTopology,
    config: &CoordinatorConfig,
    file_name: FileName,
    data: &[u8],
) -> Result<UploadReport> {
    let schema = &config.schema;
    let stripe_bytes = schema.k as usize * schema.chunk_size as usize;
    if stripe_bytes == 0 {
        return Err(Error::invalid_argument("stripe size must be nonzero"));
    }
    let stripe_count = data.len() / stripe_bytes;
    let tail_bytes_dropped = (data.len() - stripe_count * stripe_bytes) as u64;

    // One static placement computed up front; every stripe of this file
    // shares it, matching the single concrete placement used throughout
    // every worked example in §4.2 and §8.
    let placement = plan_placement(topology, schema)?;

    let mut committed_stripes = Vec::new();
    let mut committed_metas = Vec::new();
    let mut failed_stripes = Vec::new();

    for stripe_idx in 0..stripe_count {
        let stripe_id = StripeId::new(file_name.clone(), StripeSeq::new(stripe_idx as u16)?);
        let stripe_bytes_slice = &data[stripe_idx * stripe_bytes..(stripe_idx + 1) * stripe_bytes];

        let chunk_size = schema.chunk_size as usize;
        let data_blocks: Vec<&[u8]> = stripe_bytes_slice.chunks(chunk_size).collect();
        debug_assert_eq!(data_blocks.len(), schema.k as usize);

        let r_f = schema.r_f() as usize;
        let mut parity_blocks = Vec::with_capacity(schema.l_f as usize);
        for group in 0..schema.l_f as usize {
            let members = &data_blocks[group * r_f..(group + 1) * r_f];
            parity_blocks.push(xor_many(members.iter().copied())?);
        }

        let nodes: Vec<NodeId> = (0..schema.k + schema.l_f)
            .map(|i| placement.node_for(i))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::internal("placement left a block unassigned"))?;

        let mut targets = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            let block = stripe_id.block(BlockSeq::new(index as u8)?);
            dispatcher.send_command(*node, &Command::Expect { block: block.clone() })?;
            let payload: Bytes = if index < schema.k as usize {
                Bytes::copy_from_slice(data_blocks[index])
            } else {
                parity_blocks[index - schema.k as usize].clone()
            };
            let checksum = BlockChecksum::compute(&payload);
            debug!(%block, node = %node, crc32c = checksum.crc32c, xxhash64 = checksum.xxhash64, "computed block checksum");
            dispatcher.send_data(*node, &block, payload)?;
            targets.push(*node);
        }

        let acks: Vec<(NodeId, Result<AckVerb>)> = targets
            .iter()
            .map(|node| (*node, dispatcher.recv_ack(*node, config.ack_timeout)))
            .collect();

        let failed_acks: Vec<(NodeId, AckVerb)> = acks
            .into_iter()
            .filter_map(|(node, ack)| match ack {
                Ok(verb) if verb.is_success() => None,
                Ok(verb) => Some((node, verb)),
                Err(_) => Some((node, AckVerb::Error("no ack received".to_string()))),
            })
            .collect();

        if failed_acks.is_empty() {
            committed_metas.push(StripeMeta::new(stripe_id.clone(), nodes));
            committed_stripes.push(stripe_id);
        } else {
            failed_stripes.push(StripeOutcome {
                stripe_id,
                state: StripeState::Aborted,
                failed_acks,
            });
        }
    }

    if !committed_metas.is_empty() {
        let mut file = FileMeta::new(file_name.clone(), data.len() as u64, tail_bytes_dropped);
        file.stripes = committed_stripes.clone();
        meta.apply(MetaUpdate::CreateFile {
            file,
            stripes: committed_metas,
        })?;
    }

    Ok(UploadReport {
        file: file_name,
        committed_stripes,
        failed_stripes,
        tail_bytes_dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrc_common::PlaceMethod;
    use lrc_topology::RackId;

    use crate::dispatch::RecordingDispatcher;

    fn node(n: u8) -> NodeId {
        NodeId::new([10, 0, 0, n])
    }

    fn topology() -> RackTopology {
        let mut topo = RackTopology::new();
        topo.upsert_rack(RackId::new("R0"), vec![node(1), node(2)]);
        topo.upsert_rack(RackId::new("R1"), vec![node(3), node(4)]);
        topo
    }

    fn config() -> CoordinatorConfig {
        let schema = SchemaParams::new(4, 2, 1, 0, 4, 4, PlaceMethod::OptR).unwrap();
        CoordinatorConfig::new(schema)
    }

    #[test]
    fn full_stripe_commits_on_all_successful_acks() {
        let dispatcher = RecordingDispatcher::new();
        for _ in 0..6 {
            dispatcher.push_ack(AckVerb::WriteBlkSuccess);
        }
        let meta = MetaStore::new();
        let topo = topology();
        let config = config();

        let data = vec![7u8; 16]; // exactly one stripe: k=4 * chunk_size=4
        let report = upload_file(
            &dispatcher,
            &meta,
            &topo,
            &config,
            FileName::new("abcdef").unwrap(),
            &data,
        )
        .unwrap();

        assert_eq!(report.committed_stripes.len(), 1);
        assert!(report.failed_stripes.is_empty());
        assert_eq!(report.tail_bytes_dropped, 0);
        assert_eq!(dispatcher.data_sends().len(), 6);
    }

    #[test]
    fn partial_tail_is_dropped_and_recorded() {
        let dispatcher = RecordingDispatcher::new();
        for _ in 0..6 {
            dispatcher.push_ack(AckVerb::WriteBlkSuccess);
        }
        let meta = MetaStore::new();
        let topo = topology();
        let config = config();

        let data = vec![7u8; 16 + 3];
        let report = upload_file(
            &dispatcher,
            &meta,
            &topo,
            &config,
            FileName::new("abcdef").unwrap(),
            &data,
        )
        .unwrap();

        assert_eq!(report.committed_stripes.len(), 1);
        assert_eq!(report.tail_bytes_dropped, 3);
    }

    #[test]
    fn a_failed_ack_aborts_its_stripe_and_is_not_committed() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.push_ack(AckVerb::WriteBlkSuccess);
        dispatcher.push_ack(AckVerb::WriteBlkSuccess);
        dispatcher.push_ack(AckVerb::BlkEx);
        dispatcher.push_ack(AckVerb::WriteBlkSuccess);
        dispatcher.push_ack(AckVerb::WriteBlkSuccess);
        dispatcher.push_ack(AckVerb::WriteBlkSuccess);
        let meta = MetaStore::new();
        let topo = topology();
        let config = config();

        let data = vec![7u8; 16];
        let report = upload_file(
            &dispatcher,
            &meta,
            &topo,
            &config,
            FileName::new("abcdef").unwrap(),
            &data,
        )
        .unwrap();

        assert!(report.committed_stripes.is_empty());
        assert_eq!(report.failed_stripes.len(), 1);
        assert!(meta.snapshot_file(&FileName::new("abcdef").unwrap()).is_err());
    }
}
