use serde::{Deserialize, Serialize};

use lrc_common::{CodeState, FileName, NodeId, SchemaParams, StripeId};

/// The semantic role of a block index at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockRole {
    Data,
    FastParity,
    CompactParity,
    /// Live fast parity, `l_f - l_c` of them, inactive while a stripe is
    /// cold. Bytes remain on disk at their original node.
    ReservedShadow,
}

/// A stripe's metadata: code state plus the stable `block_index -> node`
/// mapping established at upload (invariant 5: block placement never
/// changes except through out-of-scope rebalancing).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StripeMeta {
    pub id: StripeId,
    pub state: CodeState,
    /// Indexed `0..k+l_f`; stable for the lifetime of the stripe.
    nodes: Vec<NodeId>,
}

impl StripeMeta {
    #[must_use]
    pub fn new(id: StripeId, nodes: Vec<NodeId>) -> Self {
        Self {
            id,
            state: CodeState::Hot,
            nodes,
        }
    }

    #[must_use]
    pub fn node(&self, index: u32) -> Option<NodeId> {
        self.nodes.get(index as usize).copied()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.nodes.len()
    }

    /// Classify a block index given the schema in force.
    ///
    /// A fast-parity index `k+f` keeps its identity across upcode/downcode
    /// (invariant 5: block IDs never move); only its *role* flips. `f` is a
    /// target (the live compact parity for its group) iff `f % delta == 0`,
    /// else a contributor folded into the reserved shadow once cold.
    #[must_use]
    pub fn role(&self, index: u32, schema: &SchemaParams) -> BlockRole {
        if index < schema.k {
            return BlockRole::Data;
        }
        let f = index - schema.k;
        match self.state {
            CodeState::Hot => BlockRole::FastParity,
            CodeState::Cold => {
                if f % schema.delta() == 0 {
                    BlockRole::CompactParity
                } else {
                    BlockRole::ReservedShadow
                }
            }
        }
    }

    /// All currently-live indices (data plus live parities; excludes
    /// reserved shadows while cold).
    #[must_use]
    pub fn live_indices(&self, schema: &SchemaParams) -> Vec<u32> {
        match self.state {
            CodeState::Hot => (0..schema.k + schema.l_f).collect(),
            CodeState::Cold => {
                let delta = schema.delta();
                (0..schema.k)
                    .chain((0..schema.l_c).map(|c| schema.k + c * delta))
                    .collect()
            }
        }
    }
}

/// A tenant file's metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: FileName,
    pub size: u64,
    /// New files are hot; upcode turns them cold; downcode turns them hot.
    pub hot: bool,
    pub stripes: Vec<StripeId>,
    /// Total bytes dropped from the final partial stripe (§9 Q1): recorded,
    /// never padded.
    pub tail_bytes_dropped: u64,
}

impl FileMeta {
    #[must_use]
    pub fn new(name: FileName, size: u64, tail_bytes_dropped: u64) -> Self {
        Self {
            name,
            size,
            hot: true,
            stripes: Vec::new(),
            tail_bytes_dropped,
        }
    }
}

/// An atomic mutation applied to the store only after every ack for a
/// stripe (or file) operation has arrived (§4.7 `COMMIT`).
#[derive(Clone, Debug)]
pub enum MetaUpdate {
    /// Upload created a new file with its initial hot stripes.
    CreateFile { file: FileMeta, stripes: Vec<StripeMeta> },
    /// Upcode completed for a stripe: flips it (and, if it is the file's
    /// last hot stripe, the file) to cold.
    FlipCold { stripe_id: StripeId },
    /// Downcode completed for a stripe: flips it (and the file, if this
    /// was its last cold stripe) to hot.
    FlipHot { stripe_id: StripeId },
}
