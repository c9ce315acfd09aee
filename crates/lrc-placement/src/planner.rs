use lrc_common::{Error, NodeId, PlaceMethod, Result, SchemaParams};
use lrc_topology::{RackInfo, RackTopology};

/// A `block_index -> node` mapping for all `k + l_f` live-index blocks of a
/// stripe (global parities are reserved and never placed).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    nodes: Vec<NodeId>,
}

impl Placement {
    #[must_use]
    pub fn node_for(&self, block_index: u32) -> Option<NodeId> {
        self.nodes.get(block_index as usize).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (u32, NodeId)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u32, *n))
    }
}

/// Round-robin node cursor within a rack. A single-node rack always
/// returns that node, co-locating everything assigned to it.
struct RackCursor<'a> {
    rack: &'a RackInfo,
    next: usize,
}

impl<'a> RackCursor<'a> {
    fn new(rack: &'a RackInfo) -> Self {
        Self { rack, next: 0 }
    }

    fn take(&mut self) -> NodeId {
        let node = self.rack.nodes[self.next % self.rack.nodes.len()];
        self.next += 1;
        node
    }
}

fn require_racks<'a>(sorted: &'a [&'a RackInfo], required: usize) -> Result<&'a [&'a RackInfo]> {
    if sorted.len() < required {
        return Err(Error::InsufficientTopology {
            available: sorted.len(),
            required,
        });
    }
    Ok(&sorted[..required])
}

/// Plan placement for all `k + l_f` blocks of a stripe under the schema's
/// configured placement policy.
pub fn plan_placement(topology: &RackTopology, schema: &SchemaParams) -> Result<Placement> {
    let sorted = topology.sorted_racks();
    let k = schema.k;
    let l_f = schema.l_f;
    let total = (k + l_f) as usize;
    let mut nodes = vec![None; total];

    match schema.place_method {
        PlaceMethod::OptS => plan_opt_s(&sorted, schema, &mut nodes)?,
        PlaceMethod::OptR => plan_opt_r(&sorted, schema, &mut nodes)?,
        PlaceMethod::Flat => plan_flat(&sorted, schema, &mut nodes)?,
    }

    let nodes = nodes
        .into_iter()
        .enumerate()
        .map(|(i, n)| {
            n.ok_or_else(|| Error::internal(format!("placement left block {i} unassigned")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Placement { nodes })
}

fn plan_opt_s(
    sorted: &[&RackInfo],
    schema: &SchemaParams,
    nodes: &mut [Option<NodeId>],
) -> Result<()> {
    let l_f = schema.l_f as usize;
    let l_c = schema.l_c as usize;
    let r_f = schema.r_f() as usize;
    let delta = schema.delta() as usize;
    let k = schema.k as usize;

    let racks = require_racks(sorted, l_f)?;

    for i in 0..l_c {
        let core = racks[i];
        let mut cursor = RackCursor::new(core);

        // First r_f data blocks of the group's leading fast sub-group.
        let f0 = i * delta;
        for data_idx in f0 * r_f..(f0 + 1) * r_f {
            nodes[data_idx] = Some(cursor.take());
        }
        // All delta fast parities of this compact group.
        for s in 0..delta {
            nodes[k + i * delta + s] = Some(cursor.take());
        }

        // Remaining delta-1 fast sub-groups on distinct auxiliary racks.
        for j in 0..delta.saturating_sub(1) {
            let aux_rack_index = l_c + i * (delta - 1) + j;
            let aux = racks[aux_rack_index];
            let mut aux_cursor = RackCursor::new(aux);
            let f = f0 + j + 1;
            for data_idx in f * r_f..(f + 1) * r_f {
                nodes[data_idx] = Some(aux_cursor.take());
            }
        }
    }
    Ok(())
}

fn plan_opt_r(
    sorted: &[&RackInfo],
    schema: &SchemaParams,
    nodes: &mut [Option<NodeId>],
) -> Result<()> {
    let l_f = schema.l_f as usize;
    let r_f = schema.r_f() as usize;
    let k = schema.k as usize;

    let racks = require_racks(sorted, l_f)?;

    for i in 0..l_f {
        let rack = racks[i];
        let mut cursor = RackCursor::new(rack);
        for data_idx in i * r_f..(i + 1) * r_f {
            nodes[data_idx] = Some(cursor.take());
        }
        nodes[k + i] = Some(cursor.take());
    }
    Ok(())
}

fn plan_flat(
    sorted: &[&RackInfo],
    schema: &SchemaParams,
    nodes: &mut [Option<NodeId>],
) -> Result<()> {
    let total = (schema.k + schema.l_f) as usize;
    let racks = require_racks(sorted, total)?;
    for (i, rack) in racks.iter().enumerate() {
        nodes[i] = Some(rack.nodes[0]);
    }
    Ok(())
}
