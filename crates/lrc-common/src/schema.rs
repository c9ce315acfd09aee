//! Process-wide schema parameters, immutable after startup.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placement policy selector (§4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceMethod {
    /// Cluster-aware: one core rack per compact group, auxiliary racks for
    /// the remaining fast sub-groups.
    OptS,
    /// Rack-distributed: one rack per fast group.
    OptR,
    /// One block per rack, first node only.
    Flat,
}

/// The coding schema in force for a stripe at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeState {
    /// `l_f` live fast local parities, no reserved shadow in use.
    Hot,
    /// `l_c` live compact local parities, `l_f - l_c` shadows reserved.
    Cold,
}

/// Schema parameters, set once at startup and shared by every stripe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaParams {
    /// Data blocks per stripe.
    pub k: u32,
    /// Fast-code local groups per stripe.
    pub l_f: u32,
    /// Compact-code local groups per stripe.
    pub l_c: u32,
    /// Global parities; reserved, always 0 on the wire.
    pub g: u32,
    /// Stripe-block byte size.
    pub chunk_size: u64,
    /// Transport packet byte size.
    pub packet_size: u64,
    pub place_method: PlaceMethod,
}

impl SchemaParams {
    pub fn new(
        k: u32,
        l_f: u32,
        l_c: u32,
        g: u32,
        chunk_size: u64,
        packet_size: u64,
        place_method: PlaceMethod,
    ) -> Result<Self> {
        let params = Self {
            k,
            l_f,
            l_c,
            g,
            chunk_size,
            packet_size,
            place_method,
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<()> {
        if self.k == 0 || self.l_f == 0 || self.l_c == 0 {
            return Err(Error::Configuration(
                "k, l_f, and l_c must all be nonzero".into(),
            ));
        }
        if self.k % self.l_f != 0 {
            return Err(Error::Configuration(format!(
                "l_f ({}) must divide k ({})",
                self.l_f, self.k
            )));
        }
        if self.k % self.l_c != 0 {
            return Err(Error::Configuration(format!(
                "l_c ({}) must divide k ({})",
                self.l_c, self.k
            )));
        }
        if self.l_f % self.l_c != 0 {
            return Err(Error::Configuration(format!(
                "l_c ({}) must divide l_f ({})",
                self.l_c, self.l_f
            )));
        }
        if self.chunk_size == 0 || self.packet_size == 0 {
            return Err(Error::Configuration(
                "chunk_size and packet_size must be nonzero".into(),
            ));
        }
        if self.g != 0 {
            return Err(Error::not_implemented(
                "global parities (g > 0) are reserved for future extension",
            ));
        }
        Ok(())
    }

    /// Data blocks per fast local group.
    #[must_use]
    pub const fn r_f(&self) -> u32 {
        self.k / self.l_f
    }

    /// Data blocks per compact local group.
    #[must_use]
    pub const fn r_c(&self) -> u32 {
        self.k / self.l_c
    }

    /// Fast groups per compact group (merge/split fan-in).
    #[must_use]
    pub const fn delta(&self) -> u32 {
        self.l_f / self.l_c
    }

    /// Live block count for a stripe in the given code state (excludes `g`,
    /// which is always reserved).
    #[must_use]
    pub const fn live_block_count(&self, state: CodeState) -> u32 {
        match state {
            CodeState::Hot => self.k + self.l_f,
            CodeState::Cold => self.k + self.l_c,
        }
    }

    /// Total block-index space, including blocks held in reserved shadow.
    #[must_use]
    pub const fn total_block_count(&self) -> u32 {
        self.k + self.l_f + self.g
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: u32, l_f: u32, l_c: u32) -> SchemaParams {
        SchemaParams::new(k, l_f, l_c, 0, 4096, 1024, PlaceMethod::OptS).unwrap()
    }

    #[test]
    fn derived_ratios() {
        let p = params(4, 2, 1);
        assert_eq!(p.r_f(), 2);
        assert_eq!(p.r_c(), 4);
        assert_eq!(p.delta(), 2);
    }

    #[test]
    fn rejects_non_dividing_l_f() {
        assert!(SchemaParams::new(5, 2, 1, 0, 4096, 1024, PlaceMethod::OptS).is_err());
    }

    #[test]
    fn rejects_l_c_not_dividing_l_f() {
        assert!(SchemaParams::new(12, 4, 3, 0, 4096, 1024, PlaceMethod::OptS).is_err());
    }

    #[test]
    fn rejects_nonzero_global_parity() {
        assert!(SchemaParams::new(4, 2, 1, 1, 4096, 1024, PlaceMethod::OptS).is_err());
    }
}
