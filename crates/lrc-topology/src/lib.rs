//! Rack/node topology model.
//!
//! Deliberately flat compared to the region/datacenter/rack/node nesting
//! used for CRUSH-style placement elsewhere: the coordinator only ever
//! reasons about racks and the nodes within them (§3, "Rack — identifier;
//! holds a non-empty set of Node identifiers").

mod topology;

pub use topology::{RackId, RackInfo, RackTopology};
