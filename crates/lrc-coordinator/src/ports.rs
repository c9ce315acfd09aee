//! Named control/data ports (§6), sourced from [`lrc_common::config::PortConfig`]
//! rather than hard-coded here — these re-exports exist only to give the
//! spec's names a place to live next to the code that uses them.

pub use lrc_common::config::PortConfig;
