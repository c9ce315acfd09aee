//! Stateless text codec for coordinator-to-node and coordinator-to-gateway
//! commands.
//!
//! IPs are emitted as 15-character fixed-width dotted strings and block
//! names as 14-character fixed-width strings; both widths come from
//! `lrc_common::ids`. Concatenation without delimiters is legal because
//! widths are known on both ends — decoders split by position, never by
//! scanning for a separator.

pub mod ack;
pub mod command;
pub mod gateway;
pub mod token;

pub use ack::AckVerb;
pub use command::Command;
pub use gateway::GatewayProgramBuilder;
pub use token::Token;
