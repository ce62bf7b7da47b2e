//! Minibank CLI library: the GraphQL gateway and logging setup, shared by
//! the `minibank` binary and the gateway tests.

pub mod gateway;
pub mod logging;
