pub mod agent_client;
pub mod consensus_parser;
pub mod prompt_builder;
pub mod protocol;
pub mod scheduler;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
