pub mod assemble;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod transcode;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;
