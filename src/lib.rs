pub mod admission;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod queue;
pub mod runtime;
pub mod traffic;

#[cfg(test)]
mod test;
