//! Eviction policies.

mod fifo;

pub use fifo::FifoReplacer;
