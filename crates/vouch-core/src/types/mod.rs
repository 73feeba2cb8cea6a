pub mod block;
pub mod execution;
