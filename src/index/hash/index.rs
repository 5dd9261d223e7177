mod base;
mod insert;
mod remove;

pub use base::ExtendibleHashIndex;
