mod capacity;
mod decoding;
mod encoding;

pub use capacity::{calculate_bucket_capacity, MAX_DIRECTORY_DEPTH, MAX_HEADER_DEPTH};
pub use decoding::{deserialize_bucket, deserialize_directory, deserialize_header};
pub use encoding::{serialize_bucket, serialize_directory, serialize_header};
