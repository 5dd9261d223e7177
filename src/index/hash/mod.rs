pub mod error;
pub mod hasher;
pub mod index;
pub mod page;
pub mod serialization;

pub use error::HashIndexError;
pub use hasher::{DefaultKeyHasher, KeyHasher};
pub use index::ExtendibleHashIndex;
pub use page::{HashBucketPage, HashDirectoryPage, HashHeaderPage};
pub use serialization::{
    calculate_bucket_capacity, deserialize_bucket, deserialize_directory, deserialize_header,
    serialize_bucket, serialize_directory, serialize_header,
};
