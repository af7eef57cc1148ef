pub mod dest;
pub mod index;
pub mod s3;
pub mod store;

pub use dest::{Destination, InvalidDestination};
pub use index::{build_index, ListError, RemoteIndex};
pub use s3::S3Store;
pub use store::{ListPage, ObjectStore, PutBody, RemoteObject};
