pub mod corpus;
pub mod qdrant;

pub use corpus::JsonCaseStore;
pub use qdrant::{CollectionInfo, QdrantStore};
