pub mod collection;
pub mod index;
pub mod partition;

pub use collection::{Collection, CollectionOptions};
pub use index::Index;
pub use partition::Partition;
