pub mod categories;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod products;
mod serde_util;
pub mod store;
pub mod variants;

pub use categories::{CategoryRecord, TargetCategory};
pub use client::{DirectusClient, DirectusConfig};
pub use error::StoreError;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryStore, Operation};
pub use products::{ProductRecord, TargetProduct};
pub use store::{Collection, ItemQuery, TargetStore};
pub use variants::{TargetVariant, VariantRecord};
