pub mod category;
pub mod collection;
pub mod package;
pub mod options;
pub mod manifest;
pub mod config;
pub mod cli;

pub use collection::{Classifier, Collection, CollectionSet};
pub use manifest::{DestinationBatch, ManifestBuilder, ManifestWriter, SourceEntry};
pub use options::ManifestOptions;
