mod directory;
mod local;
mod metadata;

pub use directory::DirectoryRepository;
pub use local::LocalPinsRepository;
pub use metadata::{ReleaseMetadata, SourceMap};

#[cfg(test)]
mod tests;
