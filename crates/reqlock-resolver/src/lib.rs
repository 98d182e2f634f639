mod merge;
mod repository;
mod resolve;
mod types;

pub use merge::merge;
pub use repository::{require_expandable, require_hashable, Repository};
pub use resolve::{compile, Resolver, DEFAULT_MAX_ROUNDS};
pub use types::{ResolutionResult, ResolvedRequirement};
