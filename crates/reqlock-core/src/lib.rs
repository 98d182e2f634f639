mod error;
mod name;
mod requirement;
mod source;
mod specifier;

pub use error::ResolveError;
pub use name::{canonical_name, validate_package_name};
pub use requirement::Requirement;
pub use source::{SourceKind, SourceLocator};
pub use specifier::SpecifierSet;
