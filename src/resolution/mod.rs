//! Citation data model and the resolver contract.

pub mod doi;
pub mod http;
mod model;
pub mod resolver;

pub use doi::*;
pub use http::DoiResolver;
pub use model::*;
pub use resolver::Resolver;
