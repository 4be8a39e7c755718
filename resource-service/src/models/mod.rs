pub mod document;
pub mod search;
pub mod session;
pub mod subject;

pub use document::{Document, DocumentFields, DocumentLocation};
pub use search::{SearchFacets, SearchQuery};
pub use session::Session;
pub use subject::Subject;
