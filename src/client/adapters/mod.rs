pub mod arxiv;
pub mod crossref;
pub mod openalex;
pub mod pubmed;
pub mod semantic_scholar;
pub mod traits;

pub use arxiv::ArxivAdapter;
pub use crossref::CrossrefAdapter;
pub use openalex::OpenalexAdapter;
pub use pubmed::PubmedAdapter;
pub use semantic_scholar::SemanticScholarAdapter;
pub use traits::{AdapterError, DatabaseAdapter};
