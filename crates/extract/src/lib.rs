pub mod extractor;
pub mod hash;

pub use extractor::{
    DocumentExtractor, ExtractError, Extraction, FixedExtractor, PlaceholderExtractor,
};
pub use hash::document_digest;
