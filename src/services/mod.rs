mod extractor;

pub use extractor::{normalize_url, parse_document, Extracted, Extractor, HtmlExtractor};
