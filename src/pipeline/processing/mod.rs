// Pipeline processing: parsing helpers, scoring, normalization, enrichment and comparison

pub mod compare;
pub mod enrich;
pub mod normalize;
pub mod numeric;
pub mod scoring;
pub mod summary;
