// Résumé ingestion: document decoding, text normalization and the
// end-to-end upload pipeline that feeds scoring, extraction and sync.

pub mod decoder;
pub mod handlers;
pub mod normalizer;
pub mod pipeline;
