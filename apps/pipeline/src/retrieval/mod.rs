pub mod chunking;
pub mod embedding;
pub mod index;
pub mod retriever;
pub mod similarity;
