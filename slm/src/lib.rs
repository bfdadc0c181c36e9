pub mod embedding;
pub mod lightweight;
pub mod ner;
pub mod registry;

pub use embedding::{BagOfWordsEmbedder, Embedder, EmbeddingError};
pub use ner::{Entity, EntityExtractor, ExtractionError, MockEntityExtractor};
pub use registry::{ModelRegistry, RegistryError, ResolvedModel};
