//! Text-generation backend clients

pub mod generate;

// Re-export for convenience
pub use generate::GenerateClient;
