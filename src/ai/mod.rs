pub mod gemini;
pub mod instructions;
pub mod keys;

pub use gemini::{
    field_prompt,
    GeminiClient,
};
pub use instructions::InstructionStore;
pub use keys::{
    ApiKeyStore,
    FileKeyStore,
    GEMINI_API_KEY,
};
