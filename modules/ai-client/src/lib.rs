pub mod openai;
pub mod util;

pub use openai::{OpenAi, StructuredOutput};
