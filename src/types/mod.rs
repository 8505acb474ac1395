//! Public types for the Maitre API.

mod inference;
mod record;
mod tool;

pub use inference::{Embedding, cosine_similarity};
pub use record::{Record, parse_records};
pub use tool::{ToolDefinition, ToolMatch, parse_tools};
