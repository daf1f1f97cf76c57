//! Context assembly: selected, sanitized records rendered into a bounded
//! markdown document for a model call.

pub mod builder;
pub mod format;

pub use builder::{
    estimate_tokens, ContextBuilder, ContextDocument, ContextSection, SectionKind,
    CHARS_PER_TOKEN, DEFAULT_TOKEN_BUDGET, NO_REQUESTS_MESSAGE, TRUNCATION_NOTICE,
};
pub use format::BODY_CHAR_LIMIT;
