//! Wire format types for the upstream chat-completions API
//!
//! Pure serde structs matching the OpenAI/Azure OpenAI JSON format. They are
//! only used at the upstream boundary and as the relayed chunk shape.

pub mod openai;
