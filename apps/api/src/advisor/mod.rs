//! Resume analysis and career-advice chat, both proxied through the LLM
//! client.

pub mod handlers;
pub mod prompts;
