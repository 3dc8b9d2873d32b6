//! These models represent the objects passed around by the agent loop
//!
//! There are a few related formats we need to interact with:
//! - the HTTP request bodies the server accepts, sent from callers to the agent
//! - mistral (openai compatible) messages/tools, sent from the agent to the LLM
//! - tool calls and their results, exchanged between the agent and the registry
//!
//! We always immediately convert the wire formats into these internal structs
//! at the boundary, so tool arguments are decoded JSON everywhere past the
//! provider rather than opaque strings.
pub mod message;
pub mod role;
pub mod tool;
