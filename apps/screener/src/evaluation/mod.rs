// Resume evaluation: prompt construction, response interpretation, the
// pipeline tying them to extraction and the model, and the HTTP handlers.
// All model calls go through llm_client; no direct API calls here.

pub mod handlers;
pub mod interpreter;
pub mod pipeline;
pub mod prompts;
