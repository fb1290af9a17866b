//! PaperScout core: query sanitation, search planning (deterministic and
//! agentic), multi-query execution, weighted aggregation, and grounded
//! synthesis over a literature search provider.

pub mod agent;
pub mod aggregate;
pub mod api;
pub mod app;
pub mod config;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod planner;
pub mod provider;
pub mod sanitize;
pub mod summarize;
pub mod synthesis;
