//! Financial Chat Assistant
//!
//! A conversational assistant for personal finance questions aimed at Indian
//! users. Each exchange runs a bounded tool-calling loop against a language
//! model, with live data from public sources:
//! - Web search for news, rates and scheme updates
//! - Gold rates aggregated from search results
//! - Stock quotes (NSE by default)
//! - Cryptocurrency prices in INR and USD
//! - Mutual fund NAVs by AMFI scheme code
//!
//! LOOP:
//! MESSAGE → MODEL → TOOL CALLS → RESULTS → MODEL → ... → ANSWER

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod fetchers;
pub mod llm;
pub mod memory;
pub mod models;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use models::*;
