//! Deep research job lifecycle
//!
//! A research request becomes a persisted job that is executed off the
//! request path:
//! - `template` - named presets for depth/breadth
//! - `client` - the remote research engine call
//! - `enhancer` - executive summary and recommendations
//! - `store` - durable job records and status transitions
//! - `spawner` - the detached execution primitive
//! - `service` - `DeepResearchService`, which ties them together

pub mod client;
pub mod enhancer;
pub mod service;
pub mod spawner;
pub mod store;
pub mod template;

pub use client::{HttpResearchClient, RawResearch, ResearchEngine, ResearchEngineError};
pub use enhancer::{EnhancementContext, ResultEnhancer, TemplateEnhancer};
pub use service::{DeepResearchService, InitiateResearch};
pub use spawner::{TaskSpawner, TokioSpawner};
pub use store::{InMemoryResearchStore, PgResearchStore, ResearchStore};
pub use template::{parameters_for_template, ResearchParameters, ResearchTemplate};
