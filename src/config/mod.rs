pub mod agent;
pub mod ai;

pub use agent::{load_config_default, load_config_from, AgentConfig, FeedSource, SelectionStrategy};
pub use ai::Credential;
