//! Browser Interaction Contract runtime.
//!
//! The protocol itself lives in the member crates; this crate wires them into a tool host
//! with configuration and a CLI.

pub mod config;
pub mod errors;
pub mod tools;

pub use bic_action_gate as action_gate;
pub use bic_browser_driver as driver;
pub use bic_contract as contract;
pub use bic_perceiver as perceiver;
pub use bic_session_store as session_store;

pub use config::{load_config, LoadedConfig, ObserveDefaults, RuntimeConfig};
pub use errors::ToolHostError;
pub use tools::{BrowserToolHost, CdpDriverFactory, DriverFactory, ToolDescriptor, ToolResult};
