//! Browser driver layer.
//!
//! [`BrowserDriver`] is the only surface the protocol core uses to reach a browser. Two
//! implementations exist: [`CdpDriver`] talks to Chromium over the DevTools protocol and
//! [`MockDriver`] replays canned page states for tests.

pub mod cdp;
pub mod config;
pub mod downloads;
pub mod driver;
pub mod errors;
pub mod mock;
pub mod scripts;
pub mod transport;
pub mod types;
pub mod util;

pub use cdp::CdpDriver;
pub use config::{detect_chrome_executable, CdpConfig};
pub use driver::BrowserDriver;
pub use errors::{DriverError, DriverErrorKind, DriverResult};
pub use mock::MockDriver;
pub use transport::{CdpTransport, ChromiumTransport, CommandTarget, TransportEvent};
pub use types::{
    is_interactive_role, ActRequest, DownloadInfo, DownloadState, DriverAction, DriverTarget,
    ElementTarget, LaunchOptions, RawAxNode, RawDomNode, RawSnapshot, SnapshotRequest,
    INTERACTIVE_ROLES,
};
