//! HTTP module for the SkillUp client
//!
//! Every backend call passes through the same stages: bearer attach,
//! 401 recovery, error normalization and request/response logging.

mod client;
pub mod logging;
pub mod normalize;
mod refresh;
mod transport;

pub use client::ApiClient;
pub use refresh::{RefreshCoordinator, TokenRefresher};
pub use transport::{ApiRequest, ApiResponse, FilePart, HttpTransport};
