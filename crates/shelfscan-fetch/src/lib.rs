pub mod challenge;
pub mod error;
pub mod fetcher;
pub mod rendered;
pub mod retry;
pub mod session;
pub mod structured;
pub mod types;

pub use challenge::{ChallengeGate, ChallengeKind, ConfirmationSource, NotifySource};
pub use error::FetchError;
pub use fetcher::{RenderedSource, StructuredSource};
pub use rendered::RenderedFetcher;
pub use session::{SessionState, SessionStore};
pub use structured::StructuredClient;
