pub mod classify;
pub mod config;
pub mod domain;
pub mod errors;
pub mod premium;

pub use classify::{Classification, ResponseClassifier, SurchargePhraseClassifier};
pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat, NegotiationSettings};
pub use domain::credentials::Credentials;
pub use domain::negotiation::{AttemptContext, NegotiationParameters, NegotiationResult};
pub use domain::proposal::{AccountCode, Proposal, ProposalGroup, ProposalId};
pub use errors::{AuthenticationError, SessionError};
pub use premium::{minimum_premium, PremiumError};
