pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod relay;
pub mod schema;
pub mod secrets;
pub mod stream;

pub use client::{AnalysisSession, RelayClient, SelectedImage, SessionPhase, SessionSnapshot};
pub use config::{load_config, load_config_from_str, Config};
pub use error::{
    ConfigError, EncodeError, ProviderError, Result, SessionError, SlabscanError,
};
pub use provider::{AnalysisRequest, CardAnalyzer, GeminiClient, ImageData, ObjectStream};
pub use relay::{create_router, AppState};
pub use schema::{CardBatch, CardRecord};
pub use stream::{PartialBatch, PartialCardRecord, StreamDecoder};
