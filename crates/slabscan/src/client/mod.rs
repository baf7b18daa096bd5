//! Submission client: image intake, session state machine, relay
//! transport, and the rendering model.

pub mod encode;
pub mod http;
pub mod session;
pub mod view;

pub use encode::{encode_image_file, SelectedImage};
pub use http::{ChunkStream, RelayClient};
pub use session::{AnalysisSession, SessionPhase, SessionSnapshot};
pub use view::{batch_view, render_lines, BatchView, CardStatus, CardView, FieldProgress};
