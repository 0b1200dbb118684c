pub mod error;
pub mod fetch;
pub mod handlers;
pub mod jobs;
pub mod pipeline;
pub mod query;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use jobs::{JobRegistry, JobSummary};
pub use query::{Answer, Hit, QueryEngine, Snippet, Summary};
pub use routes::create_router;
pub use state::AppState;
