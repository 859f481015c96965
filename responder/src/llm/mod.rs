pub mod http;
pub mod mock;
pub mod mood;

pub use http::HttpModelClient;
pub use mock::{RecordedCall, ScriptedModelClient};
pub use mood::infer_mood;
