pub mod discover;
pub mod verify;

pub use discover::{DiscoverInput, DiscoverResponse, DiscoverTool};
pub use verify::{VerifyInput, VerifyReport, VerifyTool};
