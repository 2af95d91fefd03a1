// API handlers - thin HTTP orchestration layer
// Handlers only deal with HTTP concerns:
// 1. Extract parameters from request
// 2. Authenticate the caller into a Principal
// 3. Call domain logic
// 4. Transform domain result to HTTP response

pub mod shares;
pub mod status;
pub mod verify;

pub use shares::{create_share_handler, get_share_handler, update_share_handler};
pub use status::{get_status_handler, query_status_handler, record_status_handler};
pub use verify::{verify_artifact_handler, verify_token_handler};
