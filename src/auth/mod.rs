pub mod gate;
pub mod jwt;

pub use gate::{authorize, AccessDenied, Capability};
pub use jwt::JwtValidator;
