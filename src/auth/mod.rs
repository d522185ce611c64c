// Authentication: session tokens, the request gate and its HTTP adapter

pub mod audit_logger;
pub mod auth_middleware;
pub mod fingerprint;
pub mod interceptor;
pub mod password;
pub mod stream;
pub mod token;
