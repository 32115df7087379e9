pub mod backoff;
pub mod logging;
