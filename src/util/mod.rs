pub mod logging;
pub mod runtime;
