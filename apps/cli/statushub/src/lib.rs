// Library exports for testing
// The binary (main.rs) imports these as well

pub mod device_pair;
pub mod error;
pub mod logger;
