// Plan / apply / bootstrap of the host configuration
pub mod configure;

// Recorded state inspection
pub mod state;
