pub mod base;
pub mod configs;
pub mod mistral;
pub mod utils;

#[cfg(test)]
pub mod mock;
