pub mod analyzer;
pub mod bot;
pub mod discovery;
pub mod filter;
pub mod forum;
pub mod normalize;
pub mod pacer;
pub mod search;
pub mod similarity;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod validate;
