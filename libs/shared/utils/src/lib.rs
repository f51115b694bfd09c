pub mod extractor;
pub mod jwt;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod time;
