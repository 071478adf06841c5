pub mod error;
pub mod schema;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod utils;
