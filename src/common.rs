pub mod db_utils;
pub mod error;
pub mod pagination;
pub mod response;
pub mod validation;

#[cfg(test)]
pub mod test_support;
