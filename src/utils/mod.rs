pub mod file_detection;
#[cfg(test)]
pub mod test_helpers;
