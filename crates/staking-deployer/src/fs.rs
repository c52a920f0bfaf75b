use std::fs;

use crate::error::DeployerError;

// Reads compiled artifacts, swapped out in tests
pub trait FileReader {
    fn read(&self, path: &str) -> Result<Vec<u8>, DeployerError>;
}

pub struct DefaultFileReader;

impl FileReader for DefaultFileReader {
    fn read(&self, path: &str) -> Result<Vec<u8>, DeployerError> {
        fs::read(path).map_err(|e| DeployerError::FileReadError(format!("{}: {}", path, e)))
    }
}
