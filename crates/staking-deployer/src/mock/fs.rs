use crate::error::DeployerError;
use crate::fs::FileReader;
use std::cell::RefCell;

pub struct MockFileReader {
    mock_data: RefCell<Result<Vec<u8>, DeployerError>>,
}

impl MockFileReader {
    pub fn new(mock_data: Result<Vec<u8>, DeployerError>) -> Self {
        MockFileReader {
            mock_data: RefCell::new(mock_data),
        }
    }
}

impl FileReader for MockFileReader {
    fn read(&self, _path: &str) -> Result<Vec<u8>, DeployerError> {
        self.mock_data.borrow().clone()
    }
}
