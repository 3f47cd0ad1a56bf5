use tessera_core::StoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("watch queue is closed")]
    Closed,
}

impl From<BusError> for StoreError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Closed => StoreError::Closed,
        }
    }
}

pub type Result<T> = std::result::Result<T, BusError>;
