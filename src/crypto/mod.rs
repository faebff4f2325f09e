pub mod password;

pub use password::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Wrong password")]
    WrongPassword,

    #[error("Corrupted password record")]
    CorruptedRecord,
}
