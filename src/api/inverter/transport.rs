use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum DeviceCommunicationError {
    #[error("failed to resolve `{0}`")]
    Resolve(String),

    #[error("timed out while {0}")]
    Timeout(&'static str),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("the device responded with `{code}` to the request at #{address}")]
    Exception { address: u16, code: String },

    #[error("read {actual} words from #{address} while expected {expected}")]
    ShortRead { address: u16, expected: usize, actual: usize },

    #[error("unexpected value at #{address}: {reason}")]
    Malformed { address: u16, reason: String },
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum RegisterKind {
    Input,
    Holding,
}

/// Opens device sessions.
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>, DeviceCommunicationError>;
}

/// One connection to the device, to be disconnected before the next one opens.
#[async_trait]
pub trait Session: Send {
    async fn read(
        &mut self,
        kind: RegisterKind,
        address: u16,
        n_words: u16,
    ) -> Result<Vec<u16>, DeviceCommunicationError>;

    async fn write(&mut self, address: u16, words: &[u16]) -> Result<(), DeviceCommunicationError>;

    async fn disconnect(&mut self) -> Result<(), DeviceCommunicationError>;
}
