use async_trait::async_trait;

use crate::{
    api::inverter::transport::{Connect, DeviceCommunicationError, RegisterKind, Session},
    prelude::*,
};

/// Passes the reads through to the wrapped device and swallows the writes.
pub struct DryRun<C>(pub C);

#[async_trait]
impl<C: Connect> Connect for DryRun<C> {
    async fn connect(&self) -> Result<Box<dyn Session>, DeviceCommunicationError> {
        Ok(Box::new(DryRunSession(self.0.connect().await?)))
    }
}

struct DryRunSession(Box<dyn Session>);

#[async_trait]
impl Session for DryRunSession {
    async fn read(
        &mut self,
        kind: RegisterKind,
        address: u16,
        n_words: u16,
    ) -> Result<Vec<u16>, DeviceCommunicationError> {
        self.0.read(kind, address, n_words).await
    }

    async fn write(&mut self, address: u16, words: &[u16]) -> Result<(), DeviceCommunicationError> {
        info!(address, ?words, "dry run, skipping the write");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DeviceCommunicationError> {
        self.0.disconnect().await
    }
}
