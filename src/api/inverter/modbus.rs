use std::time::Duration;

use async_trait::async_trait;
use itertools::Itertools;
use tokio::{
    net::{TcpStream, lookup_host},
    time::timeout,
};
use tokio_modbus::{
    Slave,
    client::{Client, Context, Reader, Writer, tcp::attach_slave},
};

use crate::{
    api::inverter::transport::{Connect, DeviceCommunicationError, RegisterKind, Session},
    prelude::*,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Modbus TCP endpoint of the inverter, usually behind a serial gateway.
pub struct ModbusConnector {
    /// `host:port`.
    pub address: String,

    pub slave_id: u8,
}

#[async_trait]
impl Connect for ModbusConnector {
    #[instrument(skip_all, fields(address = %self.address, slave_id = self.slave_id))]
    async fn connect(&self) -> Result<Box<dyn Session>, DeviceCommunicationError> {
        debug!("connecting…");
        let addresses = lookup_host(&self.address)
            .await
            .map_err(|error| {
                DeviceCommunicationError::Resolve(format!("{}: {error}", self.address))
            })?
            .collect_vec();
        if addresses.is_empty() {
            return Err(DeviceCommunicationError::Resolve(self.address.clone()));
        }
        let tcp_stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(&*addresses))
            .await
            .map_err(|_| DeviceCommunicationError::Timeout("connecting"))?
            .map_err(|error| DeviceCommunicationError::Transport(error.to_string()))?;
        tcp_stream
            .set_nodelay(true)
            .map_err(|error| DeviceCommunicationError::Transport(error.to_string()))?;
        debug!("connected");
        Ok(Box::new(ModbusSession(attach_slave(tcp_stream, Slave(self.slave_id)))))
    }
}

struct ModbusSession(Context);

#[async_trait]
impl Session for ModbusSession {
    #[instrument(skip_all, level = "debug", fields(?kind, address, n_words))]
    async fn read(
        &mut self,
        kind: RegisterKind,
        address: u16,
        n_words: u16,
    ) -> Result<Vec<u16>, DeviceCommunicationError> {
        let response = match kind {
            RegisterKind::Input => {
                timeout(REQUEST_TIMEOUT, self.0.read_input_registers(address, n_words)).await
            }
            RegisterKind::Holding => {
                timeout(REQUEST_TIMEOUT, self.0.read_holding_registers(address, n_words)).await
            }
        }
        .map_err(|_| DeviceCommunicationError::Timeout("reading"))?;
        unwrap_response(address, response)
    }

    #[instrument(skip_all, level = "debug", fields(address, n_words = words.len()))]
    async fn write(&mut self, address: u16, words: &[u16]) -> Result<(), DeviceCommunicationError> {
        let response = timeout(REQUEST_TIMEOUT, self.0.write_multiple_registers(address, words))
            .await
            .map_err(|_| DeviceCommunicationError::Timeout("writing"))?;
        unwrap_response(address, response)
    }

    async fn disconnect(&mut self) -> Result<(), DeviceCommunicationError> {
        self.0
            .disconnect()
            .await
            .map_err(|error| DeviceCommunicationError::Transport(error.to_string()))
    }
}

/// Flatten the transport and the Modbus exception layers.
fn unwrap_response<T>(
    address: u16,
    response: tokio_modbus::Result<T>,
) -> Result<T, DeviceCommunicationError> {
    response
        .map_err(|error| DeviceCommunicationError::Transport(error.to_string()))?
        .map_err(|code| DeviceCommunicationError::Exception { address, code: format!("{code:?}") })
}
