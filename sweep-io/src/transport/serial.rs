//! Serial port source

use super::{ByteSource, ByteStream};
use crate::config::SerialConfig;
use crate::error::{Error, Result};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::time::Duration;

/// UART-attached sensor
pub struct SerialSource {
    config: SerialConfig,
    timeout: Duration,
}

impl SerialSource {
    /// # Arguments
    /// * `config` - Port path and baud rate
    /// * `timeout` - Blocking read timeout applied to every opened port
    pub fn new(config: SerialConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

impl ByteSource for SerialSource {
    fn name(&self) -> String {
        self.config.port.clone()
    }

    fn open(&mut self) -> Result<ByteStream> {
        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()
            .map_err(|e| Error::unavailable(&self.config.port, e))?;

        log::info!(
            "Opened serial port: {} at {} baud",
            self.config.port,
            self.config.baud_rate
        );

        Ok(Box::new(port))
    }
}
