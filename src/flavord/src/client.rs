//! Blocking client for the flavor plugin socket.

use crate::protocol::{FlavorCommand, InterfaceSpec, ResponseData, WireError, WireMessage};
use kube_flavor::{AllocationMethod, Health, InstanceDescription, InstanceSpec};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("plugin error: {0}")]
    Plugin(WireError),
}

/// Wraps a bidirectional stream speaking the NDJSON flavor protocol.
#[derive(Debug)]
pub struct FlavorClient<S: Read + Write> {
    reader: BufReader<S>,
}

impl FlavorClient<std::os::unix::net::UnixStream> {
    pub fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        Ok(Self::new(std::os::unix::net::UnixStream::connect(
            socket_path,
        )?))
    }
}

impl<S: Read + Write> FlavorClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }

    /// Send a command and read its single response line.
    pub fn send_command(&mut self, command: &FlavorCommand) -> Result<ResponseData, ClientError> {
        let mut line = serde_json::to_vec(command)
            .map_err(|e| ClientError::Protocol(format!("serialize command: {}", e)))?;
        line.push(b'\n');

        let stream = self.reader.get_mut();
        stream.write_all(&line)?;
        stream.flush()?;

        let mut response = String::new();
        if self.reader.read_line(&mut response)? == 0 {
            return Err(ClientError::Protocol("connection closed".into()));
        }

        match serde_json::from_str::<WireMessage>(response.trim_end())
            .map_err(|e| ClientError::Protocol(format!("deserialize response: {}", e)))?
        {
            WireMessage::Ok { data } => Ok(data),
            WireMessage::Error(e) => Err(ClientError::Plugin(e)),
        }
    }

    pub fn implements(&mut self) -> Result<Vec<InterfaceSpec>, ClientError> {
        match self.send_command(&FlavorCommand::Implements)? {
            ResponseData::Interfaces(interfaces) => Ok(interfaces),
            other => Err(unexpected(other)),
        }
    }

    pub fn validate(
        &mut self,
        properties: serde_json::Value,
        allocation: AllocationMethod,
    ) -> Result<(), ClientError> {
        self.expect_unit(&FlavorCommand::Validate {
            properties,
            allocation,
        })
    }

    pub fn healthy(
        &mut self,
        properties: serde_json::Value,
        instance: InstanceDescription,
    ) -> Result<Health, ClientError> {
        match self.send_command(&FlavorCommand::Healthy {
            properties,
            instance,
        })? {
            ResponseData::Health(health) => Ok(health),
            other => Err(unexpected(other)),
        }
    }

    pub fn drain(
        &mut self,
        properties: serde_json::Value,
        instance: InstanceDescription,
    ) -> Result<(), ClientError> {
        self.expect_unit(&FlavorCommand::Drain {
            properties,
            instance,
        })
    }

    pub fn prepare(
        &mut self,
        properties: serde_json::Value,
        spec: InstanceSpec,
        allocation: AllocationMethod,
    ) -> Result<InstanceSpec, ClientError> {
        match self.send_command(&FlavorCommand::Prepare {
            properties,
            spec,
            allocation,
        })? {
            ResponseData::Spec(spec) => Ok(spec),
            other => Err(unexpected(other)),
        }
    }

    fn expect_unit(&mut self, command: &FlavorCommand) -> Result<(), ClientError> {
        match self.send_command(command)? {
            ResponseData::Unit => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(data: ResponseData) -> ClientError {
    ClientError::Protocol(format!("unexpected response: {:?}", data))
}
