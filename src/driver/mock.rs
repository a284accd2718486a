//! Scriptable in-memory driver for unit tests.

use crate::driver::types::{BaudRate, ConnectionId, DataType, StreamFormat};
use crate::driver::Driver;
use crate::poll::Shutdown;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::os::raw::c_int;

/// Every call the mock received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    DriverVersion,
    NewConnectionId,
    Connect {
        id: c_int,
        port: String,
        baud: BaudRate,
        format: StreamFormat,
    },
    ReadPackets {
        id: c_int,
        count: c_int,
    },
    GetValue {
        id: c_int,
        data_type: DataType,
    },
    Disconnect(c_int),
    FreeConnection(c_int),
}

pub struct MockDriver {
    pub connection_id: c_int,
    pub connect_status: c_int,
    pub values: HashMap<DataType, f32>,
    /// Results for successive `read_packets` calls.
    packets: RefCell<VecDeque<c_int>>,
    /// Triggered once `packets` is exhausted.
    shutdown_when_drained: Option<Shutdown>,
    /// Triggered from inside `connect`, as an interrupt during the call would.
    shutdown_on_connect: Option<Shutdown>,
    calls: RefCell<Vec<Call>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            connection_id: 3,
            connect_status: 0,
            values: HashMap::new(),
            packets: RefCell::new(VecDeque::new()),
            shutdown_when_drained: None,
            shutdown_on_connect: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_value(mut self, data_type: DataType, value: f32) -> Self {
        self.values.insert(data_type, value);
        self
    }

    pub fn with_packets(self, script: &[c_int], shutdown: &Shutdown) -> Self {
        self.packets.borrow_mut().extend(script.iter().copied());
        Self {
            shutdown_when_drained: Some(shutdown.clone()),
            ..self
        }
    }

    pub fn interrupt_during_connect(self, shutdown: &Shutdown) -> Self {
        Self {
            shutdown_on_connect: Some(shutdown.clone()),
            ..self
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Driver for MockDriver {
    fn driver_version(&self) -> c_int {
        self.record(Call::DriverVersion);
        21
    }

    fn new_connection_id(&self) -> ConnectionId {
        self.record(Call::NewConnectionId);
        ConnectionId::new(self.connection_id)
    }

    fn connect(
        &self,
        id: ConnectionId,
        port: &CStr,
        baud: BaudRate,
        format: StreamFormat,
    ) -> c_int {
        self.record(Call::Connect {
            id: id.raw(),
            port: port.to_string_lossy().into_owned(),
            baud,
            format,
        });
        if let Some(ref shutdown) = self.shutdown_on_connect {
            shutdown.trigger();
        }
        self.connect_status
    }

    fn read_packets(&self, id: ConnectionId, count: c_int) -> c_int {
        self.record(Call::ReadPackets {
            id: id.raw(),
            count,
        });
        let mut packets = self.packets.borrow_mut();
        let read = packets.pop_front().unwrap_or(0);
        if packets.is_empty() {
            if let Some(ref shutdown) = self.shutdown_when_drained {
                shutdown.trigger();
            }
        }
        read
    }

    fn get_value(&self, id: ConnectionId, data_type: DataType) -> f32 {
        self.record(Call::GetValue {
            id: id.raw(),
            data_type,
        });
        self.values.get(&data_type).copied().unwrap_or(0.0)
    }

    fn disconnect(&self, id: ConnectionId) -> c_int {
        self.record(Call::Disconnect(id.raw()));
        0
    }

    fn free_connection(&self, id: ConnectionId) {
        self.record(Call::FreeConnection(id.raw()));
    }
}
