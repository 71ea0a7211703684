//! Compute backend selection with batched error reporting.
//!
//! Backend calls never fail immediately. Each failure is appended to the
//! device's message list, and [`Device::check_errors`] turns a non-empty list
//! into one [`DeviceError`] carrying every message.

use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Error text returned by a backend call.
pub type BackendError = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    pub name: String,
    /// Number of worker threads available for data-parallel kernels.
    pub threads: usize,
}

/// Minimal surface of a compute runtime.
pub trait Backend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn current_device(&self) -> Result<usize, BackendError>;
    fn device_count(&self) -> Result<usize, BackendError>;
    fn device_properties(&self, id: usize) -> Result<DeviceProperties, BackendError>;
    fn set_device(&self, id: usize) -> Result<(), BackendError>;
}

/// The host CPU, exposed as a single device.
#[derive(Debug, Clone, Default)]
pub struct HostBackend {
    threads: Option<usize>,
}

impl HostBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts kernels to `threads` worker threads.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
        }
    }

    fn check_ordinal(&self, id: usize) -> Result<(), BackendError> {
        if id == 0 {
            Ok(())
        } else {
            Err(format!("invalid device ordinal {id} (the host exposes one device)"))
        }
    }
}

impl Backend for HostBackend {
    fn name(&self) -> &str {
        "host"
    }

    fn current_device(&self) -> Result<usize, BackendError> {
        Ok(0)
    }

    fn device_count(&self) -> Result<usize, BackendError> {
        Ok(1)
    }

    fn device_properties(&self, id: usize) -> Result<DeviceProperties, BackendError> {
        self.check_ordinal(id)?;
        let threads = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        Ok(DeviceProperties {
            name: "host CPU".to_string(),
            threads,
        })
    }

    fn set_device(&self, id: usize) -> Result<(), BackendError> {
        self.check_ordinal(id)
    }
}

/// Every backend failure collected up to one checkpoint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Error in {context}:\n\n{}", .messages.join("\n"))]
pub struct DeviceError {
    pub context: String,
    pub messages: Vec<String>,
}

/// A compute device bound to one backend and device id.
///
/// A `Device` only exists if its construction checkpoint passed.
pub struct Device {
    backend: Box<dyn Backend>,
    id: usize,
    count: usize,
    properties: Option<DeviceProperties>,
    errors: Vec<String>,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("backend", &self.backend.name())
            .field("id", &self.id)
            .field("count", &self.count)
            .field("properties", &self.properties)
            .field("errors", &self.errors)
            .finish()
    }
}

impl Device {
    /// Binds the backend's current device.
    pub fn new(backend: impl Backend + 'static) -> Result<Self, DeviceError> {
        let mut errors = Vec::new();
        let id = record(&mut errors, "Getting the device ID", backend.current_device())
            .unwrap_or(0);
        Self::bind(Box::new(backend), id, errors)
    }

    pub fn with_id(backend: impl Backend + 'static, id: usize) -> Result<Self, DeviceError> {
        Self::bind(Box::new(backend), id, Vec::new())
    }

    fn bind(backend: Box<dyn Backend>, id: usize, mut errors: Vec<String>) -> Result<Self, DeviceError> {
        let count = record(&mut errors, "Getting the device count", backend.device_count())
            .unwrap_or(0);
        if id >= count {
            errors.push(format!(
                "The device ID is out of range. The device ID is {id} and the device count is {count}"
            ));
        }
        let properties = record(
            &mut errors,
            "Getting the device properties",
            backend.device_properties(id),
        );
        record(
            &mut errors,
            &format!("Setting the device with the device ID {id}"),
            backend.set_device(id),
        );

        #[cfg(feature = "parallel")]
        let pool = match &properties {
            Some(props) => record(
                &mut errors,
                "Creating the worker thread pool",
                rayon::ThreadPoolBuilder::new()
                    .num_threads(props.threads)
                    .build()
                    .map_err(|e| e.to_string()),
            ),
            None => None,
        };

        let device = Self {
            backend,
            id,
            count,
            properties,
            errors,
            #[cfg(feature = "parallel")]
            pool,
        };
        device.check_errors("Device initialization")?;
        info!(
            backend = device.backend.name(),
            id = device.id,
            count = device.count,
            "Device bound."
        );
        Ok(device)
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn device_count(&self) -> usize {
        self.count
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn properties(&self) -> Option<&DeviceProperties> {
        self.properties.as_ref()
    }

    /// Appends a failed backend call to the pending error list.
    pub fn record_error(&mut self, action: &str, error: BackendError) {
        self.errors.push(failure_message(action, &error));
    }

    /// Fails with every pending message if any backend call failed.
    pub fn check_errors(&self, context: &str) -> Result<(), DeviceError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        debug!(context, count = self.errors.len(), "Device errors pending.");
        Err(DeviceError {
            context: context.to_string(),
            messages: self.errors.clone(),
        })
    }

    /// Runs `op` on the device's worker threads.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            return pool.install(op);
        }
        op()
    }
}

fn failure_message(action: &str, error: &str) -> String {
    format!("{action} failed with the following error:\n\n{error}")
}

fn record<T>(errors: &mut Vec<String>, action: &str, result: Result<T, BackendError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(failure_message(action, &e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct BrokenBackend;

    impl Backend for BrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }
        fn current_device(&self) -> Result<usize, BackendError> {
            Err("no current context".to_string())
        }
        fn device_count(&self) -> Result<usize, BackendError> {
            Err("driver not loaded".to_string())
        }
        fn device_properties(&self, _id: usize) -> Result<DeviceProperties, BackendError> {
            Err("driver not loaded".to_string())
        }
        fn set_device(&self, _id: usize) -> Result<(), BackendError> {
            Err("driver not loaded".to_string())
        }
    }

    #[test]
    fn host_device_binds_id_zero() {
        let device = Device::new(HostBackend::with_threads(2)).unwrap();
        assert_eq!(device.id(), 0);
        assert_eq!(device.device_count(), 1);
        assert_eq!(device.backend_name(), "host");
        assert_eq!(device.properties().map(|p| p.threads), Some(2));
        assert!(device.check_errors("pre-step").is_ok());
    }

    #[test]
    fn out_of_range_id_yields_one_aggregated_error() {
        let err = Device::with_id(HostBackend::new(), 3).unwrap_err();
        let message = err.to_string();

        assert_eq!(err.context, "Device initialization");
        assert!(message.starts_with("Error in Device initialization:\n\n"));
        assert!(message.contains("out of range"));
        assert!(message.contains("The device ID is 3 and the device count is 1"));
        assert!(message.contains("invalid device ordinal 3"));
        assert!(message.contains("Setting the device with the device ID 3 failed with the following error"));
        assert_eq!(err.messages.len(), 3);
    }

    #[test]
    fn every_failing_backend_call_is_reported() {
        let err = Device::new(BrokenBackend).unwrap_err();
        assert!(err.messages[0].starts_with("Getting the device ID failed"));
        assert!(err.messages[1].starts_with("Getting the device count failed"));
        assert!(err.messages.iter().any(|m| m.contains("out of range")));
        assert!(err.messages.iter().all(|m| !m.is_empty()));
        assert_eq!(err.messages.len(), 5);
    }

    #[test]
    fn recorded_errors_surface_at_next_checkpoint() {
        let mut device = Device::new(HostBackend::with_threads(1)).unwrap();
        device.record_error("Synchronizing the device", "stream lost".to_string());
        let err = device.check_errors("pre-step").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error in pre-step:\n\nSynchronizing the device failed with the following error:\n\nstream lost"
        );
    }

    #[test]
    fn display_lists_every_message_under_the_context() {
        let err = DeviceError {
            context: "post-step".to_string(),
            messages: vec!["first failure".to_string(), "second failure".to_string()],
        };
        assert_eq!(err.to_string(), "Error in post-step:\n\nfirst failure\nsecond failure");

        let engine_error = crate::engine::error::EngineError::from(err);
        assert!(engine_error.to_string().contains("second failure"));
    }

    #[test]
    fn install_runs_closure_and_returns_its_value() {
        let device = Device::new(HostBackend::with_threads(2)).unwrap();
        let sum: u64 = device.install(|| (1..=10u64).sum());
        assert_eq!(sum, 55);
    }
}
