//! Controller-specific error types.
//!
//! Client crates bring their own error enums; this module wraps them and
//! adds the failures that only make sense at the workflow level, together
//! with the process exit code each one maps to.

use chassis::provision_state::ProvisionStateError;
use chassis::{ChassisError, TopologyError};
use nautobot_client::NautobotError;
use openstack_client::OpenStackError;
use redfish_client::RedfishError;
use thiserror::Error;
use undersync_client::UndersyncError;

/// Errors that can occur in the undercloud workflows.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Nautobot API error
    #[error("Nautobot error: {0}")]
    Nautobot(#[from] NautobotError),

    /// Ironic or Keystone API error
    #[error("OpenStack error: {0}")]
    OpenStack(#[from] OpenStackError),

    /// BMC returned an error or could not be reached
    #[error("Redfish error: {0}")]
    Redfish(#[from] RedfishError),

    /// Switch configuration push failed
    #[error("Undersync error: {0}")]
    Undersync(#[from] UndersyncError),

    /// Malformed chassis data or unknown switch
    #[error("Chassis error: {0}")]
    Chassis(#[from] ChassisError),

    /// Cabling violates the placement rules
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Unknown Ironic provision state
    #[error(transparent)]
    ProvisionState(#[from] ProvisionStateError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Enrollment only knows how to read LLDP from Dell iDRACs
    #[error("Server manufacturer {0} is not supported for enrollment")]
    ManufacturerNotSupported(String),

    /// LLDP never saw enough switches
    #[error("Only {found} LLDP neighbours found after {attempts} attempts, need 3")]
    LldpUnderdiscovery { found: usize, attempts: u32 },

    /// Oslo event routing failure
    #[error(transparent)]
    Event(#[from] EventError),

    /// Local file access
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record that must exist does not
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ControllerError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Event(e) => e.exit_code(),
            Self::Undersync(_) => 2,
            _ => 1,
        }
    }
}

/// Failures of the Oslo event router, one per exit code.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Cannot parse event: {0}")]
    Parse(String),

    #[error("No event handler for event type {0:?}")]
    NoHandler(String),

    #[error("Failed to initialize clients: {0}")]
    ClientInit(String),

    #[error("Handler for {event_type} failed: {source}")]
    Handler {
        event_type: String,
        #[source]
        source: Box<ControllerError>,
    },
}

impl EventError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parse(_) => 5,
            Self::NoHandler(_) => 6,
            Self::ClientInit(_) => 7,
            Self::Handler { .. } => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(EventError::Parse("eof".into()).exit_code(), 5);
        assert_eq!(ControllerError::from(EventError::NoHandler("x".into())).exit_code(), 6);
        assert_eq!(EventError::ClientInit("no token".into()).exit_code(), 7);
        let handler = EventError::Handler {
            event_type: "baremetal.port.create.end".to_string(),
            source: Box::new(ControllerError::NotFound("switch".into())),
        };
        assert_eq!(handler.exit_code(), 8);
        let undersync = ControllerError::from(UndersyncError::Api {
            status: 502,
            body: "bad gateway".into(),
        });
        assert_eq!(undersync.exit_code(), 2);
        assert_eq!(ControllerError::InvalidConfig("x".into()).exit_code(), 1);
    }
}
