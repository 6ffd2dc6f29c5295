//! systemd service helpers.

use crate::error::Result;
use crate::host::Host;

/// Enable and start a service unless it is already active.
pub fn ensure_running(host: &Host, service: &str) -> Result<()> {
    if host.service_active(service)? {
        log::info!("Service {service} is already running");
        return Ok(());
    }
    host.enable_service(service)?;
    host.start_service(service)
}
