use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub enum AuditEventType {
    UserRegister,
    UserLogin,
    UserLogout,
    UserUpdate,
    ItemCreate,
    ItemUpdate,
    ItemDelete,
    GroupCreate,
    GroupUpdate,
    SettingsUpdate,
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Emits a structured event on the `audit` target.
pub fn record(event_type: AuditEventType, actor: Option<&str>, resource_id: Option<&str>, status: &str) {
    info!(
        target: "audit",
        event_type = %event_type,
        actor = ?actor,
        resource_id = ?resource_id,
        status = %status,
        "Audit Event Occurred"
    );
}
