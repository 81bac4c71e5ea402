use crate::client::manager::SessionManager;

/// Whether the biometric gate runs before exposing the authenticated UI.
#[flutter_rust_bridge::frb(sync)]
pub fn biometric_enabled() -> bool {
    SessionManager::get().biometric_enabled()
}

#[flutter_rust_bridge::frb(sync)]
pub fn set_biometric_enabled(enabled: bool) {
    SessionManager::get().set_biometric_enabled(enabled);
}
