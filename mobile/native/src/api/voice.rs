use crate::client::manager::SessionManager;

/// Request speech for the given text. Prefers server-rendered audio
/// (`POST /api/tts`); when none is available a SpeakLocal event tells the
/// UI to use the device TTS engine. Never fails — missing server audio
/// is a fallback, not an error.
#[flutter_rust_bridge::frb(sync)]
pub fn speak(text: String, voice: String) {
    SessionManager::get().speak(text, voice);
}

/// Whether replies should be spoken automatically.
#[flutter_rust_bridge::frb(sync)]
pub fn auto_speak() -> bool {
    SessionManager::get().auto_speak()
}

#[flutter_rust_bridge::frb(sync)]
pub fn set_auto_speak(enabled: bool) {
    SessionManager::get().set_auto_speak(enabled);
}
