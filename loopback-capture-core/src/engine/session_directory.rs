//! Audio session listing on the default render endpoint.

use crate::models::audio_models::ApplicationSession;
use crate::models::error::CaptureError;
use crate::traits::backend::{AudioBackend, SessionManager};

/// List processes that own an audio session, in OS enumeration order.
///
/// Best-effort: the system session (pid 0), sessions whose process id cannot
/// be read, and processes whose path cannot be resolved are skipped. A
/// session-enumeration failure yields an empty list.
pub(crate) fn list_applications<B: AudioBackend>(
    backend: &B,
    manager: &B::SessionManager,
    max_count: usize,
) -> Vec<ApplicationSession> {
    let entries = match manager.session_process_ids() {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Failed to enumerate audio sessions: {}", e);
            return Vec::new();
        }
    };
    log::debug!("Found {} audio sessions", entries.len());

    let mut sessions = Vec::new();
    for entry in entries {
        if sessions.len() >= max_count {
            break;
        }
        let process_id = match entry {
            Ok(0) => continue,
            Ok(pid) => pid,
            Err(e) => {
                log::debug!("Skipping session: {}", e);
                continue;
            }
        };
        match backend.resolve_process_path(process_id) {
            Ok(executable_path) => sessions.push(ApplicationSession {
                process_id,
                executable_path,
            }),
            Err(e) => log::debug!("Skipping session: {}", e),
        }
    }
    sessions
}

/// Whether any session on the endpoint belongs to `process_id`.
pub(crate) fn has_session<M: SessionManager>(manager: &M, process_id: u32) -> Result<bool, CaptureError> {
    let entries = manager.session_process_ids()?;
    Ok(entries.iter().any(|entry| matches!(entry, Ok(pid) if *pid == process_id)))
}
