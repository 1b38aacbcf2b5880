use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE, MAX_PATH};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
};

use loopback_capture_core::CaptureError;

/// Process handle closed on drop.
struct ProcessHandle(HANDLE);

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        let _ = unsafe { CloseHandle(self.0) };
    }
}

/// Full Win32 path of the executable behind `process_id`.
///
/// Opens the process for limited query only. Protected or already-exited
/// processes are `Unresolvable`.
pub(crate) fn executable_path(process_id: u32) -> Result<String, CaptureError> {
    let process = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, process_id) }.map_err(|e| {
        log::debug!("OpenProcess({}) failed: {}", process_id, e);
        CaptureError::Unresolvable(process_id)
    })?;
    let process = ProcessHandle(process);

    let mut buffer = [0u16; MAX_PATH as usize];
    let mut size = buffer.len() as u32;
    unsafe { QueryFullProcessImageNameW(process.0, PROCESS_NAME_WIN32, PWSTR(buffer.as_mut_ptr()), &mut size) }
        .map_err(|e| {
            log::debug!("QueryFullProcessImageNameW({}) failed: {}", process_id, e);
            CaptureError::Unresolvable(process_id)
        })?;

    Ok(String::from_utf16_lossy(&buffer[..size as usize]))
}
