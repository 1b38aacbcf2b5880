use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

use loopback_capture_core::CaptureError;

/// Membership of the current thread in the multithreaded COM apartment.
///
/// Leaves the apartment on drop, so it must be dropped on the thread that
/// entered it.
pub(crate) struct ComApartment {
    owned: bool,
}

impl ComApartment {
    pub(crate) fn enter() -> Result<Self, CaptureError> {
        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        if hr.is_ok() {
            return Ok(Self { owned: true });
        }
        if hr == RPC_E_CHANGED_MODE {
            // The host already put this thread in an STA; keep using it.
            log::debug!("Thread already joined a single-threaded apartment");
            return Ok(Self { owned: false });
        }
        Err(CaptureError::ActivationFailed(format!(
            "CoInitializeEx failed: {}",
            windows::core::Error::from(hr)
        )))
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.owned {
            unsafe {
                CoUninitialize();
            }
        }
    }
}
