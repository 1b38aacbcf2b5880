pub mod backend;
pub mod capture_delegate;
pub mod frame_callback;
