//! VPN engine module
//!
//! Handles launching the engine process, decoding its log protocol and
//! shutting it down.

pub mod crash_dump;
pub mod library_path;
pub mod log_decoder;
pub mod output_stream;
pub mod state;
pub mod supervisor;

// Public re-exports
pub use library_path::resolve_library_path;
pub use log_decoder::{LogLineDecoder, ManagementFlags, ParsedEvent};
pub use state::SupervisorState;
pub use supervisor::{
    EngineCommand, ExitReport, ProcessLifecycle, ShutdownMode, Supervisor, SupervisorHandle,
};
