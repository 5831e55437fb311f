//! Library path command
//!
//! Shows the `LD_LIBRARY_PATH` the engine would be started with.

use vpnkeeper_core::vpn::library_path::{resolve_library_path, LIBRARY_PATH_VAR};

/// Print the resolved search path, taking the current environment into account
pub fn run_libpath(exe: &str, native_dir: &str) {
    let inherited = std::env::var(LIBRARY_PATH_VAR).ok();
    println!(
        "{}",
        resolve_library_path(exe, native_dir, inherited.as_deref())
    );
}
