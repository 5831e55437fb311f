//! Native library search path for the engine process

/// Environment variable carrying the dynamic linker search path
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Separator between entries of a search path
#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

const CACHE_SEGMENT: &str = "/cache/";
const LIBRARY_SUFFIX: &str = "/lib";

/// Derive the application library directory from the engine executable path
///
/// Executables unpacked into a `.../cache/...` directory load their
/// libraries from the sibling `lib` directory, so everything from the first
/// `/cache/` segment onwards is replaced by `/lib`. Paths without such a
/// segment are returned unchanged.
pub fn app_library_path(executable: &str) -> String {
    match executable.find(CACHE_SEGMENT) {
        Some(idx) => format!("{}{}", &executable[..idx], LIBRARY_SUFFIX),
        None => executable.to_string(),
    }
}

/// Compose the library search path handed to the engine process
///
/// The derived application path comes before any inherited value, and the
/// configured native directory goes in front of everything unless it is the
/// application path itself.
pub fn resolve_library_path(
    executable: &str,
    native_dir: &str,
    inherited: Option<&str>,
) -> String {
    let app_path = app_library_path(executable);

    let mut search_path = match inherited {
        Some(existing) => format!("{}{}{}", app_path, PATH_SEPARATOR, existing),
        None => app_path.clone(),
    };

    if app_path != native_dir {
        search_path = format!("{}{}{}", native_dir, PATH_SEPARATOR, search_path);
    }

    search_path
}
