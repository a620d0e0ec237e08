use std::ffi::OsString;
use std::path::Path;

/// Path as a command-line argument that cannot be mistaken for a flag.
///
/// Tools like ffmpeg and cjxl do not accept `--`; a relative path starting
/// with '-' gets a `./` prefix. Everything else passes through untouched.
pub fn safe_path_arg(path: &Path) -> OsString {
    if path.as_os_str().to_string_lossy().starts_with('-') {
        let mut arg = OsString::from("./");
        arg.push(path.as_os_str());
        arg
    } else {
        path.as_os_str().to_os_string()
    }
}
