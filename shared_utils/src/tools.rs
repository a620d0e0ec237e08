//! External tool detection

/// True if `command_name` resolves on `PATH`.
///
/// ```
/// use shared_utils::tools::is_command_available;
///
/// if is_command_available("ffmpeg") {
///     println!("ffmpeg is available");
/// }
/// ```
pub fn is_command_available(command_name: &str) -> bool {
    which::which(command_name).is_ok()
}

/// The subset of `tools` not found on `PATH`, in input order.
pub fn missing_tools(tools: &[&str]) -> Vec<String> {
    tools
        .iter()
        .filter(|t| !is_command_available(t))
        .map(|t| t.to_string())
        .collect()
}
