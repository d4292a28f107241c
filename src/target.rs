//! Install target construction.

/// Version tag requested by every upgrade attempt.
pub const LATEST_TAG: &str = "latest";

/// Combine a module identifier, a package path inside the module, and a
/// version tag into the argument handed to the installer.
///
/// The module and package path are joined with `/` and normalised: empty and
/// `.` segments are dropped and `..` removes the preceding segment. The tag is
/// appended to the last segment as `@tag`, so an empty package path yields
/// `module@tag`.
pub fn install_target(module: &str, package_path: &str, tag: &str) -> String {
    let rooted = module.starts_with('/') || (module.is_empty() && package_path.starts_with('/'));
    let mut segments: Vec<&str> = Vec::new();

    for segment in module.split('/').chain(package_path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut target = if rooted {
        format!("/{}", segments.join("/"))
    } else {
        segments.join("/")
    };
    target.push('@');
    target.push_str(tag);
    target
}
