//! Path resolution between the job's workspace placeholder and the URI forms
//! understood by the iTest runtime.

/// Placeholder replaced with the build's workspace directory.
pub const WORKSPACE_PLACEHOLDER: &str = "${WORKSPACE}";

/// Prefix of workspace-relative iTest project references.
pub const PROJECT_URI_PREFIX: &str = "project://";

/// Prefix of file URIs.
pub const FILE_URI_PREFIX: &str = "file:/";

/// Resolve a user-supplied path into the form passed to the runtime.
///
/// Rules, first match wins:
/// 1. empty input resolves to an empty string (the caller omits the flag)
/// 2. exactly `${WORKSPACE}` resolves to `workspace_root`
/// 3. a `${WORKSPACE}` prefix is replaced with `workspace_root`
/// 4. `project://` and `file:/` inputs are kept as they are
/// 5. anything else becomes `file:/` + input
///
/// Spaces in the result are then replaced with `space_escape`.
pub fn resolve(raw: &str, workspace_root: &str, space_escape: &str) -> String {
    let raw = raw.trim();
    let resolved = if let Some(expanded) = expand_workspace(raw, workspace_root) {
        expanded
    } else if is_uri(raw) {
        raw.to_string()
    } else {
        format!("{FILE_URI_PREFIX}{raw}")
    };
    escape_spaces(&resolved, space_escape)
}

/// Resolve the `--itar` workspace argument.
///
/// Only the placeholder is expanded; any other value is passed through verbatim.
pub fn resolve_workspace(raw: &str, workspace_root: &str) -> String {
    let raw = raw.trim();
    expand_workspace(raw, workspace_root).unwrap_or_else(|| raw.to_string())
}

/// Resolve a test case path into an unescaped URI.
///
/// Unlike [`resolve`], a workspace expansion is also turned into a `file:` URI,
/// so every test case reaches the runtime as a URI.
pub fn resolve_test_case(raw: &str, workspace_root: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    match expand_workspace(raw, workspace_root) {
        Some(expanded) => file_uri(&expanded),
        None if is_uri(raw) => raw.to_string(),
        None => format!("{FILE_URI_PREFIX}{raw}"),
    }
}

/// The workspace directory as a `file:` URI with a trailing slash.
pub fn workspace_uri(workspace_root: &str, space_escape: &str) -> String {
    let mut uri = file_uri(&workspace_root.replace('\\', "/"));
    if !uri.ends_with('/') {
        uri.push('/');
    }
    escape_spaces(&uri, space_escape)
}

/// Test case name: the last path segment without its extension.
///
/// Both `/` and `\` count as separators.
pub fn test_case_name(path: &str) -> String {
    let segment = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match segment.rfind('.') {
        Some(dot) if dot > 0 => segment[..dot].to_string(),
        _ => segment.to_string(),
    }
}

/// Replace every space with the shell-specific escape sequence.
pub fn escape_spaces(value: &str, space_escape: &str) -> String {
    value.replace(' ', space_escape)
}

fn expand_workspace(raw: &str, workspace_root: &str) -> Option<String> {
    if raw.is_empty() {
        return Some(String::new());
    }
    raw.strip_prefix(WORKSPACE_PLACEHOLDER)
        .map(|rest| format!("{workspace_root}{rest}"))
}

fn is_uri(raw: &str) -> bool {
    raw.starts_with(PROJECT_URI_PREFIX) || raw.starts_with(FILE_URI_PREFIX)
}

fn file_uri(path: &str) -> String {
    if is_uri(path) {
        path.to_string()
    } else if path.starts_with('/') {
        format!("file:{path}")
    } else {
        format!("{FILE_URI_PREFIX}{path}")
    }
}
