/// Join path segments into a route path.
///
/// Empty segments are dropped, runs of `/` collapse to one, the result always
/// starts with `/` and only the root path ends with one.
pub fn normalize_path(segments: &[&str]) -> String {
    let mut path = String::from("/");
    for part in segments.iter().flat_map(|segment| segment.split('/')) {
        if part.is_empty() {
            continue;
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(part);
    }
    path
}

/// `path` with parameter and wildcard names erased.
///
/// Two routes with the same shape match the same requests.
pub fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with(':') {
                ":"
            } else if segment.starts_with('*') {
                "*"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
