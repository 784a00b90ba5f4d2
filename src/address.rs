//! Hypertext address arithmetic.
//!
//! Addresses are plain strings of the form `scheme://host/path#fragment`
//! (every part optional). Resolution merges a reference into a base and
//! removes `.`/`..` segments; relativization is its inverse, used when
//! writing anchor targets.

/// Split off the `#fragment` of an address.
pub fn split_fragment(address: &str) -> (&str, Option<&str>) {
    match address.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (address, None),
    }
}

/// Resolve `reference` against `base`.
///
/// - an empty reference is the base document itself
/// - `#name` stays in the base document
/// - a reference with a scheme is already absolute
/// - `/path` keeps the base's scheme and host
/// - anything else is relative to the base's directory
pub fn resolve(base: &str, reference: &str) -> String {
    let (base_doc, _) = split_fragment(base);

    if reference.is_empty() {
        return base_doc.to_string();
    }
    if reference.starts_with('#') {
        return format!("{base_doc}{reference}");
    }
    if scheme_end(reference).is_some() {
        return reference.to_string();
    }

    let (origin, base_path) = split_origin(base_doc);
    if let Some(rest) = reference.strip_prefix("//") {
        let scheme = origin.split_once(':').map_or("", |(scheme, _)| scheme);
        return if scheme.is_empty() {
            format!("//{rest}")
        } else {
            format!("{scheme}://{rest}")
        };
    }

    let (reference, fragment) = split_fragment(reference);
    let merged = if reference.starts_with('/') {
        remove_dot_segments(reference)
    } else {
        let dir = match base_path.rfind('/') {
            Some(i) => &base_path[..=i],
            None if !origin.is_empty() && base_path.is_empty() => "/",
            None => "",
        };
        remove_dot_segments(&format!("{dir}{reference}"))
    };

    match fragment {
        Some(fragment) => format!("{origin}{merged}#{fragment}"),
        None => format!("{origin}{merged}"),
    }
}

/// Express `target` relative to `base`, as short as possible.
///
/// Targets on another scheme or host, or with an empty path segment, are
/// returned unchanged. A target in the base document itself becomes a bare
/// `#fragment`.
pub fn relative_to(base: &str, target: &str) -> String {
    if base.is_empty() {
        return target.to_string();
    }
    let (base_doc, _) = split_fragment(base);
    let (target_doc, fragment) = split_fragment(target);
    let (base_origin, base_path) = split_origin(base_doc);
    let (target_origin, target_path) = split_origin(target_doc);

    if target_doc.is_empty() || !base_origin.eq_ignore_ascii_case(target_origin) {
        return target.to_string();
    }
    if base_path.starts_with('/') != target_path.starts_with('/') {
        return target.to_string();
    }
    // Empty segments do not survive dot-segment merging.
    if base_path.contains("//") || target_path.contains("//") {
        return target.to_string();
    }

    let with_fragment = |path: String| match fragment {
        Some(fragment) => format!("{path}#{fragment}"),
        None => path,
    };

    if base_path == target_path {
        return match fragment {
            Some(fragment) => format!("#{fragment}"),
            None => last_segment(target_path).to_string(),
        };
    }

    let base_dirs: Vec<&str> = match base_path.rfind('/') {
        Some(i) => base_path[..i].split('/').collect(),
        None => Vec::new(),
    };
    let target_segments: Vec<&str> = target_path.split('/').collect();
    let (target_dirs, file) = target_segments.split_at(target_segments.len() - 1);

    let common = base_dirs
        .iter()
        .zip(target_dirs)
        .take_while(|(a, b)| a == b)
        .count();

    let mut path = "../".repeat(base_dirs.len() - common);
    for dir in &target_dirs[common..] {
        path.push_str(dir);
        path.push('/');
    }
    path.push_str(file[0]);

    if path.is_empty() {
        path.push_str("./");
    } else if path.split('/').next().is_some_and(|first| first.contains(':')) {
        path.insert_str(0, "./");
    }
    with_fragment(path)
}

/// Byte index of the `:` ending a URL scheme, if `address` starts with one.
fn scheme_end(address: &str) -> Option<usize> {
    let colon = address.find(':')?;
    let scheme = &address[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    (first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')))
    .then_some(colon)
}

/// Split an address into its `scheme:` or `scheme://host` prefix and path.
fn split_origin(address: &str) -> (&str, &str) {
    let Some(colon) = scheme_end(address) else {
        return ("", address);
    };
    let after = &address[colon + 1..];
    match after.strip_prefix("//") {
        Some(authority) => {
            let end = colon + 3 + authority.find('/').unwrap_or(authority.len());
            (&address[..end], &address[end..])
        }
        None => (&address[..=colon], after),
    }
}

fn last_segment(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) if i + 1 < path.len() => &path[i + 1..],
        Some(_) => "./",
        None => path,
    }
}

fn remove_dot_segments(path: &str) -> String {
    let (root, rest) = match path.strip_prefix('/') {
        Some(rest) => ("/", rest),
        None => ("", path),
    };

    let mut out: Vec<&str> = Vec::new();
    let mut segments = rest.split('/').peekable();
    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        match segment {
            "." => {}
            ".." => match out.last() {
                Some(&prev) if prev != ".." => {
                    out.pop();
                }
                _ if root.is_empty() => out.push(".."),
                _ => {}
            },
            segment => {
                out.push(segment);
                continue;
            }
        }
        if last {
            out.push("");
        }
    }
    format!("{root}{}", out.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: &str = "http://info.cern.ch/hypertext/WWW/TheProject.html";

    #[test]
    fn test_resolve_relative_paths() {
        assert_eq!(resolve(BASE, "Link.html"), "http://info.cern.ch/hypertext/WWW/Link.html");
        assert_eq!(
            resolve(BASE, "../DataSources/Top.html"),
            "http://info.cern.ch/hypertext/DataSources/Top.html"
        );
        assert_eq!(resolve(BASE, "./a/./b/../c.html"), "http://info.cern.ch/hypertext/WWW/a/c.html");
        assert_eq!(resolve(BASE, "/pub/x.html"), "http://info.cern.ch/pub/x.html");
        assert_eq!(resolve(BASE, "//other.host/x"), "http://other.host/x");
    }

    #[test]
    fn test_resolve_fragments_and_absolute() {
        assert_eq!(resolve(BASE, "#z3"), format!("{BASE}#z3"));
        assert_eq!(resolve(&format!("{BASE}#old"), "#new"), format!("{BASE}#new"));
        assert_eq!(resolve(BASE, ""), BASE);
        assert_eq!(resolve(BASE, "news:comp.infosystems"), "news:comp.infosystems");
        assert_eq!(
            resolve(BASE, "Link.html#z9"),
            "http://info.cern.ch/hypertext/WWW/Link.html#z9"
        );
    }

    #[test]
    fn test_resolve_without_origin() {
        assert_eq!(resolve("docs/a.html", "b.html"), "docs/b.html");
        assert_eq!(resolve("a.html", "b.html"), "b.html");
        assert_eq!(resolve("docs/a.html", "../../b.html"), "../b.html");
        assert_eq!(resolve("", "doc2"), "doc2");
        assert_eq!(resolve("http://host", "x.html"), "http://host/x.html");
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to(BASE, "http://info.cern.ch/hypertext/WWW/Link.html"), "Link.html");
        assert_eq!(
            relative_to(BASE, "http://info.cern.ch/hypertext/DataSources/Top.html"),
            "../DataSources/Top.html"
        );
        assert_eq!(
            relative_to(BASE, "http://info.cern.ch/hypertext/WWW/Sub/A.html#z2"),
            "Sub/A.html#z2"
        );
        assert_eq!(relative_to(BASE, &format!("{BASE}#z4")), "#z4");
        assert_eq!(relative_to(BASE, "http://other.org/x.html"), "http://other.org/x.html");
        assert_eq!(relative_to(BASE, "doc2"), "doc2");
        assert_eq!(relative_to("", "http://a/b"), "http://a/b");
    }

    #[test]
    fn test_relative_then_resolve_is_identity() {
        let targets = [
            "http://info.cern.ch/hypertext/WWW/Link.html",
            "http://info.cern.ch/hypertext/Other/Deep/X.html#z1",
            "http://info.cern.ch/top.html",
            "http://elsewhere.org/a/b.html",
            "http://info.cern.ch/hypertext/WWW/TheProject.html#z7",
        ];
        for target in targets {
            assert_eq!(resolve(BASE, &relative_to(BASE, target)), target, "{target}");
        }
    }

    #[test]
    fn test_empty_segments_stay_absolute() {
        assert_eq!(relative_to("http://h/a", "http://h//a"), "http://h//a");
        assert_eq!(relative_to("http://h//x/a", "http://h/b"), "http://h/b");
        assert_eq!(resolve("http://h/a", &relative_to("http://h/a", "http://h//a")), "http://h//a");
    }

    fn address() -> impl Strategy<Value = String> {
        (
            prop::collection::vec("[a-c]{0,2}", 1..5),
            prop::option::of("z[0-9]"),
        )
            .prop_map(|(segments, fragment)| {
                let mut out = format!("http://h/{}", segments.join("/"));
                if let Some(fragment) = fragment {
                    out.push('#');
                    out.push_str(&fragment);
                }
                out
            })
    }

    proptest! {
        #[test]
        fn prop_relative_target_resolves_back(base in address(), target in address()) {
            let relative = relative_to(&base, &target);
            prop_assert_eq!(resolve(&base, &relative), target);
        }
    }

    #[test]
    fn test_split_fragment() {
        assert_eq!(split_fragment("a.html#z1"), ("a.html", Some("z1")));
        assert_eq!(split_fragment("a.html"), ("a.html", None));
        assert_eq!(split_fragment("#z1"), ("", Some("z1")));
    }
}
