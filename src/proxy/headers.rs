//! Header relay rules shared by the outbound client and the response writer.

use hyper::header::{self, HeaderMap, HeaderName};

/// Connection-scoped headers that must not cross the proxy.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Copy every end-to-end header from `source` into `target`, keeping order
/// and duplicates. `skip` names additional headers to leave out.
pub fn copy_end_to_end(source: &HeaderMap, target: &mut HeaderMap, skip: &[HeaderName]) {
    for (name, value) in source {
        if is_hop_by_hop(name) || skip.contains(name) {
            continue;
        }
        target.append(name.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_hop_by_hop_detection() {
        assert!(is_hop_by_hop(&header::CONNECTION));
        assert!(is_hop_by_hop(&HeaderName::from_static("keep-alive")));
        assert!(is_hop_by_hop(&header::TRANSFER_ENCODING));
        assert!(!is_hop_by_hop(&header::CONTENT_TYPE));
        assert!(!is_hop_by_hop(&header::CONTENT_LENGTH));
    }

    #[test]
    fn test_copy_preserves_duplicates_and_skips() {
        let mut source = HeaderMap::new();
        source.append("x-tag", HeaderValue::from_static("one"));
        source.append("x-tag", HeaderValue::from_static("two"));
        source.insert(header::HOST, HeaderValue::from_static("proxy.local"));
        source.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        let mut target = HeaderMap::new();
        copy_end_to_end(&source, &mut target, &[header::HOST]);

        let tags: Vec<_> = target.get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["one", "two"]);
        assert!(target.get(header::HOST).is_none());
        assert!(target.get(header::CONNECTION).is_none());
    }
}
