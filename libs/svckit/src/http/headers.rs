use http::HeaderMap;

/// Copy every header of `source` onto `target`.
///
/// For each name present in `source`, existing values in `target` are
/// dropped and all source values are appended in order. Names only present
/// in `target` are left alone.
pub fn copy_headers(source: &HeaderMap, target: &mut HeaderMap) {
    for name in source.keys() {
        target.remove(name);
        for value in source.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn values<'a>(map: &'a HeaderMap, name: &str) -> Vec<&'a str> {
        map.get_all(name)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect()
    }

    #[test]
    fn multi_valued_headers_replace_target_values() {
        let mut source = HeaderMap::new();
        source.append("a", HeaderValue::from_static("1"));
        source.append("a", HeaderValue::from_static("2"));
        source.append("b", HeaderValue::from_static("x"));

        let mut target = HeaderMap::new();
        target.append("a", HeaderValue::from_static("old"));

        copy_headers(&source, &mut target);

        assert_eq!(values(&target, "a"), vec!["1", "2"]);
        assert_eq!(values(&target, "b"), vec!["x"]);
        assert_eq!(target.len(), 3);
    }

    #[test]
    fn unrelated_target_headers_survive() {
        let mut source = HeaderMap::new();
        source.insert("a", HeaderValue::from_static("1"));
        let mut target = HeaderMap::new();
        target.insert("keep", HeaderValue::from_static("me"));

        copy_headers(&source, &mut target);

        assert_eq!(values(&target, "keep"), vec!["me"]);
        assert_eq!(values(&target, "a"), vec!["1"]);
    }

    #[test]
    fn empty_source_is_noop() {
        let mut target = HeaderMap::new();
        target.insert("a", HeaderValue::from_static("old"));
        copy_headers(&HeaderMap::new(), &mut target);
        assert_eq!(values(&target, "a"), vec!["old"]);
    }
}
