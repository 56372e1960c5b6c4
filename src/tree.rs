//! Segment trie for exact-match route lookup.
//!
//! Paths are split on `'/'` and every piece becomes one level of the tree,
//! empty pieces included:
//!
//! | path        | segments               |
//! |-------------|------------------------|
//! | `""`        | `[""]`                 |
//! | `"/"`       | `["", ""]`             |
//! | `"/items"`  | `["", "items"]`        |
//! | `"/items/"` | `["", "items", ""]`    |
//!
//! A trailing slash is therefore significant and there is no normalisation,
//! no wildcard, no prefix matching. Every operation is O(segments).
//!
//! The tree performs no locking of its own. The router shares it behind a
//! `RwLock`; register everything before serving traffic.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use crate::handler::BoxedHandler;

const SEPARATOR: char = '/';

#[derive(Default)]
struct Node {
    children: HashMap<String, Node>,
    handlers: HashMap<Method, BoxedHandler>,
}

/// Outcome of [`RouteTree::find`].
pub enum RouteInfo {
    /// Some segment of the path is not in the tree.
    NoRouteMatch,
    /// Every segment of the path exists but the last node has no handler for
    /// the method. `allowed` lists the methods it does have, sorted; it is
    /// empty for an interior node of a longer route.
    MethodNotSupported { allowed: Vec<Method> },
    Matched(BoxedHandler),
}

impl std::fmt::Debug for RouteInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRouteMatch => f.write_str("NoRouteMatch"),
            Self::MethodNotSupported { allowed } => f
                .debug_struct("MethodNotSupported")
                .field("allowed", allowed)
                .finish(),
            Self::Matched(_) => f.write_str("Matched(..)"),
        }
    }
}

/// Route storage: one node per path segment, one handler per method per node.
#[derive(Default)]
pub struct RouteTree {
    root: Node,
}

impl RouteTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handler` for `method` at `path`, creating nodes as needed.
    /// An existing handler for the same path and method is replaced.
    pub fn insert(&mut self, path: &str, method: Method, handler: BoxedHandler) {
        let node = path
            .split(SEPARATOR)
            .fold(&mut self.root, |node, segment| {
                node.children.entry(segment.to_owned()).or_default()
            });
        node.handlers.insert(method, handler);
    }

    pub fn find(&self, path: &str, method: &Method) -> RouteInfo {
        let mut node = &self.root;
        for segment in path.split(SEPARATOR) {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return RouteInfo::NoRouteMatch,
            }
        }

        // Interior nodes of longer routes are reachable paths too; with no
        // handlers they report an empty `allowed` list.
        match node.handlers.get(method) {
            Some(handler) => RouteInfo::Matched(Arc::clone(handler)),
            None => RouteInfo::MethodNotSupported { allowed: sorted_methods(node) },
        }
    }

    /// Every registered `(method, path)` pair, sorted by path then method.
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut out = Vec::new();
        // The root's children are the first segments; rebuild paths by joining
        // each segment onto its parent with the separator.
        for (segment, child) in &self.root.children {
            collect(child, segment.clone(), &mut out);
        }
        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        out
    }
}

fn collect(node: &Node, path: String, out: &mut Vec<(Method, String)>) {
    out.extend(node.handlers.keys().map(|m| (m.clone(), path.clone())));
    for (segment, child) in &node.children {
        collect(child, format!("{path}{SEPARATOR}{segment}"), out);
    }
}

fn sorted_methods(node: &Node) -> Vec<Method> {
    let mut methods: Vec<Method> = node.handlers.keys().cloned().collect();
    methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::request::Request;

    fn named(name: &'static str) -> BoxedHandler {
        (move |_req: Request| async move { name }).into_boxed_handler()
    }

    fn matched(info: RouteInfo) -> BoxedHandler {
        match info {
            RouteInfo::Matched(h) => h,
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn finds_exactly_what_was_inserted() {
        let mut tree = RouteTree::new();
        let get = named("get");
        let post = named("post");
        tree.insert("/items", Method::GET, Arc::clone(&get));
        tree.insert("/items", Method::POST, Arc::clone(&post));

        assert!(Arc::ptr_eq(&matched(tree.find("/items", &Method::GET)), &get));
        assert!(Arc::ptr_eq(&matched(tree.find("/items", &Method::POST)), &post));
    }

    #[test]
    fn unknown_method_lists_allowed() {
        let mut tree = RouteTree::new();
        tree.insert("/items", Method::POST, named("post"));
        tree.insert("/items", Method::GET, named("get"));

        match tree.find("/items", &Method::DELETE) {
            RouteInfo::MethodNotSupported { allowed } => {
                assert_eq!(allowed, [Method::GET, Method::POST]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_path_is_no_match() {
        let mut tree = RouteTree::new();
        tree.insert("/items", Method::GET, named("get"));

        assert!(matches!(tree.find("/missing", &Method::GET), RouteInfo::NoRouteMatch));
        assert!(matches!(tree.find("/items/1", &Method::GET), RouteInfo::NoRouteMatch));
    }

    #[test]
    fn interior_node_is_method_not_supported() {
        let mut tree = RouteTree::new();
        tree.insert("/api/widgets", Method::GET, named("widgets"));

        match tree.find("/api", &Method::GET) {
            RouteInfo::MethodNotSupported { allowed } => assert!(allowed.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(tree.find("", &Method::GET), RouteInfo::MethodNotSupported { .. }));
        assert!(matches!(tree.find("/apix", &Method::GET), RouteInfo::NoRouteMatch));
    }

    #[test]
    fn last_insert_wins() {
        let mut tree = RouteTree::new();
        let first = named("first");
        let second = named("second");
        tree.insert("/items", Method::GET, Arc::clone(&first));
        tree.insert("/items", Method::GET, Arc::clone(&second));

        let found = matched(tree.find("/items", &Method::GET));
        assert!(Arc::ptr_eq(&found, &second));
        assert!(!Arc::ptr_eq(&found, &first));
    }

    #[test]
    fn trailing_slash_and_root_are_distinct() {
        let mut tree = RouteTree::new();
        tree.insert("/", Method::GET, named("root"));
        tree.insert("/items", Method::GET, named("items"));

        assert!(matches!(tree.find("/", &Method::GET), RouteInfo::Matched(_)));
        assert!(matches!(tree.find("", &Method::GET), RouteInfo::MethodNotSupported { .. }));
        assert!(matches!(tree.find("/items/", &Method::GET), RouteInfo::NoRouteMatch));
    }

    #[test]
    fn extension_methods_are_keys_too() {
        let mut tree = RouteTree::new();
        let purge = Method::from_bytes(b"PURGE").unwrap();
        tree.insert("/cache", purge.clone(), named("purge"));

        assert!(matches!(tree.find("/cache", &purge), RouteInfo::Matched(_)));
    }

    #[test]
    fn routes_are_listed_sorted() {
        let mut tree = RouteTree::new();
        tree.insert("/items", Method::POST, named("a"));
        tree.insert("/", Method::GET, named("b"));
        tree.insert("/api/widgets", Method::GET, named("c"));
        tree.insert("/items", Method::GET, named("d"));

        let routes: Vec<(String, String)> = tree
            .routes()
            .into_iter()
            .map(|(m, p)| (m.to_string(), p))
            .collect();
        assert_eq!(
            routes,
            [
                ("GET".to_owned(), "/".to_owned()),
                ("GET".to_owned(), "/api/widgets".to_owned()),
                ("GET".to_owned(), "/items".to_owned()),
                ("POST".to_owned(), "/items".to_owned()),
            ]
        );
    }
}
