//! Compressed prefix tree: one per HTTP method, built at registration
//! time, read-only at request time.
//!
//! Nodes carry multi-byte literal prefixes (radix compression), at most
//! one parameter child, and at most one wildcard child. Lookup walks the
//! path byte-by-byte preferring, at every branch point, exact literal
//! continuation over a parameter match over a wildcard match — so a
//! static route always beats a param route beats a wildcard route for the
//! same incoming path. Cost is proportional to path length, never to the
//! number of registered routes.
//!
//! Patterns use `:name` for single-segment parameters and a single
//! trailing `*` for a rest-of-path wildcard, whose capture is exposed
//! under the parameter name `*`.

use std::sync::Arc;

use crate::handler::DynHandler;

pub(crate) struct Tree {
    root: Node,
}

#[derive(Default)]
struct Node {
    prefix: String,
    chain: Option<DynHandler>,
    children: Vec<Node>,
    param: Option<Box<ParamChild>>,
    wildcard: Option<WildcardChild>,
}

struct ParamChild {
    name: Arc<str>,
    node: Node,
}

struct WildcardChild {
    name: Arc<str>,
    chain: DynHandler,
}

#[derive(Clone, Copy)]
enum Token<'p> {
    Literal(&'p str),
    Param(&'p str),
    Wildcard,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self {
            root: Node::default(),
        }
    }

    /// Inserts `pattern`, returning the number of parameters it captures.
    /// Re-inserting an existing pattern replaces its handler chain.
    ///
    /// # Panics
    ///
    /// On malformed patterns: a wildcard anywhere but the end, an empty
    /// parameter name, or a parameter name differing from one already
    /// registered at the same tree position. Routes are wired at startup;
    /// a bad pattern is a programming error, not a request-time condition.
    pub(crate) fn insert(&mut self, pattern: &str, chain: DynHandler) -> usize {
        let tokens = parse(pattern);
        let mut count = 0;
        let mut node = &mut self.root;
        for token in &tokens {
            match *token {
                Token::Literal(lit) => node = insert_literal(node, lit),
                Token::Param(name) => {
                    count += 1;
                    node = insert_param(node, name, pattern);
                }
                Token::Wildcard => {
                    count += 1;
                    match &mut node.wildcard {
                        Some(w) => w.chain = chain.clone(),
                        None => {
                            node.wildcard = Some(WildcardChild {
                                name: Arc::from("*"),
                                chain: chain.clone(),
                            });
                        }
                    }
                    return count;
                }
            }
        }
        node.chain = Some(chain);
        count
    }

    /// Matches `path`, appending captured parameters to `params`. The path
    /// is taken as-is: percent-encoded octets are compared verbatim.
    pub(crate) fn lookup<'t>(
        &'t self,
        path: &str,
        params: &mut Vec<(Arc<str>, String)>,
    ) -> Option<&'t DynHandler> {
        walk(&self.root, path, params)
    }
}

fn walk<'t>(
    node: &'t Node,
    path: &str,
    params: &mut Vec<(Arc<str>, String)>,
) -> Option<&'t DynHandler> {
    let rest = path.strip_prefix(node.prefix.as_str())?;

    if rest.is_empty() {
        if let Some(chain) = &node.chain {
            return Some(chain);
        }
        // A trailing wildcard still matches the bare prefix, with an
        // empty capture.
        if let Some(w) = &node.wildcard {
            params.push((w.name.clone(), String::new()));
            return Some(&w.chain);
        }
        return None;
    }

    // Static first, then param, then wildcard. A later alternative runs
    // only when an earlier one dead-ends deeper down; captures pushed on
    // the dead branch are popped before the next alternative.
    let first = rest.as_bytes()[0];
    if let Some(child) = node
        .children
        .iter()
        .find(|c| c.prefix.as_bytes().first() == Some(&first))
    {
        let depth = params.len();
        if let Some(chain) = walk(child, rest, params) {
            return Some(chain);
        }
        params.truncate(depth);
    }

    if let Some(p) = &node.param {
        let end = rest.find('/').unwrap_or(rest.len());
        // A parameter never captures an empty segment.
        if end > 0 {
            let depth = params.len();
            params.push((p.name.clone(), rest[..end].to_owned()));
            if let Some(chain) = walk(&p.node, &rest[end..], params) {
                return Some(chain);
            }
            params.truncate(depth);
        }
    }

    if let Some(w) = &node.wildcard {
        params.push((w.name.clone(), rest.to_owned()));
        return Some(&w.chain);
    }

    None
}

fn insert_literal<'a>(mut node: &'a mut Node, mut lit: &str) -> &'a mut Node {
    loop {
        let common = common_prefix_len(&node.prefix, lit);
        if common < node.prefix.len() {
            // Partial overlap: split this node, pushing its tail (and
            // everything hanging off it) down into a new child.
            let tail = node.prefix.split_off(common);
            let split = Node {
                prefix: tail,
                chain: node.chain.take(),
                children: std::mem::take(&mut node.children),
                param: node.param.take(),
                wildcard: node.wildcard.take(),
            };
            node.children.push(split);
        }
        lit = &lit[common..];
        if lit.is_empty() {
            return node;
        }
        let first = lit.as_bytes()[0];
        let pos = node
            .children
            .iter()
            .position(|c| c.prefix.as_bytes().first() == Some(&first));
        match pos {
            Some(i) => node = &mut node.children[i],
            None => {
                node.children.push(Node {
                    prefix: lit.to_owned(),
                    ..Node::default()
                });
                let last = node.children.len() - 1;
                return &mut node.children[last];
            }
        }
    }
}

fn insert_param<'a>(node: &'a mut Node, name: &str, pattern: &str) -> &'a mut Node {
    if let Some(p) = &node.param {
        if &*p.name != name {
            panic!(
                "invalid route `{pattern}`: conflicting parameter names `:{}` and `:{name}` at the same position",
                p.name
            );
        }
    }
    let p = node.param.get_or_insert_with(|| {
        Box::new(ParamChild {
            name: Arc::from(name),
            node: Node::default(),
        })
    });
    &mut p.node
}

fn parse(pattern: &str) -> Vec<Token<'_>> {
    let bytes = pattern.as_bytes();
    let mut tokens = Vec::new();
    let mut lit_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b':' => {
                if lit_start < i {
                    tokens.push(Token::Literal(&pattern[lit_start..i]));
                }
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end] != b'/' {
                    end += 1;
                }
                if end == start {
                    panic!("invalid route `{pattern}`: empty parameter name");
                }
                tokens.push(Token::Param(&pattern[start..end]));
                lit_start = end;
                i = end;
            }
            b'*' => {
                if i + 1 != bytes.len() {
                    panic!("invalid route `{pattern}`: wildcard must terminate the pattern");
                }
                if lit_start < i {
                    tokens.push(Token::Literal(&pattern[lit_start..i]));
                }
                tokens.push(Token::Wildcard);
                lit_start = bytes.len();
                i = bytes.len();
            }
            _ => i += 1,
        }
    }
    if lit_start < bytes.len() {
        tokens.push(Token::Literal(&pattern[lit_start..]));
    }
    tokens
}

/// Longest common prefix, backed off to a character boundary so node
/// splits never land inside a multi-byte sequence.
fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut common = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    while common > 0 && !a.is_char_boundary(common) {
        common -= 1;
    }
    common
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::Error;
    use crate::handler::handler;

    async fn noop(_c: Context) -> Result<(), Error> {
        Ok(())
    }

    fn chain() -> DynHandler {
        handler(noop)
    }

    fn params_of(tree: &Tree, path: &str) -> Option<Vec<(String, String)>> {
        let mut captured = Vec::new();
        tree.lookup(path, &mut captured)?;
        Some(
            captured
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn static_route_matches_exactly() {
        let mut tree = Tree::new();
        tree.insert("/healthz", chain());
        assert_eq!(params_of(&tree, "/healthz"), Some(vec![]));
        assert_eq!(params_of(&tree, "/healthz/"), None);
        assert_eq!(params_of(&tree, "/health"), None);
    }

    #[test]
    fn param_captures_one_segment() {
        let mut tree = Tree::new();
        tree.insert("/users/:id", chain());
        assert_eq!(
            params_of(&tree, "/users/42"),
            Some(vec![("id".to_owned(), "42".to_owned())])
        );
        assert_eq!(params_of(&tree, "/users/42/files"), None);
        assert_eq!(params_of(&tree, "/users/"), None);
    }

    #[test]
    fn static_beats_param() {
        let mut tree = Tree::new();
        let by_id = chain();
        let active = chain();
        tree.insert("/users/:id", by_id.clone());
        tree.insert("/users/active", active.clone());

        let mut params = Vec::new();
        let found = tree.lookup("/users/active", &mut params).unwrap();
        assert!(Arc::ptr_eq(found, &active));
        assert!(params.is_empty());

        let found = tree.lookup("/users/activate", &mut params).unwrap();
        assert!(Arc::ptr_eq(found, &by_id));
        assert_eq!(&*params[0].1, "activate");
    }

    #[test]
    fn dead_end_static_backtracks_to_param() {
        let mut tree = Tree::new();
        tree.insert("/users/new", chain());
        tree.insert("/users/:id", chain());
        assert_eq!(
            params_of(&tree, "/users/news"),
            Some(vec![("id".to_owned(), "news".to_owned())])
        );
    }

    #[test]
    fn wildcard_captures_remaining_suffix() {
        let mut tree = Tree::new();
        tree.insert("/files/*", chain());
        assert_eq!(
            params_of(&tree, "/files/a/b/c"),
            Some(vec![("*".to_owned(), "a/b/c".to_owned())])
        );
        assert_eq!(
            params_of(&tree, "/files/"),
            Some(vec![("*".to_owned(), String::new())])
        );
        assert_eq!(params_of(&tree, "/files"), None);
    }

    #[test]
    fn param_beats_wildcard() {
        let mut tree = Tree::new();
        let by_name = chain();
        let rest = chain();
        tree.insert("/files/:name", by_name.clone());
        tree.insert("/files/*", rest.clone());

        let mut params = Vec::new();
        let found = tree.lookup("/files/notes.txt", &mut params).unwrap();
        assert!(Arc::ptr_eq(found, &by_name));

        params.clear();
        let found = tree.lookup("/files/a/b", &mut params).unwrap();
        assert!(Arc::ptr_eq(found, &rest));
        assert_eq!(&*params[0].1, "a/b");
    }

    #[test]
    fn multiple_params_capture_in_order() {
        let mut tree = Tree::new();
        let n = tree.insert("/repos/:owner/:repo/git/refs", chain());
        assert_eq!(n, 2);
        assert_eq!(
            params_of(&tree, "/repos/rust-lang/rust/git/refs"),
            Some(vec![
                ("owner".to_owned(), "rust-lang".to_owned()),
                ("repo".to_owned(), "rust".to_owned()),
            ])
        );
    }

    #[test]
    fn failed_branches_leave_no_captures() {
        let mut tree = Tree::new();
        tree.insert("/a/:x/b", chain());
        let mut params = Vec::new();
        assert!(tree.lookup("/a/value/c", &mut params).is_none());
        assert!(params.is_empty());
    }

    #[test]
    fn encoded_separator_stays_in_one_segment() {
        let mut tree = Tree::new();
        tree.insert("/:id", chain());
        assert_eq!(
            params_of(&tree, "/with%2Fslash"),
            Some(vec![("id".to_owned(), "with%2Fslash".to_owned())])
        );
    }

    #[test]
    fn reinsert_replaces_the_chain() {
        let mut tree = Tree::new();
        let first = chain();
        let second = chain();
        tree.insert("/todo", first);
        tree.insert("/todo", second.clone());

        let mut params = Vec::new();
        let found = tree.lookup("/todo", &mut params).unwrap();
        assert!(Arc::ptr_eq(found, &second));
    }

    #[test]
    fn shared_prefixes_are_split() {
        let mut tree = Tree::new();
        tree.insert("/users/active", chain());
        tree.insert("/users/archive", chain());
        tree.insert("/u", chain());
        assert!(params_of(&tree, "/users/active").is_some());
        assert!(params_of(&tree, "/users/archive").is_some());
        assert!(params_of(&tree, "/u").is_some());
        assert!(params_of(&tree, "/users").is_none());
    }

    #[test]
    #[should_panic(expected = "conflicting parameter names")]
    fn conflicting_param_names_panic() {
        let mut tree = Tree::new();
        tree.insert("/a/:x", chain());
        tree.insert("/a/:y", chain());
    }

    #[test]
    #[should_panic(expected = "wildcard must terminate")]
    fn interior_wildcard_panics() {
        let mut tree = Tree::new();
        tree.insert("/files/*/meta", chain());
    }

    #[test]
    #[should_panic(expected = "empty parameter name")]
    fn empty_param_name_panics() {
        let mut tree = Tree::new();
        tree.insert("/users/:/posts", chain());
    }
}
