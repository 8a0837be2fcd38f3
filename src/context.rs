//! Parsing/building context: a chain of name→value scopes.
//!
//! Each aggregate (Struct, and embedded constructs through it) pushes a
//! scope for the duration of one parse or build call. Writes go to the
//! innermost scope; lookup walks outward to the root. User callbacks
//! (predicates, selectors, contextual factories) read earlier siblings and
//! ancestors through this chain.

use indexmap::IndexMap;

use crate::value::{Record, Value};

#[derive(Debug, Default)]
struct Scope {
    entries: IndexMap<String, Value>,
}

/// The scope chain for one top-level parse/build/sizeof call.
#[derive(Debug)]
pub struct Context {
    scopes: Vec<Scope>,
}

/// Snapshot of the chain shape, taken at construct entry so a failure can
/// discard scopes and keys written since.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContextMark {
    depth: usize,
    top_len: usize,
}

impl Context {
    /// A fresh context with an empty root scope.
    pub fn new() -> Self {
        Context {
            scopes: vec![Scope::default()],
        }
    }

    /// A context whose root scope is seeded with the given entries. Used to
    /// supply externally known values (e.g. checksum source data) to a
    /// top-level call.
    pub fn seeded(entries: Record) -> Self {
        Context {
            scopes: vec![Scope { entries }],
        }
    }

    /// Look `name` up, walking from the innermost scope to the root.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.entries.get(name))
    }

    /// Look `name` up in the root scope only.
    pub fn get_root(&self, name: &str) -> Option<&Value> {
        self.scopes[0].entries.get(name)
    }

    /// Look `name` up starting from the parent of the innermost scope.
    pub fn get_parent(&self, name: &str) -> Option<&Value> {
        let n = self.scopes.len();
        self.scopes[..n.saturating_sub(1)]
            .iter()
            .rev()
            .find_map(|s| s.entries.get(name))
    }

    /// Write into the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.scopes
            .last_mut()
            .expect("context always has a root scope")
            .entries
            .insert(name.into(), value);
    }

    // Typed accessors for user callbacks; the String error is wrapped as an
    // adapter failure by the construct invoking the callback.

    pub fn uint(&self, name: &str) -> Result<u64, String> {
        self.get(name)
            .ok_or_else(|| format!("no value named {:?} in scope", name))?
            .as_uint()
            .ok_or_else(|| format!("{:?} is not an unsigned integer", name))
    }

    pub fn int(&self, name: &str) -> Result<i64, String> {
        self.get(name)
            .ok_or_else(|| format!("no value named {:?} in scope", name))?
            .as_int()
            .ok_or_else(|| format!("{:?} is not an integer", name))
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8], String> {
        self.get(name)
            .ok_or_else(|| format!("no value named {:?} in scope", name))?
            .as_bytes()
            .ok_or_else(|| format!("{:?} is not a byte string", name))
    }

    pub fn str(&self, name: &str) -> Result<&str, String> {
        self.get(name)
            .ok_or_else(|| format!("no value named {:?} in scope", name))?
            .as_str()
            .ok_or_else(|| format!("{:?} is not a text string", name))
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Push a scope pre-filled from a build record, so later fields see the
    /// values of earlier ones even before they are built.
    pub(crate) fn push_scope_seeded(&mut self, record: &Record) {
        self.scopes.push(Scope {
            entries: record.clone(),
        });
    }

    pub(crate) fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the root scope");
        self.scopes.pop();
    }

    /// The innermost scope's entries, taken by value. Struct parse turns
    /// its scope into the returned record through this.
    pub(crate) fn take_top(&mut self) -> IndexMap<String, Value> {
        std::mem::take(
            &mut self
                .scopes
                .last_mut()
                .expect("context always has a root scope")
                .entries,
        )
    }

    pub(crate) fn mark(&self) -> ContextMark {
        ContextMark {
            depth: self.scopes.len(),
            top_len: self.scopes.last().map(|s| s.entries.len()).unwrap_or(0),
        }
    }

    /// Discard scopes pushed and keys written since `mark`. Keys that were
    /// overwritten in place are not rolled back; a failing construct only
    /// ever appends fresh keys before failing.
    pub(crate) fn restore(&mut self, mark: ContextMark) {
        self.scopes.truncate(mark.depth);
        if let Some(top) = self.scopes.last_mut() {
            top.entries.truncate(mark.top_len);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_to_root() {
        let mut ctx = Context::new();
        ctx.set("a", Value::Uint(1));
        ctx.push_scope();
        ctx.set("b", Value::Uint(2));
        assert_eq!(ctx.get("a"), Some(&Value::Uint(1)));
        assert_eq!(ctx.get("b"), Some(&Value::Uint(2)));
        assert_eq!(ctx.get_parent("b"), None);
        assert_eq!(ctx.get_parent("a"), Some(&Value::Uint(1)));
        ctx.pop_scope();
        assert_eq!(ctx.get("b"), None);
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut ctx = Context::new();
        ctx.set("n", Value::Uint(1));
        ctx.push_scope();
        ctx.set("n", Value::Uint(2));
        assert_eq!(ctx.uint("n"), Ok(2));
        assert_eq!(ctx.get_root("n"), Some(&Value::Uint(1)));
    }

    #[test]
    fn restore_discards_scopes_and_keys() {
        let mut ctx = Context::new();
        ctx.set("kept", Value::Uint(1));
        let mark = ctx.mark();
        ctx.set("dropped", Value::Uint(2));
        ctx.push_scope();
        ctx.set("inner", Value::Uint(3));
        ctx.restore(mark);
        assert_eq!(ctx.get("kept"), Some(&Value::Uint(1)));
        assert_eq!(ctx.get("dropped"), None);
        assert_eq!(ctx.get("inner"), None);
    }
}
