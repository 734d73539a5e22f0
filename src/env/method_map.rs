//! Case-insensitive method table.
//!
//! Call sites precompute the name hash once at AST construction; lookup
//! narrows to a bucket by hash and confirms with a case-folded comparison,
//! so collisions cost a short in-bucket scan and nothing else.

use std::rc::Rc;

use crate::program::function::Function;

/// Rolling case-folded hash. Stable across the process, computed at
/// call-site construction for static method names.
pub fn hash(name: &str) -> u32 {
    let mut h: u32 = 17;
    for &b in name.as_bytes() {
        h = h
            .wrapping_mul(65537)
            .wrapping_add(b.to_ascii_lowercase() as u32);
    }
    h
}

struct Entry {
    name: Rc<str>,
    func: Rc<Function>,
}

pub struct MethodMap {
    buckets: Vec<Vec<Entry>>,
    len: usize,
}

impl Default for MethodMap {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodMap {
    pub fn new() -> Self {
        Self {
            buckets: (0..16).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn put(&mut self, name: Rc<str>, func: Rc<Function>) {
        if self.buckets.len() <= self.len * 4 {
            self.resize();
        }
        let bucket = (hash(&name) as usize) & (self.buckets.len() - 1);
        for entry in &mut self.buckets[bucket] {
            if entry.name.eq_ignore_ascii_case(&name) {
                entry.func = func;
                return;
            }
        }
        self.buckets[bucket].push(Entry { name, func });
        self.len += 1;
    }

    /// Lookup with a precomputed hash; the full comparison resolves
    /// collisions within the bucket.
    pub fn get(&self, hash: u32, name: &str) -> Option<&Rc<Function>> {
        let bucket = (hash as usize) & (self.buckets.len() - 1);
        self.buckets[bucket]
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| &entry.func)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Rc<Function>> {
        self.get(hash(name), name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get_by_name(name).is_some()
    }

    pub fn values(&self) -> impl Iterator<Item = &Rc<Function>> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.iter().map(|entry| &entry.func))
    }

    fn resize(&mut self) {
        let new_size = self.buckets.len() * 2;
        let mut buckets: Vec<Vec<Entry>> = (0..new_size).map(|_| Vec::new()).collect();
        for entry in self.buckets.drain(..).flatten() {
            let bucket = (hash(&entry.name) as usize) & (new_size - 1);
            buckets[bucket].push(entry);
        }
        self.buckets = buckets;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::function::Function;

    fn stub(name: &str) -> Rc<Function> {
        Rc::new(Function::new(name, Vec::new(), Vec::new()))
    }

    #[test]
    fn hash_is_case_insensitive() {
        assert_eq!(hash("getValue"), hash("GETVALUE"));
        assert_ne!(hash("getValue"), hash("getValues"));
    }

    #[test]
    fn lookup_ignores_case() {
        let mut map = MethodMap::new();
        map.put("getValue".into(), stub("getValue"));
        assert!(map.get_by_name("GETVALUE").is_some());
        assert!(map.get_by_name("getvalue").is_some());
        assert!(map.get_by_name("other").is_none());
    }

    #[test]
    fn put_replaces_case_variant() {
        let mut map = MethodMap::new();
        map.put("m".into(), stub("m"));
        map.put("M".into(), stub("M"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn survives_resize() {
        let mut map = MethodMap::new();
        let names: Vec<String> = (0..64).map(|i| format!("method{}", i)).collect();
        for name in &names {
            map.put(name.as_str().into(), stub(name));
        }
        assert_eq!(map.len(), 64);
        for name in &names {
            assert!(map.get(hash(name), name).is_some(), "lost {}", name);
        }
    }
}
