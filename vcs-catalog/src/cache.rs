use std::collections::HashMap;

use vcs_core::Vid;

use crate::objects::{Object, ObjectKind};

///
/// Objects a session has already fetched, keyed by kind and catalog id.
///
#[derive(Debug, Default)]
pub struct ObjectCache {
    objects: HashMap<(ObjectKind, u64), Object>,
    by_vid: HashMap<Vid, (ObjectKind, u64)>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u64, object: Object) {
        let key = (object.kind(), id);
        self.by_vid.insert(object.vid().clone(), key);
        self.objects.insert(key, object);
    }

    pub fn get(&self, kind: ObjectKind, id: u64) -> Option<&Object> {
        self.objects.get(&(kind, id))
    }

    pub fn get_by_vid(&self, vid: &Vid) -> Option<&Object> {
        self.by_vid.get(vid).and_then(|key| self.objects.get(key))
    }

    pub fn evict(&mut self, vid: &Vid) -> Option<Object> {
        self.by_vid
            .remove(vid)
            .and_then(|key| self.objects.remove(&key))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.by_vid.clear();
    }
}
