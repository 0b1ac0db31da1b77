use crate::store::Entity;

/// In-memory mirror of one entity collection.
///
/// Reads hand out copies, so callers can never mutate the collection behind
/// the controller's back.
#[derive(Debug, Clone)]
pub struct Repository<E> {
    items: Vec<E>,
}

impl<E: Entity> Repository<E> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_vec(items: Vec<E>) -> Self {
        Self { items }
    }

    /// A copy of every entity, in insertion order.
    pub fn get_all(&self) -> Vec<E> {
        self.items.clone()
    }

    pub fn get(&self, id: i64) -> Option<&E> {
        self.items.iter().find(|e| e.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: i64) -> Option<&mut E> {
        self.items.iter_mut().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    pub fn add(&mut self, entity: E) {
        self.items.push(entity);
    }

    /// Replaces the entity with the same ID. Returns `false` and leaves the
    /// collection untouched when there is none.
    pub fn update(&mut self, entity: E) -> bool {
        match self.get_mut(entity.id()) {
            Some(slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    /// Removes every entity with this ID and returns how many went.
    pub fn delete(&mut self, id: i64) -> usize {
        let before = self.items.len();
        self.items.retain(|e| e.id() != id);
        before - self.items.len()
    }

    pub fn retain(&mut self, keep: impl FnMut(&E) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(keep);
        before - self.items.len()
    }

    pub fn find_all(&self, mut matches: impl FnMut(&E) -> bool) -> Vec<E> {
        self.items.iter().filter(|e| matches(e)).cloned().collect()
    }

    pub fn any(&self, matches: impl FnMut(&E) -> bool) -> bool {
        self.items.iter().any(matches)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut E> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<E: Entity> Default for Repository<E> {
    fn default() -> Self {
        Self::new()
    }
}
