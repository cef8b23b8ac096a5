//! Registry of created resources, released in one pass at teardown

/// Records every resource at creation time so teardown does not have to
/// rediscover them from the live scene.
#[derive(Debug, Clone)]
pub struct ResourceArena<T> {
    items: Vec<T>,
}

impl<T> Default for ResourceArena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Clone> ResourceArena<T> {
    /// Register a resource and hand it back
    pub fn track(&mut self, item: T) -> T {
        self.items.push(item.clone());
        item
    }
}

impl<T> ResourceArena<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Forget entries matching `pred` (released early by their owner)
    pub fn forget(&mut self, pred: impl Fn(&T) -> bool) {
        self.items.retain(|item| !pred(item));
    }

    /// Release everything, newest first. Returns the number released.
    pub fn release_all(&mut self, mut release: impl FnMut(T)) -> usize {
        let count = self.items.len();
        while let Some(item) = self.items.pop() {
            release(item);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_newest_first() {
        let mut arena = ResourceArena::default();
        arena.track(1);
        arena.track(2);
        arena.track(3);

        let mut released = Vec::new();
        assert_eq!(arena.release_all(|i| released.push(i)), 3);
        assert_eq!(released, vec![3, 2, 1]);
        assert!(arena.is_empty());

        // Second teardown has nothing left
        assert_eq!(arena.release_all(|_| panic!("double release")), 0);
    }

    #[test]
    fn test_forget() {
        let mut arena = ResourceArena::default();
        for i in 0..5 {
            arena.track(i);
        }
        arena.forget(|i| i % 2 == 0);
        assert_eq!(arena.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    }
}
