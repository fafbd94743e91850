/// 有上限的整数 id 分配器，释放的 id 会被重新使用
///
/// ```ignore
/// let mut pool = IdPool::new(2);
/// let a = pool.alloc(); // Some(0)
/// let b = pool.alloc(); // Some(1)
/// assert!(pool.alloc().is_none());
/// pool.free(0);
/// let c = pool.alloc(); // Some(0)
/// ```
#[derive(Debug)]
pub struct IdPool {
    free_list: Vec<usize>,
    next_id: usize,
    len: usize,
    capacity: usize,
}

impl IdPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free_list: Vec::new(),
            next_id: 0,
            len: 0,
            capacity,
        }
    }

    /// 池已满时返回 `None`
    pub fn alloc(&mut self) -> Option<usize> {
        let id = match self.free_list.pop() {
            Some(id) => id,
            None if self.next_id < self.capacity => {
                self.next_id += 1;
                self.next_id - 1
            }
            None => return None,
        };
        self.len += 1;
        Some(id)
    }

    pub fn free(&mut self, id: usize) {
        debug_assert!(id < self.next_id, "freeing an unallocated id: {}", id);
        debug_assert!(!self.free_list.contains(&id), "double free of id: {}", id);
        self.len -= 1;
        self.free_list.push(id);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
