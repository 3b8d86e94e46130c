//! Fixed-capacity circular history buffer.

use core::marker::PhantomData;

/// A circular buffer over a borrowed or owned slice-like container.
///
/// New values overwrite the oldest entry once the buffer is full. Entries are
/// addressed relative to the write cursor: `get_back(0)` is the most recently
/// pushed value, `get_back(k)` the value pushed `k` calls earlier. This keeps
/// the window lookups and the retrospective back-search O(1) per access
/// instead of shifting the whole buffer every sample.
#[derive(Debug)]
pub struct Ring<T, C> {
    buffer: C,
    idx: usize,
    full: bool,
    _marker: PhantomData<T>,
}

impl<T: Default + Copy, const N: usize> Default for Ring<T, [T; N]> {
    fn default() -> Self {
        Self::new([T::default(); N])
    }
}

impl<T, C> Ring<T, C>
where
    T: Copy,
    C: AsRef<[T]> + AsMut<[T]>,
{
    pub fn new(buffer: C) -> Self {
        Self {
            buffer,
            idx: 0,
            full: false,
            _marker: PhantomData,
        }
    }

    pub fn clear(&mut self) {
        self.idx = 0;
        self.full = false;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().len()
    }

    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            self.idx
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn push(&mut self, value: T) {
        let buffer = self.buffer.as_mut();
        buffer[self.idx] = value;
        self.idx = (self.idx + 1) % buffer.len();
        if self.idx == 0 {
            self.full = true;
        }
    }

    /// Value pushed most recently, if any.
    pub fn last(&self) -> Option<T> {
        self.get_back(0)
    }

    /// Value pushed `back` calls ago; `None` once the position has been
    /// evicted or was never written.
    pub fn get_back(&self, back: usize) -> Option<T> {
        if back >= self.len() {
            return None;
        }
        let cap = self.capacity();
        let pos = (self.idx + cap - 1 - back) % cap;
        Some(self.buffer.as_ref()[pos])
    }

    /// Overwrites the value pushed `back` calls ago. Out-of-range positions
    /// are ignored.
    pub fn set_back(&mut self, back: usize, value: T) {
        if back >= self.len() {
            return;
        }
        let cap = self.capacity();
        let pos = (self.idx + cap - 1 - back) % cap;
        self.buffer.as_mut()[pos] = value;
    }

    /// Iterates the retained values, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let len = self.len();
        (0..len).map(move |i| {
            let back = len - 1 - i;
            let cap = self.capacity();
            let pos = (self.idx + cap - 1 - back) % cap;
            self.buffer.as_ref()[pos]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_then_evicts_oldest() {
        let mut ring: Ring<u32, [u32; 4]> = Ring::default();
        assert!(ring.is_empty());

        for v in 1..=4 {
            ring.push(v);
        }
        assert!(ring.is_full());
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);

        ring.push(5);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn look_back_is_relative_to_cursor() {
        let mut ring: Ring<u32, [u32; 3]> = Ring::default();
        ring.push(10);
        ring.push(20);

        assert_eq!(ring.last(), Some(20));
        assert_eq!(ring.get_back(1), Some(10));
        assert_eq!(ring.get_back(2), None);

        ring.push(30);
        ring.push(40); // evicts 10
        assert_eq!(ring.get_back(2), Some(20));
        assert_eq!(ring.get_back(3), None);
    }

    #[test]
    fn set_back_rewrites_history() {
        let mut ring: Ring<bool, [bool; 4]> = Ring::default();
        for _ in 0..4 {
            ring.push(false);
        }
        ring.set_back(2, true);
        assert_eq!(ring.get_back(2), Some(true));
        assert_eq!(ring.get_back(1), Some(false));
        // out of range is a no-op
        ring.set_back(10, true);
    }

    #[test]
    fn debug_formatting_is_available() {
        let mut ring: Ring<u32, [u32; 2]> = Ring::default();
        ring.push(7);
        let formatted = format!("{ring:?}");
        assert!(formatted.contains("Ring"));
        assert!(formatted.contains('7'));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut ring: Ring<u32, [u32; 2]> = Ring::default();
        ring.push(1);
        ring.push(2);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.last(), None);
    }
}
