use std::collections::VecDeque;

/// A window entry: a vocabulary index, or `None` for a token the vocabulary does not know.
pub type Slot = Option<usize>;

/// Fixed-capacity ring of token slots spanning `half_width` tokens on each side of a center.
#[derive(Clone, Debug)]
pub struct ContextWindow {
    slots: VecDeque<Slot>,
    half_width: usize,
}

impl ContextWindow {

    pub fn new(half_width: usize) -> Self {
        Self {
            slots: VecDeque::with_capacity(2 * half_width + 1),
            half_width,
        }
    }

    pub fn half_width(&self) -> usize {
        self.half_width
    }

    pub fn capacity(&self) -> usize {
        2 * self.half_width + 1
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn push_back(&mut self, slot: Slot) {
        debug_assert!(!self.is_full(), "push into a full context window");
        self.slots.push_back(slot);
    }

    pub fn pop_front(&mut self) -> Option<Slot> {
        self.slots.pop_front()
    }

    /// The slot at offset `half_width`, available once the window is full.
    pub fn center(&self) -> Option<Slot> {
        if self.is_full() {
            self.slots.get(self.half_width).copied()
        } else {
            None
        }
    }

    /// Every slot except the center, in window order.
    pub fn neighbours(&self) -> impl Iterator<Item = Slot> + '_ {
        let center = self.half_width;
        self.slots
            .iter()
            .enumerate()
            .filter(move |(pos, _)| *pos != center)
            .map(|(_, slot)| *slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        self.slots.iter().copied()
    }

}
