//! ShuffleBag
//!
//! In-place partial Fisher–Yates over a window `[offset, offset + count)` of
//! a borrowed slice. Each draw swaps the last unshuffled slot with a
//! uniformly chosen slot at or before it and yields the value that landed in
//! the last slot.
//!
//! `reset(true)` walks the swaps backwards, rewinding the generator to
//! regenerate each one, so both the slice order and the generator state end
//! up exactly where they were before the first draw.

use crate::errors::{RandomError, RandomResult};
use crate::pcg::FastRandom;

/// Reversible draw-without-replacement over part of a slice
#[derive(Debug)]
pub struct ShuffleBag<'a, T> {
    items: &'a mut [T],
    rng: FastRandom,
    offset: usize,
    count: usize,
    /// Slots `offset..offset + remaining` are still unshuffled
    remaining: usize,
    /// `(window, rejected)` for draws whose bounded draw rejected raw outputs
    rejections: Vec<(usize, u32)>,
}

impl<'a, T> ShuffleBag<'a, T> {
    /// Shuffle the whole slice
    pub fn new(items: &'a mut [T], rng: FastRandom) -> RandomResult<Self> {
        let count = items.len();
        Self::with_window(items, 0, count, rng)
    }

    /// Shuffle `count` items starting at `offset`
    pub fn with_window(
        items: &'a mut [T],
        offset: usize,
        count: usize,
        rng: FastRandom,
    ) -> RandomResult<Self> {
        let fits = offset
            .checked_add(count)
            .map_or(false, |end| end <= items.len());
        if !fits {
            return Err(RandomError::WindowOutOfBounds {
                offset,
                count,
                len: items.len(),
            });
        }
        if count as u64 > u32::MAX as u64 {
            return Err(RandomError::WindowTooLarge(count));
        }

        Ok(Self {
            items,
            rng,
            offset,
            count,
            remaining: count,
            rejections: Vec::new(),
        })
    }

    /// Items not yet drawn
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Window size
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The generator, in its current state
    pub fn rng(&self) -> &FastRandom {
        &self.rng
    }

    /// The underlying slice
    pub fn items(&self) -> &[T] {
        self.items
    }

    /// Draw the next item, or `None` once the window is exhausted
    pub fn draw(&mut self) -> Option<&T> {
        if self.remaining == 0 {
            return None;
        }

        let window = self.remaining;
        let last = self.offset + window - 1;
        let (pick, rejected) = self.rng.bounded_counted(window as u32);
        self.items.swap(last, self.offset + pick as usize);
        if rejected > 0 {
            self.rejections.push((window, rejected));
        }

        self.remaining -= 1;
        Some(&self.items[last])
    }

    /// Start over
    ///
    /// With `unshuffle`, every swap is undone in reverse order and the
    /// generator is rewound to its state before the first draw. Without it,
    /// the current order is kept as the new starting point and the generator
    /// continues.
    pub fn reset(&mut self, unshuffle: bool) {
        if unshuffle {
            for window in self.remaining + 1..=self.count {
                // Regenerate the accepted raw draw for this step
                self.rng.jump(-1);
                let raw = self.rng.next_u32();
                let pick = ((raw as u64 * window as u64) >> 32) as usize;
                self.items.swap(self.offset + window - 1, self.offset + pick);
                self.rng.jump(-1);

                if let Some(&(w, rejected)) = self.rejections.last() {
                    if w == window {
                        self.rng.jump(-(rejected as i64));
                        self.rejections.pop();
                    }
                }
            }
        }

        self.rejections.clear();
        self.remaining = self.count;
    }

    /// Release the slice and the generator
    pub fn into_parts(self) -> (&'a mut [T], FastRandom) {
        (self.items, self.rng)
    }
}

impl<'a, T: Clone> ShuffleBag<'a, T> {
    /// Draw every remaining item, in draw order
    pub fn drain_order(&mut self) -> Vec<T> {
        let mut order = Vec::with_capacity(self.remaining);
        while let Some(item) = self.draw() {
            order.push(item.clone());
        }
        order
    }
}
