//! Clip queue with a single forward cursor
//!
//! The cursor starts at "not started" and only ever moves forward through
//! [`Playlist::next`]. Replacing the queue with [`Playlist::set`] or
//! [`Playlist::clear`] is the only way back to the start.

use crate::types::{Clip, Clips};

/// Ordered clip queue
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    items: Vec<Clip>,
    /// Index of the current clip, `None` before the first `next()`
    cursor: Option<usize>,
}

impl Playlist {
    /// Create an empty playlist
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of enqueued clips
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cursor position, -1 when not started
    pub fn cursor(&self) -> isize {
        self.cursor.map_or(-1, |i| i as isize)
    }

    /// Clip under the cursor
    pub fn current(&self) -> Option<&Clip> {
        self.cursor.and_then(|i| self.items.get(i))
    }

    pub fn has_next(&self) -> bool {
        self.cursor() < self.items.len() as isize - 1
    }

    /// Advance the cursor and return the new current clip.
    ///
    /// Leaves the playlist untouched when there is nothing left.
    pub fn next(&mut self) -> Option<&Clip> {
        if !self.has_next() {
            return None;
        }
        let index = self.cursor.map_or(0, |i| i + 1);
        self.cursor = Some(index);
        self.items.get(index)
    }

    /// Replace the whole queue and rewind
    pub fn set(&mut self, clips: impl Into<Clips>) {
        self.items = clips.into().into_vec();
        self.cursor = None;
    }

    /// Append without moving the cursor
    pub fn push(&mut self, clips: impl Into<Clips>) {
        self.items.extend(clips.into().into_vec());
    }

    /// Remove the first clip.
    ///
    /// The cursor keeps pointing at the same clip it did before, which for
    /// the removed clip means "not started".
    pub fn pop_front(&mut self) -> Option<Clip> {
        if self.items.is_empty() {
            return None;
        }
        self.cursor = self.cursor.and_then(|i| i.checked_sub(1));
        Some(self.items.remove(0))
    }

    /// Empty the queue and rewind
    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
    }

    /// All enqueued clips in order
    pub fn clips(&self) -> &[Clip] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clips(sources: &[&str]) -> Vec<Clip> {
        sources.iter().map(|s| Clip::new(*s)).collect()
    }

    #[test]
    fn test_empty_playlist() {
        let mut playlist = Playlist::new();
        assert_eq!(playlist.len(), 0);
        assert_eq!(playlist.cursor(), -1);
        assert!(playlist.current().is_none());
        assert!(!playlist.has_next());
        assert!(playlist.next().is_none());
    }

    #[test]
    fn test_has_next_counts_exactly_len() {
        let mut playlist = Playlist::new();
        playlist.set(clips(&["a", "b", "c"]));

        let mut advanced = 0;
        while playlist.has_next() {
            let clip = playlist.next().cloned().unwrap();
            advanced += 1;
            assert_eq!(playlist.current(), Some(&clip));
            assert_eq!(playlist.current(), playlist.clips().get(advanced - 1));
        }
        assert_eq!(advanced, 3);

        // Stays exhausted
        for _ in 0..3 {
            assert!(!playlist.has_next());
            assert!(playlist.next().is_none());
        }
    }

    #[test]
    fn test_next_when_exhausted_is_noop() {
        let mut playlist = Playlist::new();
        playlist.set(clips(&["a"]));
        playlist.next();

        assert!(playlist.next().is_none());
        assert_eq!(playlist.cursor(), 0);
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.current().map(|c| c.source.as_str()), Some("a"));
    }

    #[test]
    fn test_push_keeps_cursor() {
        let mut playlist = Playlist::new();
        playlist.set(clips(&["a", "b"]));
        playlist.next();

        playlist.push(Clip::new("c"));
        assert_eq!(playlist.len(), 3);
        assert_eq!(playlist.cursor(), 0);
        assert!(playlist.has_next());

        playlist.set(Clip::new("c"));
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.cursor(), -1);
    }

    #[test]
    fn test_push_revives_exhausted_queue() {
        let mut playlist = Playlist::new();
        playlist.set(clips(&["a"]));
        playlist.next();
        assert!(!playlist.has_next());

        playlist.push(clips(&["b"]));
        assert_eq!(playlist.next().map(|c| c.source.as_str()), Some("b"));
    }

    #[test]
    fn test_pop_front_adjusts_cursor() {
        let mut playlist = Playlist::new();
        playlist.set(clips(&["a", "b", "c"]));
        playlist.next();

        let removed = playlist.pop_front().unwrap();
        assert_eq!(removed.source, "a");
        assert_eq!(playlist.cursor(), -1);
        assert_eq!(playlist.next().map(|c| c.source.as_str()), Some("b"));

        // Cursor on the second item follows it to index 0
        playlist.set(clips(&["a", "b"]));
        playlist.next();
        playlist.next();
        playlist.pop_front();
        assert_eq!(playlist.current().map(|c| c.source.as_str()), Some("b"));
    }

    #[test]
    fn test_pop_front_on_empty() {
        let mut playlist = Playlist::new();
        assert!(playlist.pop_front().is_none());
        assert_eq!(playlist.cursor(), -1);
    }

    #[test]
    fn test_clear() {
        let mut playlist = Playlist::new();
        playlist.set(clips(&["a", "b"]));
        playlist.next();
        playlist.clear();

        assert!(playlist.is_empty());
        assert_eq!(playlist.cursor(), -1);
        assert!(playlist.current().is_none());
    }
}
