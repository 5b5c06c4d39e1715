//! Voice allocation and stealing
//!
//! The pool only tracks which voice is playing which buffer. It never
//! touches audio: callers render the tone, ask the pool for a voice, and
//! hand the buffer to the output sink themselves. All methods take
//! `&mut self`, so whoever owns the pool serializes every decision.

use crate::config::{ConfigError, MAX_VOICES};

/// Identity of one submitted tone buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// What a voice is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Playing(BufferId),
}

impl VoiceState {
    pub fn is_busy(self) -> bool {
        matches!(self, VoiceState::Playing(_))
    }
}

/// Result of asking the pool for a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Voice index the new buffer goes to
    pub voice: usize,
    /// Identity assigned to the new buffer
    pub buffer: BufferId,
    /// Buffer that was cut off to make room, if the voice was stolen
    pub stolen: Option<BufferId>,
}

/// Point-in-time copy of the pool state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub voices: Vec<VoiceState>,
    pub next_steal: usize,
}

impl PoolSnapshot {
    pub fn busy_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_busy()).count()
    }
}

/// Fixed set of voices with first-idle allocation and round-robin stealing
#[derive(Debug, Clone)]
pub struct VoicePool {
    voices: Vec<VoiceState>,
    next_steal: usize,
    next_buffer: u64,
}

impl VoicePool {
    /// Create a pool of `count` idle voices
    pub fn new(count: usize) -> Result<Self, ConfigError> {
        if !(1..=MAX_VOICES).contains(&count) {
            return Err(ConfigError::VoiceCount(count));
        }

        Ok(Self {
            voices: vec![VoiceState::Idle; count],
            next_steal: 0,
            next_buffer: 0,
        })
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn busy_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_busy()).count()
    }

    /// Voice that will be stolen when every voice is busy
    pub fn next_steal(&self) -> usize {
        self.next_steal
    }

    pub fn state(&self, voice: usize) -> Option<VoiceState> {
        self.voices.get(voice).copied()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            voices: self.voices.clone(),
            next_steal: self.next_steal,
        }
    }

    /// Pick a voice for a new buffer and mark it playing
    ///
    /// The lowest-indexed idle voice wins. With every voice busy, the voice
    /// under the round-robin cursor is stolen and the cursor moves on.
    pub fn allocate(&mut self) -> Allocation {
        let buffer = BufferId(self.next_buffer);
        self.next_buffer += 1;

        let (voice, stolen) = match self.voices.iter().position(|v| !v.is_busy()) {
            Some(idle) => (idle, None),
            None => {
                let victim = self.next_steal;
                self.next_steal = (self.next_steal + 1) % self.voices.len();
                match self.voices[victim] {
                    VoiceState::Playing(old) => (victim, Some(old)),
                    VoiceState::Idle => (victim, None),
                }
            }
        };

        self.voices[voice] = VoiceState::Playing(buffer);
        Allocation { voice, buffer, stolen }
    }

    /// Mark `voice` idle if it is still playing `buffer`
    ///
    /// Returns false for completions of buffers that were already replaced,
    /// and for unknown voices; neither changes any state.
    pub fn complete(&mut self, voice: usize, buffer: BufferId) -> bool {
        match self.voices.get_mut(voice) {
            Some(state) if *state == VoiceState::Playing(buffer) => {
                *state = VoiceState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Mark every voice idle, returning how many were playing
    ///
    /// For when the output is lost and no completions will ever arrive.
    /// Buffer ids keep counting, so late reports for the old tones stay stale.
    pub fn release_all(&mut self) -> usize {
        let released = self.busy_count();
        self.voices.fill(VoiceState::Idle);
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pool_creation() {
        let pool = VoicePool::new(5).unwrap();
        assert_eq!(pool.voice_count(), 5);
        assert_eq!(pool.busy_count(), 0);
        assert_eq!(pool.next_steal(), 0);
        assert_eq!(pool.state(4), Some(VoiceState::Idle));
        assert_eq!(pool.state(5), None);
    }

    #[test]
    fn test_pool_rejects_bad_sizes() {
        assert!(VoicePool::new(0).is_err());
        assert!(VoicePool::new(MAX_VOICES + 1).is_err());
        assert!(VoicePool::new(1).is_ok());
    }

    #[test]
    fn test_fill_all_voices() {
        let mut pool = VoicePool::new(5).unwrap();
        let mut buffers = HashSet::new();

        for expected in 0..5 {
            let alloc = pool.allocate();
            assert_eq!(alloc.voice, expected);
            assert_eq!(alloc.stolen, None);
            buffers.insert(alloc.buffer);
        }

        assert_eq!(pool.busy_count(), 5);
        assert_eq!(buffers.len(), 5);
        assert_eq!(pool.next_steal(), 0); // untouched until saturation
    }

    #[test]
    fn test_lowest_idle_voice_first() {
        let mut pool = VoicePool::new(4).unwrap();
        let allocs: Vec<_> = (0..4).map(|_| pool.allocate()).collect();

        assert!(pool.complete(2, allocs[2].buffer));
        assert!(pool.complete(1, allocs[1].buffer));

        assert_eq!(pool.allocate().voice, 1);
        assert_eq!(pool.allocate().voice, 2);
    }

    #[test]
    fn test_steal_at_cursor() {
        let mut pool = VoicePool::new(5).unwrap();
        let allocs: Vec<_> = (0..5).map(|_| pool.allocate()).collect();

        // Sixth note steals voice 0
        let sixth = pool.allocate();
        assert_eq!(sixth.voice, 0);
        assert_eq!(sixth.stolen, Some(allocs[0].buffer));
        assert_eq!(pool.next_steal(), 1);
        assert_eq!(pool.state(0), Some(VoiceState::Playing(sixth.buffer)));
        assert_eq!(pool.busy_count(), 5);

        let seventh = pool.allocate();
        assert_eq!(seventh.voice, 1);
        assert_eq!(seventh.stolen, Some(allocs[1].buffer));
        assert_eq!(pool.next_steal(), 2);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut pool = VoicePool::new(3).unwrap();
        for _ in 0..3 {
            pool.allocate();
        }

        let stolen: Vec<usize> = (0..7).map(|_| pool.allocate().voice).collect();
        assert_eq!(stolen, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(pool.next_steal(), 1);
    }

    #[test]
    fn test_cursor_survives_idle_period() {
        let mut pool = VoicePool::new(2).unwrap();
        let a = pool.allocate();
        let b = pool.allocate();
        let c = pool.allocate(); // steals voice 0
        assert_eq!(pool.next_steal(), 1);

        pool.complete(1, b.buffer);
        pool.complete(0, c.buffer);
        assert!(!pool.complete(0, a.buffer));
        assert_eq!(pool.busy_count(), 0);

        // Idle voices are used first, then stealing resumes at the cursor
        assert_eq!(pool.allocate().voice, 0);
        assert_eq!(pool.allocate().voice, 1);
        assert_eq!(pool.allocate().voice, 1);
        assert_eq!(pool.next_steal(), 0);
    }

    #[test]
    fn test_completion_frees_voice() {
        let mut pool = VoicePool::new(2).unwrap();
        let alloc = pool.allocate();

        assert!(pool.complete(alloc.voice, alloc.buffer));
        assert_eq!(pool.state(alloc.voice), Some(VoiceState::Idle));
        assert_eq!(pool.busy_count(), 0);

        // Completing twice is harmless
        assert!(!pool.complete(alloc.voice, alloc.buffer));
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut pool = VoicePool::new(1).unwrap();
        let old = pool.allocate();
        let new = pool.allocate();
        assert_eq!(new.stolen, Some(old.buffer));

        assert!(!pool.complete(0, old.buffer));
        assert_eq!(pool.state(0), Some(VoiceState::Playing(new.buffer)));

        assert!(pool.complete(0, new.buffer));
        assert_eq!(pool.state(0), Some(VoiceState::Idle));
    }

    #[test]
    fn test_unknown_voice_completion() {
        let mut pool = VoicePool::new(2).unwrap();
        let alloc = pool.allocate();
        assert!(!pool.complete(7, alloc.buffer));
        assert_eq!(pool.busy_count(), 1);
    }

    #[test]
    fn test_release_all() {
        let mut pool = VoicePool::new(3).unwrap();
        let allocs: Vec<_> = (0..4).map(|_| pool.allocate()).collect();

        assert_eq!(pool.release_all(), 3);
        assert_eq!(pool.busy_count(), 0);
        assert_eq!(pool.release_all(), 0);

        // Cursor is kept, and reports for released tones are stale
        assert_eq!(pool.next_steal(), 1);
        let next = pool.allocate();
        assert_eq!(next.voice, 0);
        assert!(!pool.complete(0, allocs[3].buffer));
        assert_eq!(pool.state(0), Some(VoiceState::Playing(next.buffer)));
    }

    #[test]
    fn test_snapshot() {
        let mut pool = VoicePool::new(3).unwrap();
        let alloc = pool.allocate();

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.busy_count(), 1);
        assert_eq!(snapshot.next_steal, 0);
        assert_eq!(
            snapshot.voices,
            vec![VoiceState::Playing(alloc.buffer), VoiceState::Idle, VoiceState::Idle]
        );
    }
}
