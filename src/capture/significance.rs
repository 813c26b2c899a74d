//! Perceptual-hash de-duplication of screenshots
//!
//! A frame is significant when its average hash is further than the
//! threshold from the last *persisted* frame. Rejected frames leave the
//! reference hash alone, so slow drift eventually crosses the threshold.

use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};

use crate::core::Result;

/// 64-bit average hash of a screenshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    /// Hash a decoded image
    pub fn of_image(img: &DynamicImage) -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .hash_size(8, 8)
            .to_hasher();

        let hash = hasher.hash_image(img);
        let bits = hash
            .as_bytes()
            .iter()
            .take(8)
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        Self(bits)
    }

    /// Decode PNG/JPEG bytes and hash them
    pub fn of_screenshot(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::of_image(&img))
    }

    /// Number of differing bits
    pub fn distance(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl std::fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Per-run filter state
#[derive(Debug, Clone)]
pub struct StateChangeFilter {
    threshold: u32,
    last_hash: Option<PerceptualHash>,
    count: usize,
}

impl StateChangeFilter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            last_hash: None,
            count: 0,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Hash of the last persisted frame
    pub fn last_hash(&self) -> Option<PerceptualHash> {
        self.last_hash
    }

    /// Frames accepted so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// Distance from the reference frame, if there is one
    pub fn distance_to_last(&self, hash: PerceptualHash) -> Option<u32> {
        self.last_hash.map(|last| hash.distance(last))
    }

    /// Whether the frame would be accepted, without changing state
    pub fn is_significant(&self, hash: PerceptualHash) -> bool {
        self.distance_to_last(hash)
            .map_or(true, |distance| distance > self.threshold)
    }

    /// Make `hash` the new reference frame
    pub fn record(&mut self, hash: PerceptualHash) {
        self.last_hash = Some(hash);
        self.count += 1;
    }

    /// Decide on an already-hashed frame, updating state when significant
    pub fn observe(&mut self, hash: PerceptualHash) -> bool {
        let significant = self.is_significant(hash);
        if significant {
            self.record(hash);
        }
        significant
    }

    /// Hash raw screenshot bytes and decide
    pub fn observe_screenshot(&mut self, bytes: &[u8]) -> Result<bool> {
        let hash = PerceptualHash::of_screenshot(bytes)?;
        Ok(self.observe(hash))
    }

    /// Forget the reference frame so the next one is accepted unconditionally
    pub fn reset(&mut self) {
        self.last_hash = None;
    }
}


#[cfg(test)]
mod tests {
    use super::test_images::*;
    use super::*;

    #[test]
    fn test_first_frame_always_significant() {
        let mut filter = StateChangeFilter::new(7);
        assert!(filter.observe(PerceptualHash::from_bits(0)));
        assert_eq!(filter.count(), 1);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut filter = StateChangeFilter::new(7);
        filter.observe(PerceptualHash::from_bits(0));

        // exactly 7 bits apart: not enough
        assert!(!filter.observe(PerceptualHash::from_bits(0b111_1111)));
        // 8 bits apart: new state
        assert!(filter.observe(PerceptualHash::from_bits(0xff)));
        assert_eq!(filter.last_hash(), Some(PerceptualHash::from_bits(0xff)));
    }

    #[test]
    fn test_near_duplicates_never_pass() {
        let mut filter = StateChangeFilter::new(6);
        filter.observe(PerceptualHash::from_bits(u64::MAX));
        for flipped in 1..=6u32 {
            let bits = u64::MAX << flipped;
            assert!(!filter.observe(PerceptualHash::from_bits(bits)), "{flipped} bits");
        }
        assert_eq!(filter.count(), 1);
    }

    #[test]
    fn test_rejected_frames_do_not_move_reference() {
        let mut filter = StateChangeFilter::new(7);
        filter.observe(PerceptualHash::from_bits(0));

        // each step drifts 4 more bits away from the start
        assert!(!filter.observe(PerceptualHash::from_bits(0xf)));
        assert_eq!(filter.last_hash(), Some(PerceptualHash::from_bits(0)));
        assert!(filter.observe(PerceptualHash::from_bits(0xff)));
    }

    #[test]
    fn test_peek_does_not_record() {
        let mut filter = StateChangeFilter::new(7);
        let frame = PerceptualHash::from_bits(0xffff);
        assert!(filter.is_significant(frame));
        assert_eq!(filter.count(), 0);

        filter.record(frame);
        assert_eq!(filter.distance_to_last(PerceptualHash::from_bits(0)), Some(16));
        assert!(!filter.is_significant(frame));
    }

    #[test]
    fn test_reset_accepts_next_frame() {
        let mut filter = StateChangeFilter::new(7);
        filter.observe(PerceptualHash::from_bits(42));
        filter.reset();
        assert!(filter.observe(PerceptualHash::from_bits(42)));
    }

    #[test]
    fn test_screenshot_hashing() {
        let left_right = halves_png(true, false);
        let nudged = halves_png(true, true);
        let top_bottom = halves_png(false, false);

        let a = PerceptualHash::of_screenshot(&left_right).unwrap();
        let b = PerceptualHash::of_screenshot(&nudged).unwrap();
        let c = PerceptualHash::of_screenshot(&top_bottom).unwrap();
        let d = PerceptualHash::of_screenshot(&checker_png()).unwrap();

        assert!(a.distance(b) <= 6);
        assert!(a.distance(c) > 8);
        assert!(a.distance(d) > 8);

        let mut filter = StateChangeFilter::new(7);
        assert!(filter.observe_screenshot(&left_right).unwrap());
        assert!(!filter.observe_screenshot(&nudged).unwrap());
        assert!(filter.observe_screenshot(&top_bottom).unwrap());
    }

    #[test]
    fn test_garbage_bytes_error() {
        let mut filter = StateChangeFilter::new(7);
        assert!(filter.observe_screenshot(b"not an image").is_err());
        assert_eq!(filter.last_hash(), None);
    }
}
