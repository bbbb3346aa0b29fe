// megadrive-core/src/core/sound.rs

//! Audio glue between the scheduler and the sound chips.
//!
//! The chips accumulate into 32-bit per-channel buffers, one segment per
//! frame. Each scanline renders its share of the segment as given by the
//! extrapolation table, and at frame end the segment is clamped into 16-bit
//! PCM with [`write_stereo`] or [`write_mono`].

use cfg_if::cfg_if;

/// Per-line slice of the audio segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrapolationTable {
    pos: Vec<usize>,
    len: Vec<usize>,
    segment: usize,
}

impl ExtrapolationTable {
    /// `segment = sample_rate / fps` samples spread over `lines` scanlines.
    pub fn new(sample_rate: u32, fps: u32, lines: u32) -> Self {
        let segment = (sample_rate / fps.max(1)) as usize;
        let lines = lines.max(1) as usize;

        let pos: Vec<usize> = (0..lines).map(|i| segment * i / lines).collect();
        let len = (0..lines)
            .map(|i| segment * (i + 1) / lines - pos[i])
            .collect();

        Self { pos, len, segment }
    }

    /// Samples per frame
    pub fn segment_length(&self) -> usize {
        self.segment
    }

    pub fn lines(&self) -> usize {
        self.pos.len()
    }

    /// Start and length of a line's samples. Lines past the table are empty.
    #[inline]
    pub fn line(&self, line: usize) -> (usize, usize) {
        match (self.pos.get(line), self.len.get(line)) {
            (Some(&pos), Some(&len)) => (pos, len),
            _ => (self.segment, 0),
        }
    }
}

/// One frame of accumulated samples
#[derive(Debug, Clone, Default)]
pub struct AudioSegment {
    pub left: Vec<i32>,
    pub right: Vec<i32>,
}

impl AudioSegment {
    pub fn new(len: usize) -> Self {
        Self {
            left: vec![0; len],
            right: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn resize(&mut self, len: usize) {
        self.left.resize(len, 0);
        self.right.resize(len, 0);
    }

    pub fn clear(&mut self) {
        self.left.fill(0);
        self.right.fill(0);
    }

    /// Buffers for `len` samples starting at `pos`, clipped to the segment.
    pub fn window(&mut self, pos: usize, len: usize) -> (&mut [i32], &mut [i32]) {
        let start = pos.min(self.left.len());
        let end = (pos + len).min(self.left.len());
        (&mut self.left[start..end], &mut self.right[start..end])
    }
}

#[inline]
fn clamp16(sample: i32) -> i16 {
    sample.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

cfg_if! {
    if #[cfg(all(md_wide_mix, feature = "simd"))] {
        const LANES: usize = 8;

        fn mix_stereo(dst: &mut [i16], left: &[i32], right: &[i32]) {
            let mut out = dst.chunks_exact_mut(LANES * 2);
            let mut l = left.chunks_exact(LANES);
            let mut r = right.chunks_exact(LANES);
            for ((o, l), r) in (&mut out).zip(&mut l).zip(&mut r) {
                for i in 0..LANES {
                    o[i * 2] = clamp16(l[i]);
                    o[i * 2 + 1] = clamp16(r[i]);
                }
            }
            let tail = out.into_remainder();
            for ((o, &l), &r) in tail.chunks_exact_mut(2).zip(l.remainder()).zip(r.remainder()) {
                o[0] = clamp16(l);
                o[1] = clamp16(r);
            }
        }

        fn mix_mono(dst: &mut [i16], left: &[i32], right: &[i32]) {
            let mut out = dst.chunks_exact_mut(LANES);
            let mut l = left.chunks_exact(LANES);
            let mut r = right.chunks_exact(LANES);
            for ((o, l), r) in (&mut out).zip(&mut l).zip(&mut r) {
                for i in 0..LANES {
                    o[i] = clamp16(l[i].saturating_add(r[i]) >> 1);
                }
            }
            let tail = out.into_remainder();
            for ((o, &l), &r) in tail.iter_mut().zip(l.remainder()).zip(r.remainder()) {
                *o = clamp16(l.saturating_add(r) >> 1);
            }
        }
    } else {
        fn mix_stereo(dst: &mut [i16], left: &[i32], right: &[i32]) {
            for ((o, &l), &r) in dst.chunks_exact_mut(2).zip(left).zip(right) {
                o[0] = clamp16(l);
                o[1] = clamp16(r);
            }
        }

        fn mix_mono(dst: &mut [i16], left: &[i32], right: &[i32]) {
            for ((o, &l), &r) in dst.iter_mut().zip(left).zip(right) {
                *o = clamp16(l.saturating_add(r) >> 1);
            }
        }
    }
}

/// Interleaves L/R into `dst` with saturation and clears the sources.
///
/// Writes `min(dst.len() / 2, left.len(), right.len())` frames.
pub fn write_stereo(dst: &mut [i16], left: &mut [i32], right: &mut [i32]) -> usize {
    let count = (dst.len() / 2).min(left.len()).min(right.len());
    mix_stereo(&mut dst[..count * 2], &left[..count], &right[..count]);
    left[..count].fill(0);
    right[..count].fill(0);
    count
}

/// Averages L/R into `dst` with saturation and clears the sources.
pub fn write_mono(dst: &mut [i16], left: &mut [i32], right: &mut [i32]) -> usize {
    let count = dst.len().min(left.len()).min(right.len());
    mix_mono(&mut dst[..count], &left[..count], &right[..count]);
    left[..count].fill(0);
    right[..count].fill(0);
    count
}
