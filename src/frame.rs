//! Paletted frames and the indexed sequence workers fill in.

use std::sync::OnceLock;

use crate::{screen::Size, Error, Result};

/// A paletted raster: one palette index per pixel, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    size: Size,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(size: Size, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != size.pixel_count() {
            return Err(Error::Worker(format!(
                "frame of {}x{} needs {} pixels, got {}",
                size.width,
                size.height,
                size.pixel_count(),
                pixels.len()
            )));
        }
        Ok(Frame { size, pixels })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn index_at(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.size.width as usize + x as usize]
    }
}

/// Write-once slots, one per frame index.
///
/// Each slot has a single writer. Readers only look at the slots through
/// [`FrameSlots::finish`], after every writer has been waited for.
pub struct FrameSlots {
    slots: Vec<OnceLock<Frame>>,
}

impl FrameSlots {
    pub fn new(len: usize) -> Self {
        FrameSlots {
            slots: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn publish(&self, index: usize, frame: Frame) -> Result<()> {
        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| Error::Worker(format!("frame index {} is out of range", index)))?;
        slot.set(frame)
            .map_err(|_| Error::Worker(format!("frame {} was published twice", index)))
    }

    pub fn finish(self) -> Result<FrameSequence> {
        let frames = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.into_inner()
                    .ok_or_else(|| Error::Worker(format!("frame {} was never rendered", index)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FrameSequence { frames })
    }
}

/// Every frame of an animation, in frame-index order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }
}

impl From<Vec<Frame>> for FrameSequence {
    fn from(frames: Vec<Frame>) -> Self {
        FrameSequence { frames }
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
