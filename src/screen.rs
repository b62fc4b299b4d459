use crate::{Error, Result};

/// Dimensions of an output frame in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Config(format!(
                "image size must be positive, got {}x{}",
                width, height
            )));
        }
        (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| Error::Config(format!("image size {}x{} is too large", width, height)))?;
        Ok(Size { width, height })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// The output resolutions offered on the command line, all 5:4.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Small,
    Medium,
    Large,
}

impl Resolution {
    pub fn size(self) -> Size {
        match self {
            Resolution::Small => Size {
                width: 640,
                height: 512,
            },
            Resolution::Medium => Size {
                width: 1040,
                height: 832,
            },
            Resolution::Large => Size {
                width: 1440,
                height: 1152,
            },
        }
    }
}
