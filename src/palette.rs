//! Colour palettes.
//!
//! A palette is an ordered run of opaque colours addressed by byte-sized
//! indices, so it holds between 2 and 256 entries. The last entry is the
//! colour of points inside the set.

use image::Rgba;

use crate::{Error, Result};

pub const MAX_COLOURS: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    colours: Vec<Rgba<u8>>,
}

impl Palette {
    pub fn new(colours: Vec<Rgba<u8>>) -> Result<Self> {
        if colours.len() < 2 || colours.len() > MAX_COLOURS {
            return Err(Error::Config(format!(
                "a palette needs between 2 and {} colours, got {}",
                MAX_COLOURS,
                colours.len()
            )));
        }
        if let Some(index) = colours.iter().position(|colour| colour[3] != u8::MAX) {
            return Err(Error::Config(format!(
                "palette colour {} is not opaque",
                index
            )));
        }
        Ok(Palette { colours })
    }

    /// Linear interpolation through `stops`, sampled at `len` evenly spaced points.
    pub fn gradient(stops: &[Rgba<u8>], len: usize) -> Result<Self> {
        if stops.len() < 2 {
            return Err(Error::Config("a gradient needs at least two stops".into()));
        }
        let segments = (stops.len() - 1) as f64;
        let colours = (0..len)
            .map(|index| {
                let position = index as f64 / (len.max(2) - 1) as f64 * segments;
                let segment = (position.floor() as usize).min(stops.len() - 2);
                let t = position - segment as f64;
                let (from, to) = (stops[segment], stops[segment + 1]);
                let channel = |c: usize| {
                    (from[c] as f64 + (to[c] as f64 - from[c] as f64) * t).round() as u8
                };
                Rgba([channel(0), channel(1), channel(2), u8::MAX])
            })
            .collect();
        Palette::new(colours)
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }

    pub fn colour(&self, index: u8) -> Rgba<u8> {
        self.colours[index as usize]
    }

    /// Index painted for points that never escape.
    pub fn in_set_index(&self) -> u8 {
        (self.colours.len() - 1) as u8
    }

    /// Packed `r, g, b` triples, the layout GIF colour tables use.
    pub fn rgb_table(&self) -> Vec<u8> {
        self.colours
            .iter()
            .flat_map(|colour| [colour[0], colour[1], colour[2]])
            .collect()
    }
}

/// Built-in palettes selectable with `--colors`.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteName {
    #[value(name = "Vivid")]
    Vivid,
    #[value(name = "Hippie")]
    Hippie,
}

impl PaletteName {
    pub fn palette(self) -> Palette {
        let stops: &[Rgba<u8>] = match self {
            PaletteName::Vivid => &[
                Rgba([0, 7, 100, 255]),
                Rgba([32, 107, 203, 255]),
                Rgba([237, 255, 255, 255]),
                Rgba([255, 170, 0, 255]),
                Rgba([200, 40, 0, 255]),
                Rgba([0, 2, 0, 255]),
            ],
            PaletteName::Hippie => &[
                Rgba([66, 30, 15, 255]),
                Rgba([204, 0, 153, 255]),
                Rgba([255, 221, 0, 255]),
                Rgba([0, 204, 102, 255]),
                Rgba([51, 153, 255, 255]),
                Rgba([102, 0, 153, 255]),
                Rgba([0, 0, 0, 255]),
            ],
        };
        // The stops are fixed and well formed.
        Palette::gradient(stops, MAX_COLOURS).unwrap_or_else(|error| unreachable!("{}", error))
    }
}
