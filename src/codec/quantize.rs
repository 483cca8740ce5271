//! Adaptive palette reduction.
//!
//! Median cut in CIE Lab. Images that already fit the palette keep their
//! exact colours, numbered by first appearance, so small sprites encode
//! losslessly and deterministically.

use std::cmp::Ordering;
use std::collections::HashMap;

use palette::{IntoColor, Lab, Srgb};

use crate::types::Colour;

/// Result of quantizing a pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantized {
    /// Palette colours, all opaque.
    pub palette: Vec<Colour>,
    /// One palette index per input pixel.
    pub indices: Vec<usize>,
}

fn to_lab(colour: Colour) -> Lab {
    Srgb::new(
        colour.r as f32 / 255.0,
        colour.g as f32 / 255.0,
        colour.b as f32 / 255.0,
    )
    .into_linear()
    .into_color()
}

fn lab_distance(a: &Lab, b: &Lab) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    dl * dl + da * da + db * db
}

#[derive(Debug, Clone, Copy)]
enum LabChannel {
    L,
    A,
    B,
}

fn channel(lab: &Lab, channel: LabChannel) -> f32 {
    match channel {
        LabChannel::L => lab.l,
        LabChannel::A => lab.a,
        LabChannel::B => lab.b,
    }
}

/// A box of distinct colours with their pixel counts.
#[derive(Debug, Clone)]
struct ColourBox {
    colours: Vec<(Colour, Lab, u32)>,
}

impl ColourBox {
    fn widest_channel(&self) -> LabChannel {
        let range = |c: LabChannel| {
            let (min, max) = self
                .colours
                .iter()
                .map(|(_, lab, _)| channel(lab, c))
                .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
            max - min
        };

        let (l, a, b) = (range(LabChannel::L), range(LabChannel::A), range(LabChannel::B));
        if l >= a && l >= b {
            LabChannel::L
        } else if a >= b {
            LabChannel::A
        } else {
            LabChannel::B
        }
    }

    /// Split at the pixel-count median of the widest channel.
    fn split(mut self) -> (ColourBox, ColourBox) {
        let axis = self.widest_channel();
        self.colours.sort_by(|(_, a, _), (_, b, _)| {
            channel(a, axis)
                .partial_cmp(&channel(b, axis))
                .unwrap_or(Ordering::Equal)
        });

        let total = self.pixel_count();
        let mut running = 0u64;
        let mut split_idx = self.colours.len() / 2;
        for (i, (_, _, count)) in self.colours.iter().enumerate() {
            running += *count as u64;
            if running >= total / 2 {
                split_idx = i + 1;
                break;
            }
        }
        split_idx = split_idx.clamp(1, self.colours.len() - 1);

        let right = self.colours.split_off(split_idx);
        (self, ColourBox { colours: right })
    }

    /// The member colour closest to the box's weighted Lab mean.
    fn representative(&self) -> Colour {
        let total = self.pixel_count().max(1) as f32;
        let mean = self.colours.iter().fold(Lab::new(0.0, 0.0, 0.0), |acc, (_, lab, n)| {
            let w = *n as f32 / total;
            Lab::new(acc.l + lab.l * w, acc.a + lab.a * w, acc.b + lab.b * w)
        });

        self.colours
            .iter()
            .min_by(|(_, a, _), (_, b, _)| {
                lab_distance(&mean, a)
                    .partial_cmp(&lab_distance(&mean, b))
                    .unwrap_or(Ordering::Equal)
            })
            .map(|(c, _, _)| *c)
            .unwrap_or(Colour::BLACK)
    }

    fn pixel_count(&self) -> u64 {
        self.colours.iter().map(|(_, _, n)| *n as u64).sum()
    }
}

/// Reduce `pixels` to at most `max_colours` opaque colours.
///
/// Alpha is ignored; callers flatten transparent pixels beforehand.
pub fn quantize(pixels: &[Colour], max_colours: usize) -> Quantized {
    let max_colours = max_colours.max(1);

    // Distinct colours in first-appearance order.
    let mut order: Vec<Colour> = Vec::new();
    let mut counts: HashMap<Colour, (usize, u32)> = HashMap::new();
    for px in pixels {
        let c = px.opaque();
        let slot = counts.entry(c).or_insert_with(|| {
            order.push(c);
            (order.len() - 1, 0)
        });
        slot.1 += 1;
    }

    if order.len() <= max_colours {
        let indices = pixels.iter().map(|px| counts[&px.opaque()].0).collect();
        return Quantized {
            palette: order,
            indices,
        };
    }

    let mut boxes = vec![ColourBox {
        colours: order
            .iter()
            .map(|c| (*c, to_lab(*c), counts[c].1))
            .collect(),
    }];

    while boxes.len() < max_colours {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colours.len() > 1)
            .max_by_key(|(_, b)| b.pixel_count())
            .map(|(i, _)| i);
        let Some(idx) = candidate else {
            break;
        };
        let (left, right) = boxes.remove(idx).split();
        boxes.push(left);
        boxes.push(right);
    }

    let palette: Vec<Colour> = boxes.iter().map(ColourBox::representative).collect();
    let palette_lab: Vec<Lab> = palette.iter().map(|c| to_lab(*c)).collect();

    let mut mapping: HashMap<Colour, usize> = HashMap::with_capacity(order.len());
    for c in &order {
        let lab = to_lab(*c);
        let best = palette_lab
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                lab_distance(&lab, a)
                    .partial_cmp(&lab_distance(&lab, b))
                    .unwrap_or(Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        mapping.insert(*c, best);
    }

    let indices = pixels.iter().map(|px| mapping[&px.opaque()]).collect();
    Quantized { palette, indices }
}
