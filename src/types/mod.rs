//! Core pixel types shared by the codecs.

mod colour;

pub use colour::{colour_distance, nearest_index, Colour, ALPHA_THRESHOLD};
