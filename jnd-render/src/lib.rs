//! Staircase figures rendered with tiny-skia.

pub mod plot;

pub use plot::{PlotLayout, PlotStyle, StaircasePlotter, StaircaseTrace};
