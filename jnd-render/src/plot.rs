use std::path::Path;

use anyhow::{Context, Result, bail};
use jnd_experiment::RunSummary;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, StrokeDash, Transform,
};

/// Colours and geometry of a staircase figure. Colours are straight RGBA.
#[derive(Debug, Clone)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    /// left, top, right, bottom
    pub margins: (f32, f32, f32, f32),
    pub marker_size: f32,
    /// Trials between vertical grid lines
    pub grid_trials: usize,
    pub horizontal_grid_lines: usize,
    pub background: [u8; 4],
    pub grid: [u8; 4],
    pub line: [u8; 4],
    pub threshold: [u8; 4],
    pub correct: [u8; 4],
    pub incorrect: [u8; 4],
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 500,
            margins: (60.0, 20.0, 20.0, 40.0),
            marker_size: 8.0,
            grid_trials: 10,
            horizontal_grid_lines: 5,
            background: [255, 255, 255, 255],
            grid: [225, 225, 225, 255],
            line: [0, 0, 0, 255],
            threshold: [128, 128, 128, 255],
            correct: [0, 160, 0, 255],
            incorrect: [200, 0, 0, 255],
        }
    }
}

/// Data of one staircase run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaircaseTrace {
    pub differences: Vec<f64>,
    pub correct: Vec<bool>,
    pub reversal_trials: Vec<usize>,
    pub threshold: Option<f64>,
}

impl StaircaseTrace {
    pub fn from_summary(summary: &RunSummary) -> Self {
        Self {
            differences: summary.differences.clone(),
            correct: summary.correct.clone(),
            reversal_trials: summary.reversal_trials(),
            threshold: summary.threshold.as_ref().map(|t| t.mean),
        }
    }
}

/// Maps trial index and difference into canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotLayout {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Trial index at the right edge
    pub last_trial: usize,
    /// Difference at the top edge
    pub max_difference: f64,
}

impl PlotLayout {
    pub fn new(style: &PlotStyle, trace: &StaircaseTrace) -> Self {
        let (left, top, right, bottom) = style.margins;
        let peak = trace
            .differences
            .iter()
            .copied()
            .chain(trace.threshold)
            .fold(0.0f64, f64::max);
        Self {
            left,
            top,
            width: style.width as f32 - left - right,
            height: style.height as f32 - top - bottom,
            last_trial: trace.differences.len().saturating_sub(1).max(1),
            max_difference: if peak > 0.0 { peak * 1.1 } else { 1.0 },
        }
    }

    pub fn project(&self, trial: usize, difference: f64) -> (f32, f32) {
        let x = self.left + self.width * trial as f32 / self.last_trial as f32;
        let y = self.top + self.height * (1.0 - (difference / self.max_difference) as f32);
        (x, y)
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }
}

/// Pixel centre, so non-antialiased one-pixel lines stay on a single row.
fn snap(v: f32) -> f32 {
    v.floor() + 0.5
}

fn paint(rgba: [u8; 4], anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = anti_alias;
    paint
}

pub struct StaircasePlotter {
    style: PlotStyle,
    canvas: Pixmap,
}

impl StaircasePlotter {
    pub fn new(style: PlotStyle) -> Result<Self> {
        let canvas = Pixmap::new(style.width, style.height)
            .with_context(|| format!("invalid canvas size {}x{}", style.width, style.height))?;
        Ok(Self { style, canvas })
    }

    /// Draws grid, threshold, staircase line and markers, in that order.
    pub fn render(&mut self, trace: &StaircaseTrace) -> Result<()> {
        if trace.differences.len() != trace.correct.len() {
            bail!(
                "{} differences but {} responses",
                trace.differences.len(),
                trace.correct.len()
            );
        }
        let [r, g, b, a] = self.style.background;
        self.canvas.fill(Color::from_rgba8(r, g, b, a));

        let layout = PlotLayout::new(&self.style, trace);
        self.draw_grid(&layout)?;
        if let Some(threshold) = trace.threshold {
            self.draw_threshold(&layout, threshold)?;
        }
        self.draw_line(&layout, trace)?;
        self.draw_markers(&layout, trace)?;
        Ok(())
    }

    fn draw_grid(&mut self, layout: &PlotLayout) -> Result<()> {
        let mut pb = PathBuilder::new();
        for trial in (0..=layout.last_trial).step_by(self.style.grid_trials.max(1)) {
            let x = snap(layout.project(trial, 0.0).0);
            pb.move_to(x, layout.top);
            pb.line_to(x, layout.bottom());
        }
        let lines = self.style.horizontal_grid_lines.max(1);
        for i in 0..=lines {
            let value = layout.max_difference * i as f64 / lines as f64;
            let y = snap(layout.project(0, value).1);
            pb.move_to(layout.left, y);
            pb.line_to(layout.right(), y);
        }
        let grid = pb.finish().context("empty grid path")?;
        self.canvas.stroke_path(
            &grid,
            &paint(self.style.grid, false),
            &Stroke {
                width: 1.0,
                ..Stroke::default()
            },
            Transform::identity(),
            None,
        );

        let mut axes = PathBuilder::new();
        axes.move_to(snap(layout.left), layout.top);
        axes.line_to(snap(layout.left), snap(layout.bottom()));
        axes.line_to(layout.right(), snap(layout.bottom()));
        let axes = axes.finish().context("empty axes path")?;
        self.canvas.stroke_path(
            &axes,
            &paint(self.style.line, false),
            &Stroke::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    fn draw_threshold(&mut self, layout: &PlotLayout, threshold: f64) -> Result<()> {
        let y = snap(layout.project(0, threshold).1);
        let mut pb = PathBuilder::new();
        pb.move_to(layout.left, y);
        pb.line_to(layout.right(), y);
        let path = pb.finish().context("empty threshold path")?;
        let stroke = Stroke {
            width: 1.0,
            dash: StrokeDash::new(vec![6.0, 4.0], 0.0),
            ..Stroke::default()
        };
        self.canvas.stroke_path(
            &path,
            &paint(self.style.threshold, false),
            &stroke,
            Transform::identity(),
            None,
        );
        Ok(())
    }

    fn draw_line(&mut self, layout: &PlotLayout, trace: &StaircaseTrace) -> Result<()> {
        if trace.differences.len() < 2 {
            return Ok(());
        }
        let mut pb = PathBuilder::new();
        for (trial, &difference) in trace.differences.iter().enumerate() {
            let (x, y) = layout.project(trial, difference);
            if trial == 0 {
                pb.move_to(x, y);
            } else {
                pb.line_to(x, y);
            }
        }
        let path = pb.finish().context("empty staircase path")?;
        self.canvas.stroke_path(
            &path,
            &paint(self.style.line, true),
            &Stroke {
                width: 1.5,
                ..Stroke::default()
            },
            Transform::identity(),
            None,
        );
        Ok(())
    }

    /// Squares for ordinary trials, circles for reversals.
    fn draw_markers(&mut self, layout: &PlotLayout, trace: &StaircaseTrace) -> Result<()> {
        let half = self.style.marker_size / 2.0;
        let outline = paint(self.style.line, true);
        let outline_stroke = Stroke::default();

        for (trial, (&difference, &correct)) in
            trace.differences.iter().zip(&trace.correct).enumerate()
        {
            let (x, y) = layout.project(trial, difference);
            let path = if trace.reversal_trials.contains(&trial) {
                PathBuilder::from_circle(x, y, half)
            } else {
                Rect::from_xywh(x - half, y - half, half * 2.0, half * 2.0)
                    .map(PathBuilder::from_rect)
            }
            .with_context(|| format!("marker of trial {trial} is degenerate"))?;

            let fill = if correct {
                self.style.correct
            } else {
                self.style.incorrect
            };
            self.canvas.fill_path(
                &path,
                &paint(fill, true),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
            self.canvas
                .stroke_path(&path, &outline, &outline_stroke, Transform::identity(), None);
        }
        Ok(())
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn style(&self) -> &PlotStyle {
        &self.style
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.canvas.encode_png().context("encoding staircase plot")
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.canvas
            .save_png(path)
            .with_context(|| format!("writing {}", path.display()))
    }
}
