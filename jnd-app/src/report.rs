use std::fs;
use std::path::{Path, PathBuf};

use jnd_core::{JndError, Result};
use jnd_experiment::{RunReporter, RunSummary};
use jnd_render::{PlotStyle, StaircasePlotter, StaircaseTrace};
use tracing::info;

/// Writes `{plot_dir}/{subject}/{stem}.png` and `{stem}.json` per run.
#[derive(Debug, Clone)]
pub struct FileReporter {
    plot_dir: PathBuf,
    style: PlotStyle,
}

impl FileReporter {
    pub fn new(plot_dir: impl Into<PathBuf>) -> Self {
        Self {
            plot_dir: plot_dir.into(),
            style: PlotStyle::default(),
        }
    }

    pub fn subject_dir(&self, summary: &RunSummary) -> PathBuf {
        self.plot_dir.join(&summary.subject)
    }
}

/// Renders the staircase of one run to a PNG file.
pub fn save_plot(summary: &RunSummary, style: &PlotStyle, path: &Path) -> Result<()> {
    let what = || format!("plot {}", path.display());
    let mut plotter =
        StaircasePlotter::new(style.clone()).map_err(|e| JndError::persistence(what(), e))?;
    plotter
        .render(&StaircaseTrace::from_summary(summary))
        .and_then(|()| plotter.save_png(path))
        .map_err(|e| JndError::persistence(what(), e))
}

impl RunReporter for FileReporter {
    fn report(&mut self, summary: &RunSummary) -> Result<()> {
        let dir = self.subject_dir(summary);
        fs::create_dir_all(&dir)?;
        let stem = summary.file_stem();

        let json_path = dir.join(format!("{stem}.json"));
        let json = serde_json::to_vec_pretty(summary)
            .map_err(|e| JndError::persistence(format!("summary {stem}"), e))?;
        fs::write(&json_path, json)
            .map_err(|e| JndError::persistence(json_path.display().to_string(), e))?;

        let png_path = dir.join(format!("{stem}.png"));
        save_plot(summary, &self.style, &png_path)?;

        match &summary.threshold {
            Some(t) => info!(
                run = %stem,
                mean = t.mean,
                median = t.median,
                reversals = summary.reversals.len(),
                "threshold"
            ),
            None => info!(run = %stem, "no reversals, no threshold"),
        }
        Ok(())
    }
}
