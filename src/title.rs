//! Title cards drawn on a template image, and the 16:9 thumbnail cut from them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::media::{filter_escape, probe_dimensions, run_ffmpeg};
use crate::utils::wrap_text;

/// Text layout used for a given number of title lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardLayout {
    pub min_lines: usize,
    pub font_size: u32,
    pub y_offset: i64,
    pub wrap: usize,
}

const BASE_WRAP: usize = 35;
const TEXT_X: i64 = 120;

/// Buckets keyed by the line count at `BASE_WRAP`; the last bucket whose
/// `min_lines` is reached wins.
const LAYOUTS: &[CardLayout] = &[
    CardLayout {
        min_lines: 0,
        font_size: 47,
        y_offset: 30,
        wrap: BASE_WRAP,
    },
    CardLayout {
        min_lines: 3,
        font_size: 40,
        y_offset: 35,
        wrap: 45,
    },
    CardLayout {
        min_lines: 4,
        font_size: 35,
        y_offset: 40,
        wrap: 45,
    },
    CardLayout {
        min_lines: 5,
        font_size: 30,
        y_offset: 30,
        wrap: 45,
    },
];

pub fn layout_for(text: &str) -> (CardLayout, Vec<String>) {
    let base_lines = wrap_text(text, BASE_WRAP).len();
    let layout = LAYOUTS
        .iter()
        .rev()
        .find(|l| base_lines >= l.min_lines)
        .copied()
        .unwrap_or(LAYOUTS[0]);
    (layout, wrap_text(text, layout.wrap))
}

/// Top y of each line, vertically centering the block around the template middle.
pub fn line_positions(
    image_height: u32,
    layout: &CardLayout,
    lines: usize,
    padding: u32,
) -> Vec<i64> {
    let line_height = layout.font_size as i64 + padding as i64;
    let block = line_height * lines as i64;
    let mut y = image_height as i64 / 2 - block / 2 + layout.y_offset;
    let mut positions = Vec::with_capacity(lines);
    for _ in 0..lines {
        positions.push(y);
        y += line_height;
    }
    positions
}

pub struct TitleCard {
    pub template: PathBuf,
    pub font: PathBuf,
    pub color: String,
    pub padding: u32,
}

impl TitleCard {
    pub fn render(&self, text: &str, out_path: &Path) -> anyhow::Result<()> {
        let (_, height) = probe_dimensions(&self.template)
            .with_context(|| format!("Unusable title template {}", self.template.display()))?;
        let (layout, lines) = layout_for(text);
        debug!(
            "Title card: {} lines at size {} (wrap {})",
            lines.len(),
            layout.font_size,
            layout.wrap
        );

        let stem = out_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid card filename"))?;
        let dir = out_path.parent().unwrap_or(Path::new("."));

        let mut filters = Vec::with_capacity(lines.len());
        for (i, (line, y)) in lines
            .iter()
            .zip(line_positions(height, &layout, lines.len(), self.padding))
            .enumerate()
        {
            // textfile sidesteps drawtext's quoting rules for arbitrary titles
            let text_file = dir.join(format!("{stem}_line{i}.txt"));
            fs::write(&text_file, line)?;
            filters.push(format!(
                "drawtext=fontfile={}:textfile={}:fontsize={}:fontcolor={}:x={}:y={}",
                filter_escape(&self.font),
                filter_escape(&text_file),
                layout.font_size,
                self.color,
                TEXT_X,
                y
            ));
        }
        let graph = if filters.is_empty() {
            "null".to_string()
        } else {
            filters.join(",")
        };

        let template = self.template.to_string_lossy().to_string();
        let out = out_path.to_string_lossy().to_string();
        run_ffmpeg(
            ["-i", template.as_str(), "-vf", graph.as_str(), "-frames:v", "1", out.as_str()],
            "render title card",
        )?;
        info!("Saved: {}", out_path.display());
        Ok(())
    }
}

/// Pixel geometry for padding an image to 16:9 and zooming into its center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailGeometry {
    pub canvas_w: u32,
    pub canvas_h: u32,
    pub pad_x: u32,
    pub crop_w: u32,
    pub crop_h: u32,
    pub crop_x: u32,
    pub crop_y: u32,
}

pub fn thumbnail_geometry(width: u32, height: u32, zoom: f64) -> ThumbnailGeometry {
    let canvas_w = (height as u64 * 16 / 9).max(width as u64) as u32;
    let canvas_h = height;
    let zoom = zoom.max(1.0);
    let crop_w = ((canvas_w as f64 / zoom) as u32).max(1);
    let crop_h = ((canvas_h as f64 / zoom) as u32).max(1);
    ThumbnailGeometry {
        canvas_w,
        canvas_h,
        pad_x: (canvas_w - width) / 2,
        crop_w,
        crop_h,
        crop_x: (canvas_w - crop_w) / 2,
        crop_y: (canvas_h - crop_h) / 2,
    }
}

pub fn create_thumbnail(image: &Path, out_path: &Path, zoom: f64) -> anyhow::Result<()> {
    let (width, height) = probe_dimensions(image)?;
    let g = thumbnail_geometry(width, height, zoom);
    let graph = format!(
        "pad={}:{}:{}:0:black,crop={}:{}:{}:{},scale={}:{}:flags=lanczos",
        g.canvas_w,
        g.canvas_h,
        g.pad_x,
        g.crop_w,
        g.crop_h,
        g.crop_x,
        g.crop_y,
        g.canvas_w,
        g.canvas_h
    );
    let input = image.to_string_lossy().to_string();
    let out = out_path.to_string_lossy().to_string();
    run_ffmpeg(
        ["-i", input.as_str(), "-vf", graph.as_str(), "-frames:v", "1", out.as_str()],
        "create thumbnail",
    )?;
    info!("Saved: {}", out_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_titles_use_base_layout() {
        let (layout, lines) = layout_for("AITA for eating the last slice?");
        assert_eq!(layout.font_size, 47);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn layout_shrinks_with_line_count() {
        let three = "word ".repeat(20); // 100 chars -> 3 lines at wrap 35
        let (layout, _) = layout_for(three.trim());
        assert_eq!((layout.font_size, layout.y_offset, layout.wrap), (40, 35, 45));

        let four = "word ".repeat(27);
        let (layout, _) = layout_for(four.trim());
        assert_eq!(layout.font_size, 35);

        let many = "word ".repeat(60);
        let (layout, lines) = layout_for(many.trim());
        assert_eq!(layout.font_size, 30);
        assert!(lines.iter().all(|l| l.chars().count() <= 45));
    }

    #[test]
    fn lines_are_centered_with_offset() {
        let layout = LAYOUTS[0];
        let ys = line_positions(400, &layout, 2, 5);
        // 200 - (52*2)/2 + 30
        assert_eq!(ys, vec![178, 230]);
    }

    #[test]
    fn thumbnail_pads_portrait_to_wide() {
        let g = thumbnail_geometry(1080, 1080, 3.5);
        assert_eq!(g.canvas_w, 1920);
        assert_eq!(g.pad_x, 420);
        assert_eq!((g.crop_w, g.crop_h), (548, 308));
        assert_eq!((g.crop_x, g.crop_y), (686, 386));
    }

    #[test]
    fn thumbnail_never_pads_negative() {
        let g = thumbnail_geometry(3000, 1000, 1.0);
        assert_eq!(g.canvas_w, 3000);
        assert_eq!(g.pad_x, 0);
        assert_eq!((g.crop_w, g.crop_h, g.crop_x, g.crop_y), (3000, 1000, 0, 0));
    }
}
