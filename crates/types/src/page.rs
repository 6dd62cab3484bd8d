//! Physical page description handed to the rendering engine's print step.

use log::warn;
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageSetupError {
    #[error("Page setup is missing the [Page Setup] section")]
    MissingSection,
    #[error("Page setup is missing required key '{0}'")]
    MissingKey(&'static str),
    #[error("Page setup key '{key}' has an invalid value '{value}'")]
    InvalidValue { key: String, value: String },
}

/// A named paper size. Dimensions are the short and long edge in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperSize {
    pub name: &'static str,
    pub short_mm: u32,
    pub long_mm: u32,
}

const fn paper(name: &'static str, short_mm: u32, long_mm: u32) -> PaperSize {
    PaperSize { name, short_mm, long_mm }
}

/// Well known paper sizes (not all of them ISO).
pub const PAPER_SIZES: &[PaperSize] = &[
    paper("A0", 841, 1189),
    paper("A1", 594, 841),
    paper("A2", 420, 594),
    paper("A3", 297, 420),
    paper("A4", 210, 297),
    paper("A5", 148, 210),
    paper("A6", 105, 148),
    paper("A7", 74, 105),
    paper("A8", 52, 74),
    paper("A9", 37, 52),
    paper("A10", 26, 37),
    paper("SRA0", 900, 1280),
    paper("SRA1", 640, 900),
    paper("SRA2", 450, 640),
    paper("SRA3", 320, 450),
    paper("SRA4", 225, 320),
    paper("B0", 1000, 1414),
    paper("B1", 707, 1000),
    paper("B2", 500, 707),
    paper("B3", 353, 500),
    paper("B4", 250, 353),
    paper("B5", 176, 250),
    paper("B6", 125, 176),
    paper("B7", 88, 125),
    paper("B8", 62, 88),
    paper("B9", 44, 62),
    paper("B10", 31, 44),
    paper("C0", 917, 1297),
    paper("C1", 648, 917),
    paper("C2", 458, 648),
    paper("C3", 324, 458),
    paper("C4", 229, 324),
    paper("C5", 162, 229),
    paper("C6", 114, 162),
    paper("C7", 81, 114),
    paper("C8", 57, 81),
    paper("C9", 40, 57),
    paper("C10", 28, 40),
    paper("ANSIA", 216, 279),
    paper("ANSIB", 279, 432),
    paper("ANSIC", 432, 559),
    paper("ANSID", 559, 864),
    paper("ANSIE", 864, 1118),
    paper("Letter", 216, 279),
    paper("Legal", 216, 356),
    paper("Tabloid", 279, 432),
    paper("ArchA", 229, 305),
    paper("ArchB", 305, 457),
    paper("ArchC", 457, 610),
    paper("ArchD", 610, 914),
    paper("ArchE", 914, 1219),
];

impl PaperSize {
    /// Case-insensitive lookup in [`PAPER_SIZES`].
    pub fn lookup(name: &str) -> Option<PaperSize> {
        PAPER_SIZES
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
            .copied()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl FromStr for Orientation {
    type Err = PageSetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" | "reverse_portrait" => Ok(Orientation::Portrait),
            "landscape" | "reverse_landscape" => Ok(Orientation::Landscape),
            _ => Err(PageSetupError::InvalidValue {
                key: "Orientation".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Paper size, margins and orientation for one print.
///
/// `width_mm` and `height_mm` describe the paper in portrait; the
/// orientation decides which edge ends up horizontal.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSetup {
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
    pub margins: Margins,
    pub orientation: Orientation,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::from_paper(PaperSize::lookup("A4").unwrap_or(paper("A4", 210, 297)), Orientation::Portrait)
    }
}

impl PageSetup {
    pub fn from_paper(paper: PaperSize, orientation: Orientation) -> Self {
        Self {
            name: paper.name.to_string(),
            width_mm: f64::from(paper.short_mm),
            height_mm: f64::from(paper.long_mm),
            margins: Margins::default(),
            orientation,
        }
    }

    /// Builds a zero-margin setup from a paper name and orientation.
    ///
    /// Unknown sizes fall back to A4 and unknown orientations to portrait,
    /// both with a warning.
    pub fn from_name(size: &str, orientation: &str) -> Self {
        let paper = PaperSize::lookup(size).unwrap_or_else(|| {
            warn!("Unknown paper size '{}'; using A4.", size);
            paper("A4", 210, 297)
        });
        let orientation = orientation.parse().unwrap_or_else(|_| {
            warn!("Unknown orientation '{}'; using portrait.", orientation);
            Orientation::Portrait
        });
        Self::from_paper(paper, orientation)
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Parses the `[Page Setup]` group of a GTK key file.
    ///
    /// `Width` and `Height` are required and given in millimetres. Margins
    /// default to zero, orientation to portrait. Other groups are ignored.
    pub fn from_keyfile(text: &str) -> Result<Self, PageSetupError> {
        let mut in_section = false;
        let mut seen_section = false;
        let mut setup = PageSetup {
            name: String::from("Custom"),
            width_mm: 0.0,
            height_mm: 0.0,
            margins: Margins::default(),
            orientation: Orientation::Portrait,
        };
        let mut width = None;
        let mut height = None;

        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(group) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_section = group == "Page Setup";
                seen_section |= in_section;
                continue;
            }
            if !in_section {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "DisplayName" => setup.name = value.to_string(),
                "PPDName" if setup.name == "Custom" => setup.name = value.to_string(),
                "Width" => width = Some(parse_mm(key, value)?),
                "Height" => height = Some(parse_mm(key, value)?),
                "MarginTop" => setup.margins.top = parse_mm(key, value)?,
                "MarginBottom" => setup.margins.bottom = parse_mm(key, value)?,
                "MarginLeft" => setup.margins.left = parse_mm(key, value)?,
                "MarginRight" => setup.margins.right = parse_mm(key, value)?,
                "Orientation" => setup.orientation = value.parse()?,
                _ => {}
            }
        }

        if !seen_section {
            return Err(PageSetupError::MissingSection);
        }
        setup.width_mm = width.ok_or(PageSetupError::MissingKey("Width"))?;
        setup.height_mm = height.ok_or(PageSetupError::MissingKey("Height"))?;
        Ok(setup)
    }

    /// Renders the setup as a GTK key file, the inverse of [`Self::from_keyfile`].
    pub fn to_keyfile(&self) -> String {
        let mut out = String::from("[Page Setup]\n");
        let _ = writeln!(out, "PPDName={}", self.name);
        let _ = writeln!(out, "DisplayName={}", self.name);
        let _ = writeln!(out, "Width={}", self.width_mm);
        let _ = writeln!(out, "Height={}", self.height_mm);
        let _ = writeln!(out, "MarginTop={}", self.margins.top);
        let _ = writeln!(out, "MarginBottom={}", self.margins.bottom);
        let _ = writeln!(out, "MarginLeft={}", self.margins.left);
        let _ = writeln!(out, "MarginRight={}", self.margins.right);
        let _ = writeln!(out, "Orientation={}", self.orientation.as_str());
        out
    }

    pub fn is_landscape(&self) -> bool {
        self.orientation == Orientation::Landscape
    }

    /// Paper size as it will be printed, in millimetres (width, height).
    pub fn oriented_mm(&self) -> (f64, f64) {
        match self.orientation {
            Orientation::Portrait => (self.width_mm, self.height_mm),
            Orientation::Landscape => (self.height_mm, self.width_mm),
        }
    }

    pub fn oriented_points(&self) -> (f64, f64) {
        let (w, h) = self.oriented_mm();
        (mm_to_points(w), mm_to_points(h))
    }
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

pub fn mm_to_points(mm: f64) -> f64 {
    mm_to_inches(mm) * POINTS_PER_INCH
}

fn parse_mm(key: &str, value: &str) -> Result<f64, PageSetupError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| PageSetupError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}
