//! Decoding of the ICCCM hint properties and the size hint constraint solver.
//!
//! https://tronche.com/gui/x/icccm/sec-4.html#s-4.1.2.3
use std::convert::TryFrom;

use anyhow::{Result, anyhow, bail};

use crate::geometry::Rectangle;

// WM_NORMAL_HINTS flags
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;

// WM_NORMAL_HINTS word offsets (1 - 4 are obsolete position / size fields)
const FLAGS: usize = 0;
const MIN_WIDTH: usize = 5;
const MIN_HEIGHT: usize = 6;
const MAX_WIDTH: usize = 7;
const MAX_HEIGHT: usize = 8;
const WIDTH_INC: usize = 9;
const HEIGHT_INC: usize = 10;
const MIN_ASPECT_NUM: usize = 11;
const MIN_ASPECT_DEN: usize = 12;
const MAX_ASPECT_NUM: usize = 13;
const MAX_ASPECT_DEN: usize = 14;
const BASE_WIDTH: usize = 15;
const BASE_HEIGHT: usize = 16;

// Pre ICCCM clients stop before the base size and gravity fields
const NORMAL_HINTS_MIN_LEN: usize = 15;

// WM_HINTS flags
const INPUT_HINT: u32 = 1 << 0;
const URGENCY_HINT: u32 = 1 << 8;

/// Resize constraints declared by a window.
///
/// A bound of 0 means "not set". Aspect ratios are width / height.
/// All integer fields are expected to be non-negative.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct SizeHints {
    pub base_width: i32,
    pub base_height: i32,
    pub width_increment: i32,
    pub height_increment: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
}

impl SizeHints {
    /// Decode a raw WM_NORMAL_HINTS property value.
    ///
    /// The base size falls back to the minimum size and vice versa, as most
    /// clients only set one of the two. Hints with crossed bounds are rejected.
    pub fn from_raw(raw: &[u32]) -> Result<SizeHints> {
        if raw.len() < NORMAL_HINTS_MIN_LEN {
            bail!("WM_NORMAL_HINTS needs {} values, got {}", NORMAL_HINTS_MIN_LEN, raw.len());
        }
        let value = |offset: usize| -> Result<i32> {
            i32::try_from(raw[offset])
                .map_err(|_| anyhow!("negative size hint at offset {}", offset))
        };
        let pair = |a: usize, b: usize| -> Result<(i32, i32)> { Ok((value(a)?, value(b)?)) };

        let flags = raw[FLAGS];
        let has_min = flags & P_MIN_SIZE != 0;
        let has_base = flags & P_BASE_SIZE != 0 && raw.len() > BASE_HEIGHT;
        let mut hints = SizeHints::default();

        if has_base {
            let (w, h) = pair(BASE_WIDTH, BASE_HEIGHT)?;
            hints.base_width = w;
            hints.base_height = h;
        } else if has_min {
            let (w, h) = pair(MIN_WIDTH, MIN_HEIGHT)?;
            hints.base_width = w;
            hints.base_height = h;
        }

        if has_min {
            let (w, h) = pair(MIN_WIDTH, MIN_HEIGHT)?;
            hints.min_width = w;
            hints.min_height = h;
        } else if has_base {
            hints.min_width = hints.base_width;
            hints.min_height = hints.base_height;
        }

        if flags & P_MAX_SIZE != 0 {
            let (w, h) = pair(MAX_WIDTH, MAX_HEIGHT)?;
            hints.max_width = w;
            hints.max_height = h;
        }

        if flags & P_RESIZE_INC != 0 {
            let (w, h) = pair(WIDTH_INC, HEIGHT_INC)?;
            hints.width_increment = w;
            hints.height_increment = h;
        }

        if flags & P_ASPECT != 0 {
            hints.min_aspect_ratio = ratio(raw[MIN_ASPECT_NUM], raw[MIN_ASPECT_DEN]);
            hints.max_aspect_ratio = ratio(raw[MAX_ASPECT_NUM], raw[MAX_ASPECT_DEN]);
        }

        hints.validate()?;
        Ok(hints)
    }

    fn validate(&self) -> Result<()> {
        if self.max_width > 0 && self.min_width > self.max_width {
            bail!("min width {} exceeds max width {}", self.min_width, self.max_width);
        }
        if self.max_height > 0 && self.min_height > self.max_height {
            bail!("min height {} exceeds max height {}", self.min_height, self.max_height);
        }
        if self.min_aspect_ratio > 0.0
            && self.max_aspect_ratio > 0.0
            && self.min_aspect_ratio > self.max_aspect_ratio
        {
            bail!(
                "min aspect {} exceeds max aspect {}",
                self.min_aspect_ratio,
                self.max_aspect_ratio
            );
        }
        Ok(())
    }

    /// True if the window can not be resized at all.
    pub fn is_fixed(&self) -> bool {
        self.max_width > 0
            && self.max_height > 0
            && self.min_width == self.max_width
            && self.min_height == self.max_height
    }

    fn has_aspect(&self) -> bool {
        self.min_aspect_ratio > 0.0 || self.max_aspect_ratio > 0.0
    }

    /// Snap a candidate rectangle to these hints. The position is left alone.
    ///
    /// Both axes are clamped to [min, max] and then rounded down onto the
    /// increment grid starting at the base size. With an aspect range set the
    /// width is kept and the height is pulled into the range allowed for that
    /// width, then snapped again. Every step is monotone and the snapping
    /// steps are idempotent, so `apply(apply(r)) == apply(r)`.
    pub fn apply(&self, r: Rectangle) -> Rectangle {
        let w = snap(
            clamp_u32(r.w),
            self.base_width,
            self.width_increment,
            self.min_width,
            self.max_width,
        );
        let snap_height = |h: i32| {
            snap(h, self.base_height, self.height_increment, self.min_height, self.max_height)
        };

        let mut h = snap_height(clamp_u32(r.h));
        if self.has_aspect() {
            let (lo, hi) = self.height_range(w);
            h = snap_height(h.max(lo).min(hi));
        }

        Rectangle::new(r.x, r.y, w.max(0) as u32, h.max(0) as u32)
    }

    // Heights keeping min_aspect <= w / h <= max_aspect for the given width
    fn height_range(&self, w: i32) -> (i32, i32) {
        let w = f64::from(w);
        let lo = if self.max_aspect_ratio > 0.0 {
            (w / self.max_aspect_ratio).ceil() as i32
        } else {
            0
        };
        let hi = if self.min_aspect_ratio > 0.0 {
            (w / self.min_aspect_ratio).floor() as i32
        } else {
            i32::MAX
        };
        (lo, hi)
    }
}

fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 {
        0.0
    } else {
        f64::from(num) / f64::from(den)
    }
}

fn clamp_u32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

// clamp to [min, max] then round down onto the increment grid above base
fn snap(v: i32, base: i32, inc: i32, min: i32, max: i32) -> i32 {
    let mut v = v.max(min);
    if max > 0 {
        v = v.min(max);
    }
    let inc = inc.max(1);
    base + ((v - base).max(0) / inc) * inc
}

/// The parts of WM_HINTS we act on.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct WmHints {
    /// Whether the client wants keyboard input, None if it did not say.
    pub input: Option<bool>,
    pub urgent: bool,
}

impl WmHints {
    /// Decode a raw WM_HINTS property value.
    pub fn from_raw(raw: &[u32]) -> Result<WmHints> {
        let flags = *raw.first().ok_or_else(|| anyhow!("empty WM_HINTS"))?;
        let input = if flags & INPUT_HINT != 0 {
            let input = raw
                .get(1)
                .ok_or_else(|| anyhow!("WM_HINTS sets InputHint without an input field"))?;
            Some(*input != 0)
        } else {
            None
        };
        Ok(WmHints {
            input,
            urgent: flags & URGENCY_HINT != 0,
        })
    }
}
