//! Axis-aligned bounding boxes.
//!
//! The canonical convention of this crate is TLWH: top-left x, top-left y,
//! width, height, all in pixels. Other layouts only appear at the edges:
//! - LTRB: left, top, right, bottom (what most detector heads emit)
//! - XYAH: center x, center y, aspect ratio (w/h), height (Kalman measurement space)

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Bounding box in TLWH layout. Serialises as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from `[left, top, right, bottom]` corners.
    #[inline]
    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Build from center, aspect ratio and height.
    #[inline]
    pub fn from_xyah(cx: f32, cy: f32, aspect_ratio: f32, height: f32) -> Self {
        let width = aspect_ratio * height;
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    #[inline]
    pub fn to_ltrb(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    /// Measurement vector for the Kalman filter.
    #[inline]
    pub fn to_xyah(&self) -> [f64; 4] {
        let (cx, cy) = self.center();
        let aspect_ratio = if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        };
        [cx as f64, cy as f64, aspect_ratio as f64, self.height as f64]
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True when the box has no positive area or carries non-finite values.
    pub fn is_degenerate(&self) -> bool {
        !(self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    /// Clip the box to an image of the given size.
    pub fn clip(&self, image_width: f32, image_height: f32) -> Rect {
        let left = self.x.clamp(0.0, image_width);
        let top = self.y.clamp(0.0, image_height);
        let right = self.right().clamp(0.0, image_width);
        let bottom = self.bottom().clamp(0.0, image_height);
        Rect::from_ltrb(left, top, right, bottom)
    }

    /// Intersection over union. Zero when the union is empty.
    pub fn iou(&self, other: &Rect) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        let inter_area = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

impl From<[f32; 4]> for Rect {
    fn from(tlwh: [f32; 4]) -> Self {
        Rect::new(tlwh[0], tlwh[1], tlwh[2], tlwh[3])
    }
}

impl From<Rect> for [f32; 4] {
    fn from(rect: Rect) -> Self {
        rect.to_tlwh()
    }
}

/// Pairwise IoU of two box sets, shape `(boxes_a.len(), boxes_b.len())`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    Array2::from_shape_fn((boxes_a.len(), boxes_b.len()), |(i, j)| {
        boxes_a[i].iou(&boxes_b[j])
    })
}
