#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interpolation for the segment that starts at a frame.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Curve {
    #[default]
    Linear,
    Stepped,
    Bezier {
        cx1: f32,
        cy1: f32,
        cx2: f32,
        cy2: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttachmentFrame {
    pub time: f32,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorFrame {
    pub time: f32,
    pub color: [f32; 4],
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotateFrame {
    pub time: f32,
    pub angle: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve: Curve,
}

/// Translate, scale and shear frames.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec2Frame {
    pub time: f32,
    pub x: f32,
    pub y: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IkFrame {
    pub time: f32,
    pub mix: f32,
    pub bend_direction: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransformFrame {
    pub time: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloatFrame {
    pub time: f32,
    pub value: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathMixFrame {
    pub time: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve: Curve,
}

/// One deform key.
///
/// `offset`/`deltas` are the values as stored: `deltas` replaces or offsets the range
/// `[offset, offset + deltas.len())` of the attachment's vertex array. `vertices` is the
/// full per-frame array rebuilt from them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeformFrame {
    pub time: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub offset: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub deltas: Vec<f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub vertices: Vec<f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DrawOrderFrame {
    pub time: f32,
    /// `draw_order[position]` is the slot index drawn at `position`.
    pub draw_order: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventFrame {
    pub time: f32,
    /// Index into `SkeletonData::events`.
    pub event: usize,
    pub int_value: i32,
    pub float_value: f32,
    pub string_value: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Timeline {
    SlotAttachment {
        slot: usize,
        frames: Vec<AttachmentFrame>,
    },
    SlotColor {
        slot: usize,
        frames: Vec<ColorFrame>,
    },
    BoneRotate {
        bone: usize,
        frames: Vec<RotateFrame>,
    },
    BoneTranslate {
        bone: usize,
        frames: Vec<Vec2Frame>,
    },
    BoneScale {
        bone: usize,
        frames: Vec<Vec2Frame>,
    },
    BoneShear {
        bone: usize,
        frames: Vec<Vec2Frame>,
    },
    IkConstraint {
        constraint: usize,
        frames: Vec<IkFrame>,
    },
    TransformConstraint {
        constraint: usize,
        frames: Vec<TransformFrame>,
    },
    PathPosition {
        constraint: usize,
        frames: Vec<FloatFrame>,
    },
    PathSpacing {
        constraint: usize,
        frames: Vec<FloatFrame>,
    },
    PathMix {
        constraint: usize,
        frames: Vec<PathMixFrame>,
    },
    Deform {
        /// Skin index with the default skin (when present) first.
        skin: usize,
        slot: usize,
        attachment: String,
        frames: Vec<DeformFrame>,
    },
    DrawOrder {
        frames: Vec<DrawOrderFrame>,
    },
    Event {
        frames: Vec<EventFrame>,
    },
}

impl Timeline {
    pub fn frame_count(&self) -> usize {
        match self {
            Timeline::SlotAttachment { frames, .. } => frames.len(),
            Timeline::SlotColor { frames, .. } => frames.len(),
            Timeline::BoneRotate { frames, .. } => frames.len(),
            Timeline::BoneTranslate { frames, .. }
            | Timeline::BoneScale { frames, .. }
            | Timeline::BoneShear { frames, .. } => frames.len(),
            Timeline::IkConstraint { frames, .. } => frames.len(),
            Timeline::TransformConstraint { frames, .. } => frames.len(),
            Timeline::PathPosition { frames, .. } | Timeline::PathSpacing { frames, .. } => {
                frames.len()
            }
            Timeline::PathMix { frames, .. } => frames.len(),
            Timeline::Deform { frames, .. } => frames.len(),
            Timeline::DrawOrder { frames } => frames.len(),
            Timeline::Event { frames } => frames.len(),
        }
    }

    /// Time of the final frame, or `None` for an empty timeline.
    pub fn last_time(&self) -> Option<f32> {
        match self {
            Timeline::SlotAttachment { frames, .. } => frames.last().map(|f| f.time),
            Timeline::SlotColor { frames, .. } => frames.last().map(|f| f.time),
            Timeline::BoneRotate { frames, .. } => frames.last().map(|f| f.time),
            Timeline::BoneTranslate { frames, .. }
            | Timeline::BoneScale { frames, .. }
            | Timeline::BoneShear { frames, .. } => frames.last().map(|f| f.time),
            Timeline::IkConstraint { frames, .. } => frames.last().map(|f| f.time),
            Timeline::TransformConstraint { frames, .. } => frames.last().map(|f| f.time),
            Timeline::PathPosition { frames, .. } | Timeline::PathSpacing { frames, .. } => {
                frames.last().map(|f| f.time)
            }
            Timeline::PathMix { frames, .. } => frames.last().map(|f| f.time),
            Timeline::Deform { frames, .. } => frames.last().map(|f| f.time),
            Timeline::DrawOrder { frames } => frames.last().map(|f| f.time),
            Timeline::Event { frames } => frames.last().map(|f| f.time),
        }
    }

    /// Curves of every curve-bearing frame, in frame order.
    pub(crate) fn curves(&self) -> Vec<Curve> {
        match self {
            Timeline::SlotColor { frames, .. } => frames.iter().map(|f| f.curve).collect(),
            Timeline::BoneRotate { frames, .. } => frames.iter().map(|f| f.curve).collect(),
            Timeline::BoneTranslate { frames, .. }
            | Timeline::BoneScale { frames, .. }
            | Timeline::BoneShear { frames, .. } => frames.iter().map(|f| f.curve).collect(),
            Timeline::IkConstraint { frames, .. } => frames.iter().map(|f| f.curve).collect(),
            Timeline::TransformConstraint { frames, .. } => {
                frames.iter().map(|f| f.curve).collect()
            }
            Timeline::PathPosition { frames, .. } | Timeline::PathSpacing { frames, .. } => {
                frames.iter().map(|f| f.curve).collect()
            }
            Timeline::PathMix { frames, .. } => frames.iter().map(|f| f.curve).collect(),
            Timeline::Deform { frames, .. } => frames.iter().map(|f| f.curve).collect(),
            Timeline::SlotAttachment { .. } | Timeline::DrawOrder { .. } | Timeline::Event { .. } => {
                Vec::new()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Animation {
    pub name: String,
    /// Latest final-frame time over all timelines.
    pub duration: f32,
    pub timelines: Vec<Timeline>,
}

impl Animation {
    pub fn new(name: impl Into<String>, timelines: Vec<Timeline>) -> Self {
        let duration = timelines
            .iter()
            .filter_map(Timeline::last_time)
            .fold(0.0f32, f32::max);
        Self {
            name: name.into(),
            duration,
            timelines,
        }
    }
}
