use crate::{Animation, Attachment};
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoneData {
    pub index: usize,
    pub name: String,
    pub parent: Option<usize>,
    pub rotation: f32,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,
    pub length: f32,
    pub inherit_rotation: bool,
    pub inherit_scale: bool,
    /// Editor color; only present in exports with non-essential data.
    #[cfg_attr(feature = "serde", serde(default))]
    pub color: Option<[f32; 4]>,
}

impl BoneData {
    pub fn new(index: usize, name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            index,
            name: name.into(),
            parent,
            rotation: 0.0,
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            shear_x: 0.0,
            shear_y: 0.0,
            length: 0.0,
            inherit_rotation: true,
            inherit_scale: true,
            color: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotData {
    pub index: usize,
    pub name: String,
    pub bone: usize,
    pub color: [f32; 4],
    pub attachment: Option<String>,
    pub blend: BlendMode,
}

impl SlotData {
    pub fn new(index: usize, name: impl Into<String>, bone: usize) -> Self {
        Self {
            index,
            name: name.into(),
            bone,
            color: [1.0; 4],
            attachment: None,
            blend: BlendMode::Normal,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

impl BlendMode {
    pub(crate) fn from_binary(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Normal),
            1 => Some(Self::Additive),
            2 => Some(Self::Multiply),
            3 => Some(Self::Screen),
            _ => None,
        }
    }

    pub(crate) fn to_binary(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Additive => 1,
            Self::Multiply => 2,
            Self::Screen => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IkConstraintData {
    pub name: String,
    pub order: usize,
    pub bones: Vec<usize>,
    pub target: usize,
    pub mix: f32,
    pub bend_direction: i32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransformConstraintData {
    pub name: String,
    pub order: usize,
    pub bones: Vec<usize>,
    pub target: usize,
    pub offset_rotation: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub offset_scale_x: f32,
    pub offset_scale_y: f32,
    pub offset_shear_y: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PositionMode {
    Fixed,
    Percent,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SpacingMode {
    Length,
    Fixed,
    Percent,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RotateMode {
    Tangent,
    Chain,
    ChainScale,
}

impl PositionMode {
    pub(crate) fn from_binary(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Fixed),
            1 => Some(Self::Percent),
            _ => None,
        }
    }

    pub(crate) fn to_binary(self) -> i32 {
        match self {
            Self::Fixed => 0,
            Self::Percent => 1,
        }
    }
}

impl SpacingMode {
    pub(crate) fn from_binary(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Length),
            1 => Some(Self::Fixed),
            2 => Some(Self::Percent),
            _ => None,
        }
    }

    pub(crate) fn to_binary(self) -> i32 {
        match self {
            Self::Length => 0,
            Self::Fixed => 1,
            Self::Percent => 2,
        }
    }
}

impl RotateMode {
    pub(crate) fn from_binary(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Tangent),
            1 => Some(Self::Chain),
            2 => Some(Self::ChainScale),
            _ => None,
        }
    }

    pub(crate) fn to_binary(self) -> i32 {
        match self {
            Self::Tangent => 0,
            Self::Chain => 1,
            Self::ChainScale => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathConstraintData {
    pub name: String,
    pub order: usize,
    pub bones: Vec<usize>,
    /// Slot whose path attachment drives the constraint.
    pub target: usize,
    pub position_mode: PositionMode,
    pub spacing_mode: SpacingMode,
    pub rotate_mode: RotateMode,
    pub offset_rotation: f32,
    pub position: f32,
    pub spacing: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
}

impl PathConstraintData {
    /// Unit scale applied to `position` values (setup and timelines).
    pub fn position_scale(&self, scale: f32) -> f32 {
        if self.position_mode == PositionMode::Fixed {
            scale
        } else {
            1.0
        }
    }

    /// Unit scale applied to `spacing` values (setup and timelines).
    pub fn spacing_scale(&self, scale: f32) -> f32 {
        if matches!(self.spacing_mode, SpacingMode::Length | SpacingMode::Fixed) {
            scale
        } else {
            1.0
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventData {
    pub name: String,
    pub int_value: i32,
    pub float_value: f32,
    pub string_value: Option<String>,
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkinData {
    pub name: String,
    /// Per-slot attachments keyed by attachment name; indexed by slot.
    pub attachments: Vec<BTreeMap<String, Attachment>>,
}

impl SkinData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: Vec::new(),
        }
    }

    pub fn attachment(&self, slot_index: usize, attachment_name: &str) -> Option<&Attachment> {
        self.attachments
            .get(slot_index)
            .and_then(|slot_map| slot_map.get(attachment_name))
    }

    pub fn attachment_mut(
        &mut self,
        slot_index: usize,
        attachment_name: &str,
    ) -> Option<&mut Attachment> {
        self.attachments
            .get_mut(slot_index)
            .and_then(|slot_map| slot_map.get_mut(attachment_name))
    }

    /// Inserts or replaces the attachment stored under `(slot_index, name)`.
    pub fn set_attachment(
        &mut self,
        slot_index: usize,
        name: impl Into<String>,
        attachment: Attachment,
    ) -> Option<Attachment> {
        if self.attachments.len() <= slot_index {
            self.attachments.resize_with(slot_index + 1, BTreeMap::new);
        }
        self.attachments[slot_index].insert(name.into(), attachment)
    }

    /// `(slot, name, attachment)` in slot order, then name order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &Attachment)> {
        self.attachments.iter().enumerate().flat_map(|(slot, map)| {
            map.iter()
                .map(move |(name, attachment)| (slot, name.as_str(), attachment))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.iter().all(BTreeMap::is_empty)
    }
}

// Trailing empty slot maps carry no attachments and do not affect equality.
impl PartialEq for SkinData {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.iter().eq(other.iter())
    }
}

/// A decoded skeleton: rig plus animation library.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkeletonData {
    pub hash: Option<String>,
    pub version: Option<String>,
    pub width: f32,
    pub height: f32,
    /// Set when the export carried non-essential data.
    #[cfg_attr(feature = "serde", serde(default))]
    pub images_path: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub nonessential: bool,
    pub bones: Vec<BoneData>,
    pub slots: Vec<SlotData>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ik_constraints: Vec<IkConstraintData>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transform_constraints: Vec<TransformConstraintData>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub path_constraints: Vec<PathConstraintData>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_skin: Option<SkinData>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub skins: Vec<SkinData>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub events: Vec<EventData>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub animations: Vec<Animation>,
}

impl SkeletonData {
    pub fn find_bone(&self, name: &str) -> Option<&BoneData> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn find_slot(&self, name: &str) -> Option<&SlotData> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn find_event(&self, name: &str) -> Option<(usize, &EventData)> {
        self.events.iter().enumerate().find(|(_, e)| e.name == name)
    }

    pub fn animation(&self, name: &str) -> Option<(usize, &Animation)> {
        self.animations
            .iter()
            .enumerate()
            .find(|(_, a)| a.name == name)
    }

    /// Looks up a skin by name, checking the default skin first.
    pub fn skin(&self, name: &str) -> Option<&SkinData> {
        self.default_skin
            .as_ref()
            .filter(|s| s.name == name)
            .or_else(|| self.skins.iter().find(|s| s.name == name))
    }

    /// Skin by format index: the default skin (when present) is index 0, named skins follow.
    pub fn skin_at(&self, index: usize) -> Option<&SkinData> {
        self.all_skins().nth(index)
    }

    pub fn all_skins(&self) -> impl Iterator<Item = &SkinData> {
        self.default_skin.iter().chain(self.skins.iter())
    }

    pub fn skin_count(&self) -> usize {
        self.skins.len() + usize::from(self.default_skin.is_some())
    }
}
