//! Reader for the varint-based `.skel` binary format (Spine 3.5 exports).

use crate::error::ResultExt;
use crate::{
    Animation, Attachment, AttachmentFrame, AttachmentKind, AttachmentLoader,
    BlankAttachmentLoader, BlendMode, BoneData, ByteCursor, ColorFrame, Curve, DeformFrame,
    DrawOrderFrame, Error, EventData, EventFrame, FORMAT_MAJOR, FORMAT_MINOR, FloatFrame,
    IkConstraintData, IkFrame, LinkedMesh, PathConstraintData, PathMixFrame, PositionMode,
    RotateFrame, RotateMode, SkeletonData, SkinData, SlotData, SpacingMode, StringArena, Timeline,
    TransformConstraintData, TransformFrame, Vec2Frame, Vertices,
};
use std::collections::HashSet;

pub(crate) const DEFAULT_SKIN_NAME: &str = "default";

pub(crate) const SLOT_ATTACHMENT: u8 = 0;
pub(crate) const SLOT_COLOR: u8 = 1;

pub(crate) const BONE_ROTATE: u8 = 0;
pub(crate) const BONE_TRANSLATE: u8 = 1;
pub(crate) const BONE_SCALE: u8 = 2;
pub(crate) const BONE_SHEAR: u8 = 3;

pub(crate) const PATH_POSITION: u8 = 0;
pub(crate) const PATH_SPACING: u8 = 1;
pub(crate) const PATH_MIX: u8 = 2;

pub(crate) const CURVE_LINEAR: u8 = 0;
pub(crate) const CURVE_STEPPED: u8 = 1;
pub(crate) const CURVE_BEZIER: u8 = 2;

/// Decodes `.skel` bytes into a [`SkeletonData`].
///
/// ```no_run
/// let bytes = std::fs::read("hero.skel").unwrap();
/// let data = spine2d_skel::SkeletonDecoder::new().scale(0.5).decode(&bytes).unwrap();
/// println!("{} bones", data.bones.len());
/// ```
#[derive(Debug)]
pub struct SkeletonDecoder<L = BlankAttachmentLoader> {
    loader: L,
    scale: f32,
}

impl SkeletonDecoder<BlankAttachmentLoader> {
    pub fn new() -> Self {
        Self::with_loader(BlankAttachmentLoader)
    }
}

impl Default for SkeletonDecoder<BlankAttachmentLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: AttachmentLoader> SkeletonDecoder<L> {
    pub fn with_loader(loader: L) -> Self {
        Self { loader, scale: 1.0 }
    }

    /// Unit scale applied to positional values. Non-finite values fall back to `1.0`.
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = if scale.is_finite() { scale } else { 1.0 };
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn into_loader(self) -> L {
        self.loader
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Result<SkeletonData, Error> {
        let reader = Reader {
            input: ByteCursor::new(bytes),
            strings: StringArena::with_capacity(bytes.len() / 4),
            loader: &mut self.loader,
            scale: self.scale,
            nonessential: false,
            bone_count: 0,
            slot_count: 0,
        };
        reader.read_skeleton()
    }
}

impl SkeletonData {
    pub fn from_skel_bytes(bytes: &[u8]) -> Result<Self, Error> {
        SkeletonDecoder::new().decode(bytes)
    }

    pub fn from_skel_bytes_with_scale(bytes: &[u8], scale: f32) -> Result<Self, Error> {
        SkeletonDecoder::new().scale(scale).decode(bytes)
    }
}

#[derive(Clone, Debug)]
struct PendingLinkedMesh {
    skin_index: usize,
    slot_index: usize,
    attachment_key: String,
    parent_skin: Option<String>,
    parent_key: String,
}

struct Reader<'a, 'l, L: AttachmentLoader + ?Sized> {
    input: ByteCursor<'a>,
    strings: StringArena,
    loader: &'l mut L,
    scale: f32,
    nonessential: bool,
    bone_count: usize,
    slot_count: usize,
}

impl<L: AttachmentLoader + ?Sized> Reader<'_, '_, L> {
    fn read_skeleton(mut self) -> Result<SkeletonData, Error> {
        let hash = self.string().context_with(|| "header")?;
        let version = self.string().context_with(|| "header")?;
        warn_on_version(version.as_deref());
        let width = self.input.read_f32()?;
        let height = self.input.read_f32()?;
        self.nonessential = self.input.read_bool()?;
        let images_path = if self.nonessential {
            self.string().context_with(|| "header")?
        } else {
            None
        };
        log::debug!(
            "skel header: version={version:?} nonessential={} size={width}x{height}",
            self.nonessential
        );

        let bones = self.read_bones().context_with(|| "bones")?;
        self.bone_count = bones.len();
        let slots = self.read_slots().context_with(|| "slots")?;
        self.slot_count = slots.len();
        let ik_constraints = self
            .read_ik_constraints()
            .context_with(|| "ik constraints")?;
        let transform_constraints = self
            .read_transform_constraints()
            .context_with(|| "transform constraints")?;
        let path_constraints = self
            .read_path_constraints()
            .context_with(|| "path constraints")?;
        log::debug!(
            "skel rig: bones={} slots={} ik={} transform={} path={}",
            bones.len(),
            slots.len(),
            ik_constraints.len(),
            transform_constraints.len(),
            path_constraints.len()
        );

        // Skins are indexed with the default skin first, as deform timelines expect.
        let mut pending = Vec::new();
        let mut skins = Vec::new();
        let default_slot_count = self.input.read_count()?;
        let has_default = default_slot_count != 0;
        if has_default {
            let skin = self
                .read_skin(DEFAULT_SKIN_NAME, 0, default_slot_count, &mut pending)
                .context_with(|| "default skin")?;
            skins.push(skin);
        }
        let named_count = self.count(2)?;
        for _ in 0..named_count {
            let name = self.name()?;
            let slot_count = self.input.read_count()?;
            let skin = self
                .read_skin(&name, skins.len(), slot_count, &mut pending)
                .context_with(|| format!("skin '{name}'"))?;
            skins.push(skin);
        }
        log::debug!(
            "skel skins: default={has_default} named={named_count} linked meshes={}",
            pending.len()
        );

        self.resolve_linked_meshes(&mut skins, has_default, pending)?;

        let events = self.read_events().context_with(|| "events")?;

        let animation_count = self.count(1)?;
        let mut animations = Vec::with_capacity(animation_count);
        for _ in 0..animation_count {
            let name = self.name()?;
            let animation = self
                .read_animation(
                    &name,
                    &skins,
                    &ik_constraints,
                    &transform_constraints,
                    &path_constraints,
                    &events,
                )
                .context_with(|| format!("animation '{name}'"))?;
            log::trace!(
                "skel animation '{}': timelines={} duration={}",
                animation.name,
                animation.timelines.len(),
                animation.duration
            );
            animations.push(animation);
        }
        log::debug!(
            "skel events={} animations={}",
            events.len(),
            animations.len()
        );
        if !self.input.is_at_end() {
            log::debug!("skel: {} trailing bytes ignored", self.input.remaining());
        }

        let mut skins = skins.into_iter();
        let default_skin = if has_default { skins.next() } else { None };

        Ok(SkeletonData {
            hash,
            version,
            width,
            height,
            images_path,
            nonessential: self.nonessential,
            bones,
            slots,
            ik_constraints,
            transform_constraints,
            path_constraints,
            default_skin,
            skins: skins.collect(),
            events,
            animations,
        })
    }

    fn string(&mut self) -> Result<Option<String>, Error> {
        let s = self.input.read_string(&mut self.strings)?;
        Ok(s.map(|s| self.strings.get(s).to_owned()))
    }

    /// Names are never null in well-formed data; a null name reads as empty.
    fn name(&mut self) -> Result<String, Error> {
        Ok(self.string()?.unwrap_or_default())
    }

    fn scaled(&mut self) -> Result<f32, Error> {
        Ok(scaled_by(self.input.read_f32()?, self.scale))
    }

    fn count(&mut self, min_item_bytes: usize) -> Result<usize, Error> {
        let count = self.input.read_count()?;
        self.input.ensure_available(count, min_item_bytes)?;
        Ok(count)
    }

    fn index(&mut self, kind: &'static str, len: usize, context: &str) -> Result<usize, Error> {
        let value = self.input.read_varint(true)?;
        match usize::try_from(value) {
            Ok(index) if index < len => Ok(index),
            _ => Err(Error::IndexOutOfRange {
                kind,
                index: i64::from(value),
                len,
                context: context.to_string(),
            }),
        }
    }

    fn optional_color(&mut self) -> Result<Option<[f32; 4]>, Error> {
        if self.nonessential {
            Ok(Some(self.input.read_color()?))
        } else {
            Ok(None)
        }
    }

    fn float_array(&mut self, len: usize, scale: f32) -> Result<Vec<f32>, Error> {
        self.input.ensure_available(len, 4)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(scaled_by(self.input.read_f32()?, scale));
        }
        Ok(out)
    }

    fn short_array(&mut self) -> Result<Vec<u16>, Error> {
        let len = self.count(2)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.input.read_i16()? as u16);
        }
        Ok(out)
    }

    fn bone_list(&mut self, context: &str) -> Result<Vec<usize>, Error> {
        let count = self.count(1)?;
        let mut bones = Vec::with_capacity(count);
        for _ in 0..count {
            bones.push(self.index("bone", self.bone_count, context)?);
        }
        Ok(bones)
    }

    fn read_bones(&mut self) -> Result<Vec<BoneData>, Error> {
        // Name, 8 floats and 2 flags; later bones add a parent varint.
        let min_bone_bytes = if self.nonessential { 39 } else { 35 };
        let count = self.count(min_bone_bytes)?;
        let mut bones = Vec::with_capacity(count);
        for i in 0..count {
            let name = self.name()?;
            let parent = if i == 0 {
                None
            } else {
                Some(self.index("parent bone", i, &name)?)
            };
            let mut bone = BoneData::new(i, name, parent);
            bone.rotation = self.input.read_f32()?;
            bone.x = self.scaled()?;
            bone.y = self.scaled()?;
            bone.scale_x = self.input.read_f32()?;
            bone.scale_y = self.input.read_f32()?;
            bone.shear_x = self.input.read_f32()?;
            bone.shear_y = self.input.read_f32()?;
            bone.length = self.scaled()?;
            bone.inherit_rotation = self.input.read_bool()?;
            bone.inherit_scale = self.input.read_bool()?;
            bone.color = self.optional_color()?;
            bones.push(bone);
        }
        Ok(bones)
    }

    fn read_slots(&mut self) -> Result<Vec<SlotData>, Error> {
        let count = self.count(8)?;
        let mut slots = Vec::with_capacity(count);
        for i in 0..count {
            let name = self.name()?;
            let bone = self.index("bone", self.bone_count, &name)?;
            let mut slot = SlotData::new(i, name, bone);
            slot.color = self.input.read_color()?;
            slot.attachment = self.string()?;
            let offset = self.input.position();
            let blend = self.input.read_varint(true)?;
            slot.blend = BlendMode::from_binary(blend).ok_or(Error::InvalidTag {
                kind: "blend mode",
                value: blend,
                offset,
            })?;
            slots.push(slot);
        }
        Ok(slots)
    }

    fn read_ik_constraints(&mut self) -> Result<Vec<IkConstraintData>, Error> {
        let count = self.count(9)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.name()?;
            let order = self.input.read_count()?;
            let bones = self.bone_list(&name)?;
            let target = self.index("target bone", self.bone_count, &name)?;
            let mix = self.input.read_f32()?;
            let bend_direction = i32::from(self.input.read_i8()?);
            out.push(IkConstraintData {
                name,
                order,
                bones,
                target,
                mix,
                bend_direction,
            });
        }
        Ok(out)
    }

    fn read_transform_constraints(&mut self) -> Result<Vec<TransformConstraintData>, Error> {
        let count = self.count(44)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.name()?;
            let order = self.input.read_count()?;
            let bones = self.bone_list(&name)?;
            let target = self.index("target bone", self.bone_count, &name)?;
            out.push(TransformConstraintData {
                name,
                order,
                bones,
                target,
                offset_rotation: self.input.read_f32()?,
                offset_x: self.scaled()?,
                offset_y: self.scaled()?,
                offset_scale_x: self.input.read_f32()?,
                offset_scale_y: self.input.read_f32()?,
                offset_shear_y: self.input.read_f32()?,
                rotate_mix: self.input.read_f32()?,
                translate_mix: self.input.read_f32()?,
                scale_mix: self.input.read_f32()?,
                shear_mix: self.input.read_f32()?,
            });
        }
        Ok(out)
    }

    fn mode<T>(&mut self, kind: &'static str, map: fn(i32) -> Option<T>) -> Result<T, Error> {
        let offset = self.input.position();
        let value = self.input.read_varint(true)?;
        map(value).ok_or(Error::InvalidTag {
            kind,
            value,
            offset,
        })
    }

    fn read_path_constraints(&mut self) -> Result<Vec<PathConstraintData>, Error> {
        let count = self.count(27)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.name()?;
            let order = self.input.read_count()?;
            let bones = self.bone_list(&name)?;
            let target = self.index("target slot", self.slot_count, &name)?;
            let position_mode = self.mode("position mode", PositionMode::from_binary)?;
            let spacing_mode = self.mode("spacing mode", SpacingMode::from_binary)?;
            let rotate_mode = self.mode("rotate mode", RotateMode::from_binary)?;
            let mut data = PathConstraintData {
                name,
                order,
                bones,
                target,
                position_mode,
                spacing_mode,
                rotate_mode,
                offset_rotation: self.input.read_f32()?,
                position: 0.0,
                spacing: 0.0,
                rotate_mix: 0.0,
                translate_mix: 0.0,
            };
            data.position = scaled_by(self.input.read_f32()?, data.position_scale(self.scale));
            data.spacing = scaled_by(self.input.read_f32()?, data.spacing_scale(self.scale));
            data.rotate_mix = self.input.read_f32()?;
            data.translate_mix = self.input.read_f32()?;
            out.push(data);
        }
        Ok(out)
    }

    fn read_skin(
        &mut self,
        name: &str,
        skin_index: usize,
        slot_count: usize,
        pending: &mut Vec<PendingLinkedMesh>,
    ) -> Result<SkinData, Error> {
        self.input.ensure_available(slot_count, 2)?;
        let mut skin = SkinData::new(name);
        for _ in 0..slot_count {
            let slot_index = self.index("slot", self.slot_count, name)?;
            let attachment_count = self.count(3)?;
            for _ in 0..attachment_count {
                let key = self.name()?;
                let pending_before = pending.len();
                let attachment = self
                    .read_attachment(name, skin_index, slot_index, &key, pending)
                    .context_with(|| format!("attachment '{key}' (slot {slot_index})"))?;
                log::trace!(
                    "skel attachment: skin={name} slot={slot_index} key={key} kind={:?}",
                    attachment.kind()
                );
                if skin.set_attachment(slot_index, key.as_str(), attachment).is_some() {
                    log::warn!("skin '{name}' slot {slot_index}: duplicate attachment '{key}'");
                    let mut i = 0;
                    pending.retain(|p| {
                        let stale = i < pending_before
                            && p.skin_index == skin_index
                            && p.slot_index == slot_index
                            && p.attachment_key == key;
                        i += 1;
                        !stale
                    });
                }
            }
        }
        Ok(skin)
    }

    fn create(
        &mut self,
        skin: &str,
        kind: AttachmentKind,
        name: &str,
        path: Option<&str>,
    ) -> Result<Attachment, Error> {
        self.loader
            .create_attachment(skin, kind, name, path)
            .ok_or_else(|| Error::AttachmentRejected {
                skin: skin.to_string(),
                name: name.to_string(),
                kind,
            })
    }

    fn read_attachment(
        &mut self,
        skin: &str,
        skin_index: usize,
        slot_index: usize,
        key: &str,
        pending: &mut Vec<PendingLinkedMesh>,
    ) -> Result<Attachment, Error> {
        let name = self.string()?.unwrap_or_else(|| key.to_string());
        let offset = self.input.position();
        let tag = self.input.read_u8()?;
        let kind = AttachmentKind::from_binary(tag).ok_or(Error::InvalidTag {
            kind: "attachment",
            value: i32::from(tag),
            offset,
        })?;

        let mut attachment = match kind {
            AttachmentKind::Region => {
                let path = self.string()?.unwrap_or_else(|| name.clone());
                let mut attachment = self.create(skin, kind, &name, Some(&path))?;
                let Attachment::Region(region) = &mut attachment else {
                    return Err(kind_mismatch(&name, kind, &attachment));
                };
                region.path = path;
                region.rotation = self.input.read_f32()?;
                region.x = self.scaled()?;
                region.y = self.scaled()?;
                region.scale_x = self.input.read_f32()?;
                region.scale_y = self.input.read_f32()?;
                region.width = self.scaled()?;
                region.height = self.scaled()?;
                region.color = self.input.read_color()?;
                attachment
            }
            AttachmentKind::BoundingBox => {
                let mut attachment = self.create(skin, kind, &name, None)?;
                let Attachment::BoundingBox(bbox) = &mut attachment else {
                    return Err(kind_mismatch(&name, kind, &attachment));
                };
                bbox.vertex_count = self.input.read_count()?;
                bbox.vertices = self.read_vertices(bbox.vertex_count)?;
                bbox.color = self.optional_color()?;
                attachment
            }
            AttachmentKind::Mesh => {
                let path = self.string()?.unwrap_or_else(|| name.clone());
                let mut attachment = self.create(skin, kind, &name, Some(&path))?;
                let Attachment::Mesh(mesh) = &mut attachment else {
                    return Err(kind_mismatch(&name, kind, &attachment));
                };
                mesh.path = path;
                mesh.color = self.input.read_color()?;
                mesh.vertex_count = self.input.read_count()?;
                let uv_len = component_len(mesh.vertex_count, 2)?;
                mesh.uvs = self.float_array(uv_len, 1.0)?;
                mesh.triangles = self.short_array()?;
                mesh.vertices = self.read_vertices(mesh.vertex_count)?;
                mesh.hull_length = component_len(self.input.read_count()?, 2)?;
                if self.nonessential {
                    mesh.edges = self.short_array()?;
                    mesh.width = self.scaled()?;
                    mesh.height = self.scaled()?;
                }
                attachment
            }
            AttachmentKind::LinkedMesh => {
                let path = self.string()?.unwrap_or_else(|| name.clone());
                let mut attachment = self.create(skin, kind, &name, Some(&path))?;
                let Attachment::Mesh(mesh) = &mut attachment else {
                    return Err(kind_mismatch(&name, kind, &attachment));
                };
                mesh.path = path;
                mesh.color = self.input.read_color()?;
                let parent_skin = self.string()?;
                let parent = self.name()?;
                let inherit_deform = self.input.read_bool()?;
                if self.nonessential {
                    mesh.width = self.scaled()?;
                    mesh.height = self.scaled()?;
                }
                pending.push(PendingLinkedMesh {
                    skin_index,
                    slot_index,
                    attachment_key: key.to_string(),
                    parent_skin: parent_skin.clone(),
                    parent_key: parent.clone(),
                });
                mesh.linked = Some(LinkedMesh {
                    skin: parent_skin,
                    parent,
                    inherit_deform,
                });
                // Configured once the parent geometry is copied in.
                return Ok(attachment);
            }
            AttachmentKind::Path => {
                let mut attachment = self.create(skin, kind, &name, None)?;
                let Attachment::Path(path) = &mut attachment else {
                    return Err(kind_mismatch(&name, kind, &attachment));
                };
                path.closed = self.input.read_bool()?;
                path.constant_speed = self.input.read_bool()?;
                path.vertex_count = self.input.read_count()?;
                path.vertices = self.read_vertices(path.vertex_count)?;
                let scale = self.scale;
                path.lengths = self.float_array(path.vertex_count / 3, scale)?;
                path.color = self.optional_color()?;
                attachment
            }
        };
        self.loader.configure_attachment(&mut attachment);
        Ok(attachment)
    }

    /// Reads a vertex block after its `vertexCount`.
    ///
    /// Weighted blocks are scanned twice: once to count influences so both buffers can be
    /// allocated exactly, then again to fill them.
    fn read_vertices(&mut self, vertex_count: usize) -> Result<Vertices, Error> {
        let weighted = self.input.read_bool()?;
        if !weighted {
            let len = component_len(vertex_count, 2)?;
            let scale = self.scale;
            return Ok(Vertices::unweighted(self.float_array(len, scale)?));
        }

        self.input.ensure_available(vertex_count, 1)?;
        let start = self.input.position();
        let mut influences = 0usize;
        for _ in 0..vertex_count {
            let bone_count = self.input.read_count()?;
            for _ in 0..bone_count {
                self.input.read_varint(true)?;
                self.input.skip(12)?;
            }
            influences += bone_count;
        }
        self.input.seek(start)?;

        let bones_len = vertex_count + influences;
        let values_len = component_len(influences, 3)?;
        let mut bones = Vec::new();
        bones
            .try_reserve_exact(bones_len)
            .map_err(|_| Error::Allocation {
                context: "vertex bones",
                len: bones_len,
            })?;
        let mut values = Vec::new();
        values
            .try_reserve_exact(values_len)
            .map_err(|_| Error::Allocation {
                context: "vertex weights",
                len: values_len,
            })?;

        for _ in 0..vertex_count {
            let bone_count = self.input.read_count()?;
            bones.push(bone_count as u32);
            for _ in 0..bone_count {
                let bone = self.index("bone", self.bone_count, "weighted vertices")?;
                bones.push(bone as u32);
                values.push(self.scaled()?);
                values.push(self.scaled()?);
                values.push(self.input.read_f32()?);
            }
        }
        Ok(Vertices { bones, values })
    }

    fn resolve_linked_meshes(
        &mut self,
        skins: &mut [SkinData],
        has_default: bool,
        pending: Vec<PendingLinkedMesh>,
    ) -> Result<(), Error> {
        let mut remaining = pending;
        while !remaining.is_empty() {
            let waiting: HashSet<(usize, usize, String)> = remaining
                .iter()
                .map(|p| (p.skin_index, p.slot_index, p.attachment_key.clone()))
                .collect();
            let mut next = Vec::new();
            let mut resolved_any = false;

            for p in remaining {
                let parent_skin_index = match &p.parent_skin {
                    None if has_default => 0,
                    None => {
                        return Err(Error::LinkedMeshSkinNotFound {
                            mesh: p.attachment_key,
                            skin: DEFAULT_SKIN_NAME.to_string(),
                        });
                    }
                    Some(name) => skins
                        .iter()
                        .position(|s| &s.name == name)
                        .ok_or_else(|| Error::LinkedMeshSkinNotFound {
                            mesh: p.attachment_key.clone(),
                            skin: name.clone(),
                        })?,
                };
                let parent_skin = &skins[parent_skin_index];
                let Some(parent) = parent_skin.attachment(p.slot_index, &p.parent_key) else {
                    return Err(Error::LinkedMeshParentNotFound {
                        mesh: p.attachment_key,
                        parent: p.parent_key,
                        skin: parent_skin.name.clone(),
                        slot: p.slot_index,
                    });
                };
                let Attachment::Mesh(parent_mesh) = parent else {
                    return Err(Error::LinkedMeshParentNotMesh {
                        mesh: p.attachment_key,
                        parent: p.parent_key,
                    });
                };
                if waiting.contains(&(parent_skin_index, p.slot_index, p.parent_key.clone())) {
                    next.push(p);
                    continue;
                }
                let parent_mesh = parent_mesh.clone();

                if let Some(attachment) =
                    skins[p.skin_index].attachment_mut(p.slot_index, &p.attachment_key)
                {
                    if let Attachment::Mesh(mesh) = &mut *attachment {
                        if mesh.linked.is_some() {
                            mesh.copy_geometry_from(&parent_mesh);
                            self.loader.configure_attachment(attachment);
                        }
                    }
                }
                resolved_any = true;
            }

            if !resolved_any {
                if let Some(p) = next.first() {
                    return Err(Error::LinkedMeshCycle {
                        skin: skins[p.skin_index].name.clone(),
                        slot: p.slot_index,
                        attachment: p.attachment_key.clone(),
                    });
                }
            }
            remaining = next;
        }
        Ok(())
    }

    fn read_events(&mut self) -> Result<Vec<EventData>, Error> {
        let count = self.count(7)?;
        let mut events = Vec::with_capacity(count);
        for _ in 0..count {
            events.push(EventData {
                name: self.name()?,
                int_value: self.input.read_varint(false)?,
                float_value: self.input.read_f32()?,
                string_value: self.string()?,
            });
        }
        Ok(events)
    }

    fn curve(&mut self, frame: usize, frame_count: usize) -> Result<Curve, Error> {
        if frame + 1 == frame_count {
            return Ok(Curve::Linear);
        }
        let offset = self.input.position();
        match self.input.read_u8()? {
            CURVE_LINEAR => Ok(Curve::Linear),
            CURVE_STEPPED => Ok(Curve::Stepped),
            CURVE_BEZIER => Ok(Curve::Bezier {
                cx1: self.input.read_f32()?,
                cy1: self.input.read_f32()?,
                cx2: self.input.read_f32()?,
                cy2: self.input.read_f32()?,
            }),
            other => Err(Error::InvalidTag {
                kind: "curve",
                value: i32::from(other),
                offset,
            }),
        }
    }

    fn vec2_frames(&mut self, frame_count: usize, scale: f32) -> Result<Vec<Vec2Frame>, Error> {
        let mut frames = Vec::with_capacity(frame_count);
        for i in 0..frame_count {
            frames.push(Vec2Frame {
                time: self.input.read_f32()?,
                x: scaled_by(self.input.read_f32()?, scale),
                y: scaled_by(self.input.read_f32()?, scale),
                curve: self.curve(i, frame_count)?,
            });
        }
        Ok(frames)
    }

    fn float_frames(&mut self, frame_count: usize, scale: f32) -> Result<Vec<FloatFrame>, Error> {
        let mut frames = Vec::with_capacity(frame_count);
        for i in 0..frame_count {
            frames.push(FloatFrame {
                time: self.input.read_f32()?,
                value: scaled_by(self.input.read_f32()?, scale),
                curve: self.curve(i, frame_count)?,
            });
        }
        Ok(frames)
    }

    fn read_animation(
        &mut self,
        name: &str,
        skins: &[SkinData],
        ik_constraints: &[IkConstraintData],
        transform_constraints: &[TransformConstraintData],
        path_constraints: &[PathConstraintData],
        events: &[EventData],
    ) -> Result<Animation, Error> {
        let mut timelines = Vec::new();
        self.read_slot_timelines(&mut timelines)
            .context_with(|| "slot timelines")?;
        self.read_bone_timelines(&mut timelines)
            .context_with(|| "bone timelines")?;

        let ik_count = self.count(2)?;
        for _ in 0..ik_count {
            let constraint = self.index("ik constraint", ik_constraints.len(), "ik timelines")?;
            let frame_count = self.count(9)?;
            let mut frames = Vec::with_capacity(frame_count);
            for i in 0..frame_count {
                frames.push(IkFrame {
                    time: self.input.read_f32()?,
                    mix: self.input.read_f32()?,
                    bend_direction: i32::from(self.input.read_i8()?),
                    curve: self.curve(i, frame_count)?,
                });
            }
            timelines.push(Timeline::IkConstraint { constraint, frames });
        }

        let transform_count = self.count(2)?;
        for _ in 0..transform_count {
            let constraint = self.index(
                "transform constraint",
                transform_constraints.len(),
                "transform timelines",
            )?;
            let frame_count = self.count(20)?;
            let mut frames = Vec::with_capacity(frame_count);
            for i in 0..frame_count {
                frames.push(TransformFrame {
                    time: self.input.read_f32()?,
                    rotate_mix: self.input.read_f32()?,
                    translate_mix: self.input.read_f32()?,
                    scale_mix: self.input.read_f32()?,
                    shear_mix: self.input.read_f32()?,
                    curve: self.curve(i, frame_count)?,
                });
            }
            timelines.push(Timeline::TransformConstraint { constraint, frames });
        }

        self.read_path_timelines(&mut timelines, path_constraints)
            .context_with(|| "path timelines")?;
        self.read_deform_timelines(&mut timelines, skins)
            .context_with(|| "deform timelines")?;

        let draw_order_count = self.count(5)?;
        if draw_order_count > 0 {
            let frames = self
                .read_draw_order_frames(draw_order_count)
                .context_with(|| "draw order timeline")?;
            timelines.push(Timeline::DrawOrder { frames });
        }

        let event_count = self.count(10)?;
        if event_count > 0 {
            let mut frames = Vec::with_capacity(event_count);
            for _ in 0..event_count {
                let time = self.input.read_f32()?;
                let event = self.index("event", events.len(), "event timeline")?;
                let int_value = self.input.read_varint(false)?;
                let float_value = self.input.read_f32()?;
                let string_value = if self.input.read_bool()? {
                    self.string()?
                } else {
                    events[event].string_value.clone()
                };
                frames.push(EventFrame {
                    time,
                    event,
                    int_value,
                    float_value,
                    string_value,
                });
            }
            timelines.push(Timeline::Event { frames });
        }

        Ok(Animation::new(name, timelines))
    }

    fn read_slot_timelines(&mut self, timelines: &mut Vec<Timeline>) -> Result<(), Error> {
        let slot_entries = self.count(2)?;
        for _ in 0..slot_entries {
            let slot = self.index("slot", self.slot_count, "slot timelines")?;
            let timeline_count = self.count(2)?;
            for _ in 0..timeline_count {
                let offset = self.input.position();
                let tag = self.input.read_u8()?;
                let frame_count = self.count(5)?;
                match tag {
                    SLOT_ATTACHMENT => {
                        let mut frames = Vec::with_capacity(frame_count);
                        for _ in 0..frame_count {
                            frames.push(AttachmentFrame {
                                time: self.input.read_f32()?,
                                name: self.string()?,
                            });
                        }
                        timelines.push(Timeline::SlotAttachment { slot, frames });
                    }
                    SLOT_COLOR => {
                        let mut frames = Vec::with_capacity(frame_count);
                        for i in 0..frame_count {
                            frames.push(ColorFrame {
                                time: self.input.read_f32()?,
                                color: self.input.read_color()?,
                                curve: self.curve(i, frame_count)?,
                            });
                        }
                        timelines.push(Timeline::SlotColor { slot, frames });
                    }
                    other => {
                        return Err(Error::InvalidTag {
                            kind: "slot timeline",
                            value: i32::from(other),
                            offset,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn read_bone_timelines(&mut self, timelines: &mut Vec<Timeline>) -> Result<(), Error> {
        let bone_entries = self.count(2)?;
        for _ in 0..bone_entries {
            let bone = self.index("bone", self.bone_count, "bone timelines")?;
            let timeline_count = self.count(2)?;
            for _ in 0..timeline_count {
                let offset = self.input.position();
                let tag = self.input.read_u8()?;
                let frame_count = self.count(8)?;
                match tag {
                    BONE_ROTATE => {
                        let mut frames = Vec::with_capacity(frame_count);
                        for i in 0..frame_count {
                            frames.push(RotateFrame {
                                time: self.input.read_f32()?,
                                angle: self.input.read_f32()?,
                                curve: self.curve(i, frame_count)?,
                            });
                        }
                        timelines.push(Timeline::BoneRotate { bone, frames });
                    }
                    BONE_TRANSLATE => {
                        let frames = self.vec2_frames(frame_count, self.scale)?;
                        timelines.push(Timeline::BoneTranslate { bone, frames });
                    }
                    BONE_SCALE => {
                        let frames = self.vec2_frames(frame_count, 1.0)?;
                        timelines.push(Timeline::BoneScale { bone, frames });
                    }
                    BONE_SHEAR => {
                        let frames = self.vec2_frames(frame_count, 1.0)?;
                        timelines.push(Timeline::BoneShear { bone, frames });
                    }
                    other => {
                        return Err(Error::InvalidTag {
                            kind: "bone timeline",
                            value: i32::from(other),
                            offset,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn read_path_timelines(
        &mut self,
        timelines: &mut Vec<Timeline>,
        path_constraints: &[PathConstraintData],
    ) -> Result<(), Error> {
        let path_entries = self.count(2)?;
        for _ in 0..path_entries {
            let constraint =
                self.index("path constraint", path_constraints.len(), "path timelines")?;
            let data = &path_constraints[constraint];
            let timeline_count = self.count(2)?;
            for _ in 0..timeline_count {
                let offset = self.input.position();
                let tag = self.input.read_u8()?;
                let frame_count = self.count(8)?;
                match tag {
                    PATH_POSITION => {
                        let scale = data.position_scale(self.scale);
                        let frames = self.float_frames(frame_count, scale)?;
                        timelines.push(Timeline::PathPosition { constraint, frames });
                    }
                    PATH_SPACING => {
                        let scale = data.spacing_scale(self.scale);
                        let frames = self.float_frames(frame_count, scale)?;
                        timelines.push(Timeline::PathSpacing { constraint, frames });
                    }
                    PATH_MIX => {
                        let mut frames = Vec::with_capacity(frame_count);
                        for i in 0..frame_count {
                            frames.push(PathMixFrame {
                                time: self.input.read_f32()?,
                                rotate_mix: self.input.read_f32()?,
                                translate_mix: self.input.read_f32()?,
                                curve: self.curve(i, frame_count)?,
                            });
                        }
                        timelines.push(Timeline::PathMix { constraint, frames });
                    }
                    other => {
                        return Err(Error::InvalidTag {
                            kind: "path timeline",
                            value: i32::from(other),
                            offset,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn read_deform_timelines(
        &mut self,
        timelines: &mut Vec<Timeline>,
        skins: &[SkinData],
    ) -> Result<(), Error> {
        let skin_entries = self.count(2)?;
        for _ in 0..skin_entries {
            let skin = self.index("skin", skins.len(), "deform timelines")?;
            let slot_entries = self.count(2)?;
            for _ in 0..slot_entries {
                let slot = self.index("slot", self.slot_count, "deform timelines")?;
                let timeline_count = self.count(2)?;
                for _ in 0..timeline_count {
                    let key = self.name()?;
                    let frames = self
                        .read_deform_frames(&skins[skin], slot, &key)
                        .context_with(|| format!("deform '{key}' (skin {skin}, slot {slot})"))?;
                    timelines.push(Timeline::Deform {
                        skin,
                        slot,
                        attachment: key,
                        frames,
                    });
                }
            }
        }
        Ok(())
    }

    fn read_deform_frames(
        &mut self,
        skin: &SkinData,
        slot: usize,
        key: &str,
    ) -> Result<Vec<DeformFrame>, Error> {
        let Some(attachment) = skin.attachment(slot, key) else {
            return Err(Error::InvalidValue {
                message: format!("skin '{}' has no attachment '{key}' in slot {slot}", skin.name),
            });
        };
        let Some(base) = attachment.vertices() else {
            return Err(Error::InvalidValue {
                message: format!(
                    "{} attachment '{key}' has no vertices to deform",
                    attachment.variant_name()
                ),
            });
        };
        let weighted = base.is_weighted();
        let deform_length = base.deform_length();

        let frame_count = self.count(5)?;
        let mut frames = Vec::with_capacity(frame_count);
        for i in 0..frame_count {
            let time = self.input.read_f32()?;
            let end = self.input.read_count()?;
            let (offset, deltas, vertices) = if end == 0 {
                let vertices = if weighted {
                    vec![0.0; deform_length]
                } else {
                    base.values.clone()
                };
                (0, Vec::new(), vertices)
            } else {
                let start = self.input.read_count()?;
                if start.checked_add(end).is_none_or(|stop| stop > deform_length) {
                    return Err(Error::InvalidValue {
                        message: format!(
                            "deform range {start}+{end} exceeds vertex length {deform_length}"
                        ),
                    });
                }
                let scale = self.scale;
                let deltas = self.float_array(end, scale)?;
                let mut vertices = if weighted {
                    vec![0.0; deform_length]
                } else {
                    base.values.clone()
                };
                for (dst, delta) in vertices[start..start + end].iter_mut().zip(&deltas) {
                    if weighted {
                        *dst = *delta;
                    } else {
                        *dst += *delta;
                    }
                }
                (start, deltas, vertices)
            };
            frames.push(DeformFrame {
                time,
                offset,
                deltas,
                vertices,
                curve: self.curve(i, frame_count)?,
            });
        }
        Ok(frames)
    }

    fn read_draw_order_frames(&mut self, frame_count: usize) -> Result<Vec<DrawOrderFrame>, Error> {
        let mut frames = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            let time = self.input.read_f32()?;
            let offset_count = self.input.read_count()?;
            if offset_count > self.slot_count {
                return Err(Error::InvalidValue {
                    message: format!(
                        "draw order offset count {offset_count} exceeds slot count {}",
                        self.slot_count
                    ),
                });
            }
            let mut offsets = Vec::with_capacity(offset_count);
            for _ in 0..offset_count {
                let slot = self.index("slot", self.slot_count, "draw order")?;
                let displacement = self.input.read_varint(true)?;
                offsets.push((slot, displacement));
            }
            let draw_order = reconstruct_draw_order(self.slot_count, &offsets)?;
            frames.push(DrawOrderFrame { time, draw_order });
        }
        Ok(frames)
    }
}

/// Rebuilds a full draw order from `(slot, displacement)` entries in increasing slot order.
///
/// Displaced slots land at `slot + displacement`; the remaining slots keep their relative
/// order and fill the free positions from the back.
pub(crate) fn reconstruct_draw_order(
    slot_count: usize,
    offsets: &[(usize, i32)],
) -> Result<Vec<usize>, Error> {
    let mut draw_order = vec![usize::MAX; slot_count];
    let mut unchanged = Vec::with_capacity(slot_count.saturating_sub(offsets.len()));
    let mut original_index = 0usize;
    for &(slot_index, displacement) in offsets {
        if slot_index < original_index || slot_index >= slot_count {
            return Err(Error::InvalidValue {
                message: format!(
                    "draw order slot {slot_index} out of order (next expected >= {original_index})"
                ),
            });
        }
        while original_index != slot_index {
            unchanged.push(original_index);
            original_index += 1;
        }
        let dst = original_index as i64 + i64::from(displacement);
        let Some(dst) = usize::try_from(dst).ok().filter(|&d| d < slot_count) else {
            return Err(Error::InvalidValue {
                message: format!(
                    "draw order moves slot {slot_index} by {displacement} outside 0..{slot_count}"
                ),
            });
        };
        if draw_order[dst] != usize::MAX {
            return Err(Error::InvalidValue {
                message: format!("draw order position {dst} assigned twice"),
            });
        }
        draw_order[dst] = original_index;
        original_index += 1;
    }
    while original_index < slot_count {
        unchanged.push(original_index);
        original_index += 1;
    }
    for i in (0..slot_count).rev() {
        if draw_order[i] == usize::MAX {
            draw_order[i] = unchanged.pop().ok_or_else(|| Error::InvalidValue {
                message: "draw order has more free positions than unchanged slots".to_string(),
            })?;
        }
    }
    Ok(draw_order)
}

/// Scale of exactly `1.0` leaves the stored bits untouched.
fn scaled_by(value: f32, scale: f32) -> f32 {
    if scale == 1.0 { value } else { value * scale }
}

fn component_len(count: usize, per_item: usize) -> Result<usize, Error> {
    count.checked_mul(per_item).ok_or_else(|| Error::InvalidValue {
        message: format!("{count} x {per_item} components overflow"),
    })
}

fn kind_mismatch(name: &str, requested: AttachmentKind, actual: &Attachment) -> Error {
    Error::LoaderKindMismatch {
        name: name.to_string(),
        requested,
        actual: actual.variant_name(),
    }
}

fn warn_on_version(version: Option<&str>) {
    let Some(version) = version else {
        log::debug!("skel header has no version");
        return;
    };
    if !is_supported_version(version) {
        log::warn!(
            "skel version {version:?} is not {FORMAT_MAJOR}.{FORMAT_MINOR}; decoding anyway"
        );
    }
}

fn is_supported_version(version: &str) -> bool {
    let mut parts = version.split('.').map(|p| p.parse::<u32>().ok());
    parts.next().flatten() == Some(FORMAT_MAJOR) && parts.next().flatten() == Some(FORMAT_MINOR)
}
