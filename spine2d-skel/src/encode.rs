//! Writer producing `.skel` bytes in the layout [`crate::SkeletonDecoder`] reads.

use crate::decode::{
    BONE_ROTATE, BONE_SCALE, BONE_SHEAR, BONE_TRANSLATE, CURVE_BEZIER, CURVE_LINEAR,
    CURVE_STEPPED, PATH_MIX, PATH_POSITION, PATH_SPACING, SLOT_ATTACHMENT, SLOT_COLOR,
};
use crate::{
    Animation, Attachment, ByteWriter, Curve, DrawOrderFrame, Error, EventFrame,
    FORMAT_VERSION, MeshAttachment, SkeletonData, SkinData, Timeline, Vertices,
};

/// Editor colors written when non-essential data is requested but the document has none.
const DEFAULT_BONE_COLOR: [f32; 4] = [
    0x9b as f32 / 255.0,
    0x9b as f32 / 255.0,
    0x9b as f32 / 255.0,
    1.0,
];
const DEFAULT_BOUNDING_BOX_COLOR: [f32; 4] = [0x60 as f32 / 255.0, 0xf0 as f32 / 255.0, 0.0, 1.0];
const DEFAULT_PATH_COLOR: [f32; 4] = [1.0, 0x7f as f32 / 255.0, 0.0, 1.0];

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EncodeOptions {
    /// Write the non-essential flag and every non-essential field.
    pub nonessential: bool,
    /// Drop timelines without frames and named skins without attachments.
    pub trim: bool,
    /// Fill a missing header version with [`FORMAT_VERSION`].
    pub makeup: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SkeletonEncoder {
    options: EncodeOptions,
}

impl SkeletonEncoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> EncodeOptions {
        self.options
    }

    pub fn encode(&self, data: &SkeletonData) -> Result<Vec<u8>, Error> {
        let mut writer = Writer {
            out: ByteWriter::new(),
            data,
            options: self.options,
            skin_remap: skin_remap(data, self.options.trim),
        };
        writer.write_skeleton()?;
        log::debug!(
            "skel encoded: {} bytes (nonessential={} trim={} makeup={})",
            writer.out.len(),
            self.options.nonessential,
            self.options.trim,
            self.options.makeup
        );
        Ok(writer.out.into_bytes())
    }
}

impl SkeletonData {
    /// Encodes with non-essential data exactly when the document carries it.
    pub fn to_skel_bytes(&self) -> Result<Vec<u8>, Error> {
        SkeletonEncoder::new(EncodeOptions {
            nonessential: self.nonessential,
            ..EncodeOptions::default()
        })
        .encode(self)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidDocument {
        message: message.into(),
    }
}

fn check_index(kind: &str, index: usize, len: usize, context: &str) -> Result<(), Error> {
    if index < len {
        Ok(())
    } else {
        Err(invalid(format!(
            "{context}: {kind} index {index} out of range (len={len})"
        )))
    }
}

/// Maps document skin indices (default first) to written indices; `None` for skins not written.
///
/// An empty default skin cannot be written (a zero slot count means "no default skin").
fn skin_remap(data: &SkeletonData, trim: bool) -> Vec<Option<usize>> {
    let mut next = 0;
    let mut keep = |write: bool| {
        if write {
            next += 1;
            Some(next - 1)
        } else {
            None
        }
    };
    let mut out = Vec::with_capacity(data.skin_count());
    if let Some(skin) = &data.default_skin {
        out.push(keep(!skin.is_empty()));
    }
    for skin in &data.skins {
        out.push(keep(!(trim && skin.is_empty())));
    }
    out
}

/// Appends `item` under `key`, keeping keys in first-appearance order.
fn group<K: PartialEq, T>(groups: &mut Vec<(K, Vec<T>)>, key: K, item: T) {
    if let Some((_, items)) = groups.iter_mut().find(|(k, _)| *k == key) {
        items.push(item);
    } else {
        groups.push((key, vec![item]));
    }
}

struct Writer<'d> {
    out: ByteWriter,
    data: &'d SkeletonData,
    options: EncodeOptions,
    skin_remap: Vec<Option<usize>>,
}

impl Writer<'_> {
    fn write_skeleton(&mut self) -> Result<(), Error> {
        let data = self.data;
        let version = match (&data.version, self.options.makeup) {
            (None, true) => Some(FORMAT_VERSION),
            (version, _) => version.as_deref(),
        };
        self.out.write_string(data.hash.as_deref())?;
        self.out.write_string(version)?;
        self.out.write_f32(data.width);
        self.out.write_f32(data.height);
        self.out.write_bool(self.options.nonessential);
        if self.options.nonessential {
            self.out.write_string(data.images_path.as_deref())?;
        }

        self.write_bones()?;
        self.write_slots()?;
        self.write_constraints()?;

        match &data.default_skin {
            Some(skin) if !skin.is_empty() => self.write_skin_body(skin)?,
            _ => self.out.write_varint(0, true),
        }
        let named: Vec<&SkinData> = data
            .skins
            .iter()
            .filter(|s| !(self.options.trim && s.is_empty()))
            .collect();
        self.out.write_count(named.len())?;
        for skin in named {
            self.out.write_string(Some(&skin.name))?;
            self.write_skin_body(skin)?;
        }

        self.out.write_count(data.events.len())?;
        for event in &data.events {
            self.out.write_string(Some(&event.name))?;
            self.out.write_varint(event.int_value, false);
            self.out.write_f32(event.float_value);
            self.out.write_string(event.string_value.as_deref())?;
        }

        self.out.write_count(data.animations.len())?;
        for animation in &data.animations {
            self.write_animation(animation)
                .map_err(|e| e.context(format!("animation '{}'", animation.name)))?;
        }
        Ok(())
    }

    fn write_bones(&mut self) -> Result<(), Error> {
        let bones = &self.data.bones;
        self.out.write_count(bones.len())?;
        for (i, bone) in bones.iter().enumerate() {
            self.out.write_string(Some(&bone.name))?;
            match (i, bone.parent) {
                (0, None) => {}
                (0, Some(_)) => return Err(invalid("the first bone cannot have a parent")),
                (_, Some(parent)) if parent < i => self.out.write_count(parent)?,
                (_, parent) => {
                    return Err(invalid(format!(
                        "bone '{}' (index {i}) needs a parent before it, got {parent:?}",
                        bone.name
                    )));
                }
            }
            self.out.write_f32(bone.rotation);
            self.out.write_f32(bone.x);
            self.out.write_f32(bone.y);
            self.out.write_f32(bone.scale_x);
            self.out.write_f32(bone.scale_y);
            self.out.write_f32(bone.shear_x);
            self.out.write_f32(bone.shear_y);
            self.out.write_f32(bone.length);
            self.out.write_bool(bone.inherit_rotation);
            self.out.write_bool(bone.inherit_scale);
            if self.options.nonessential {
                self.out.write_color(bone.color.unwrap_or(DEFAULT_BONE_COLOR));
            }
        }
        Ok(())
    }

    fn write_slots(&mut self) -> Result<(), Error> {
        let data = self.data;
        self.out.write_count(data.slots.len())?;
        for slot in &data.slots {
            check_index("bone", slot.bone, data.bones.len(), &slot.name)?;
            self.out.write_string(Some(&slot.name))?;
            self.out.write_count(slot.bone)?;
            self.out.write_color(slot.color);
            self.out.write_string(slot.attachment.as_deref())?;
            self.out.write_varint(slot.blend.to_binary(), true);
        }
        Ok(())
    }

    fn write_bone_list(&mut self, bones: &[usize], context: &str) -> Result<(), Error> {
        self.out.write_count(bones.len())?;
        for &bone in bones {
            check_index("bone", bone, self.data.bones.len(), context)?;
            self.out.write_count(bone)?;
        }
        Ok(())
    }

    fn write_constraints(&mut self) -> Result<(), Error> {
        let data = self.data;
        let bone_count = data.bones.len();

        self.out.write_count(data.ik_constraints.len())?;
        for ik in &data.ik_constraints {
            self.out.write_string(Some(&ik.name))?;
            self.out.write_count(ik.order)?;
            self.write_bone_list(&ik.bones, &ik.name)?;
            check_index("target bone", ik.target, bone_count, &ik.name)?;
            self.out.write_count(ik.target)?;
            self.out.write_f32(ik.mix);
            self.out.write_i8(bend_byte(ik.bend_direction, &ik.name)?);
        }

        self.out.write_count(data.transform_constraints.len())?;
        for tc in &data.transform_constraints {
            self.out.write_string(Some(&tc.name))?;
            self.out.write_count(tc.order)?;
            self.write_bone_list(&tc.bones, &tc.name)?;
            check_index("target bone", tc.target, bone_count, &tc.name)?;
            self.out.write_count(tc.target)?;
            for v in [
                tc.offset_rotation,
                tc.offset_x,
                tc.offset_y,
                tc.offset_scale_x,
                tc.offset_scale_y,
                tc.offset_shear_y,
                tc.rotate_mix,
                tc.translate_mix,
                tc.scale_mix,
                tc.shear_mix,
            ] {
                self.out.write_f32(v);
            }
        }

        self.out.write_count(data.path_constraints.len())?;
        for pc in &data.path_constraints {
            self.out.write_string(Some(&pc.name))?;
            self.out.write_count(pc.order)?;
            self.write_bone_list(&pc.bones, &pc.name)?;
            check_index("target slot", pc.target, data.slots.len(), &pc.name)?;
            self.out.write_count(pc.target)?;
            self.out.write_varint(pc.position_mode.to_binary(), true);
            self.out.write_varint(pc.spacing_mode.to_binary(), true);
            self.out.write_varint(pc.rotate_mode.to_binary(), true);
            for v in [
                pc.offset_rotation,
                pc.position,
                pc.spacing,
                pc.rotate_mix,
                pc.translate_mix,
            ] {
                self.out.write_f32(v);
            }
        }
        Ok(())
    }

    fn write_skin_body(&mut self, skin: &SkinData) -> Result<(), Error> {
        let slot_count = self.data.slots.len();
        let used: Vec<usize> = skin
            .attachments
            .iter()
            .enumerate()
            .filter(|(_, map)| !map.is_empty())
            .map(|(slot, _)| slot)
            .collect();
        self.out.write_count(used.len())?;
        for slot in used {
            check_index("slot", slot, slot_count, &skin.name)?;
            let map = &skin.attachments[slot];
            self.out.write_count(slot)?;
            self.out.write_count(map.len())?;
            for (key, attachment) in map {
                self.out.write_string(Some(key))?;
                self.write_attachment(key, attachment)
                    .map_err(|e| e.context(format!("skin '{}' attachment '{key}'", skin.name)))?;
            }
        }
        Ok(())
    }

    fn write_attachment(&mut self, key: &str, attachment: &Attachment) -> Result<(), Error> {
        let name = attachment.name();
        self.out.write_string((name != key).then_some(name))?;
        self.out.write_u8(attachment.kind().to_binary());
        match attachment {
            Attachment::Region(region) => {
                self.out
                    .write_string((region.path != region.name).then_some(region.path.as_str()))?;
                self.out.write_f32(region.rotation);
                self.out.write_f32(region.x);
                self.out.write_f32(region.y);
                self.out.write_f32(region.scale_x);
                self.out.write_f32(region.scale_y);
                self.out.write_f32(region.width);
                self.out.write_f32(region.height);
                self.out.write_color(region.color);
            }
            Attachment::BoundingBox(bbox) => {
                self.out.write_count(bbox.vertex_count)?;
                self.write_vertices(&bbox.vertices, bbox.vertex_count)?;
                if self.options.nonessential {
                    self.out
                        .write_color(bbox.color.unwrap_or(DEFAULT_BOUNDING_BOX_COLOR));
                }
            }
            Attachment::Mesh(mesh) => match &mesh.linked {
                Some(linked) => {
                    self.out
                        .write_string((mesh.path != mesh.name).then_some(mesh.path.as_str()))?;
                    self.out.write_color(mesh.color);
                    self.out.write_string(linked.skin.as_deref())?;
                    self.out.write_string(Some(&linked.parent))?;
                    self.out.write_bool(linked.inherit_deform);
                    if self.options.nonessential {
                        self.out.write_f32(mesh.width);
                        self.out.write_f32(mesh.height);
                    }
                }
                None => self.write_mesh(mesh)?,
            },
            Attachment::Path(path) => {
                self.out.write_bool(path.closed);
                self.out.write_bool(path.constant_speed);
                self.out.write_count(path.vertex_count)?;
                self.write_vertices(&path.vertices, path.vertex_count)?;
                if path.lengths.len() != path.vertex_count / 3 {
                    return Err(invalid(format!(
                        "path '{}' has {} lengths for {} vertices",
                        path.name,
                        path.lengths.len(),
                        path.vertex_count
                    )));
                }
                for &length in &path.lengths {
                    self.out.write_f32(length);
                }
                if self.options.nonessential {
                    self.out.write_color(path.color.unwrap_or(DEFAULT_PATH_COLOR));
                }
            }
        }
        Ok(())
    }

    fn write_mesh(&mut self, mesh: &MeshAttachment) -> Result<(), Error> {
        self.out
            .write_string((mesh.path != mesh.name).then_some(mesh.path.as_str()))?;
        self.out.write_color(mesh.color);
        self.out.write_count(mesh.vertex_count)?;
        if mesh.uvs.len() != mesh.vertex_count * 2 {
            return Err(invalid(format!(
                "mesh '{}' has {} uvs for {} vertices",
                mesh.name,
                mesh.uvs.len(),
                mesh.vertex_count
            )));
        }
        for &uv in &mesh.uvs {
            self.out.write_f32(uv);
        }
        self.write_shorts(&mesh.triangles)?;
        self.write_vertices(&mesh.vertices, mesh.vertex_count)?;
        if mesh.hull_length % 2 != 0 {
            return Err(invalid(format!(
                "mesh '{}' hull length {} is odd",
                mesh.name, mesh.hull_length
            )));
        }
        self.out.write_count(mesh.hull_length / 2)?;
        if self.options.nonessential {
            self.write_shorts(&mesh.edges)?;
            self.out.write_f32(mesh.width);
            self.out.write_f32(mesh.height);
        }
        Ok(())
    }

    fn write_shorts(&mut self, values: &[u16]) -> Result<(), Error> {
        self.out.write_count(values.len())?;
        for &v in values {
            self.out.write_i16(v as i16);
        }
        Ok(())
    }

    fn write_vertices(&mut self, vertices: &Vertices, vertex_count: usize) -> Result<(), Error> {
        if !vertices.is_weighted() {
            self.out.write_bool(false);
            if vertices.values.len() != vertex_count * 2 {
                return Err(invalid(format!(
                    "{} vertex values for {vertex_count} vertices",
                    vertices.values.len()
                )));
            }
            for &v in &vertices.values {
                self.out.write_f32(v);
            }
            return Ok(());
        }

        self.out.write_bool(true);
        let bone_count = self.data.bones.len();
        let mut bones = vertices.bones.iter().copied();
        let mut values = vertices.values.chunks_exact(3);
        for vertex in 0..vertex_count {
            let influences = bones
                .next()
                .ok_or_else(|| invalid(format!("weighted vertex {vertex} missing")))?
                as usize;
            self.out.write_count(influences)?;
            for _ in 0..influences {
                let (Some(bone), Some(xyw)) = (bones.next(), values.next()) else {
                    return Err(invalid(format!("weighted vertex {vertex} is truncated")));
                };
                check_index("bone", bone as usize, bone_count, "weighted vertices")?;
                self.out.write_count(bone as usize)?;
                for &v in xyw {
                    self.out.write_f32(v);
                }
            }
        }
        if bones.next().is_some() || values.next().is_some() || !values.remainder().is_empty() {
            return Err(invalid(format!(
                "weighted vertices hold more data than {vertex_count} vertices"
            )));
        }
        Ok(())
    }

    fn write_curve(&mut self, curve: Curve) {
        match curve {
            Curve::Linear => self.out.write_u8(CURVE_LINEAR),
            Curve::Stepped => self.out.write_u8(CURVE_STEPPED),
            Curve::Bezier { cx1, cy1, cx2, cy2 } => {
                self.out.write_u8(CURVE_BEZIER);
                self.out.write_f32(cx1);
                self.out.write_f32(cy1);
                self.out.write_f32(cx2);
                self.out.write_f32(cy2);
            }
        }
    }

    /// Writes the frame count, then each frame followed by its curve when it is not the last.
    fn write_frames<F>(
        &mut self,
        frames: &[F],
        mut write: impl FnMut(&mut ByteWriter, &F),
        curve: impl Fn(&F) -> Curve,
    ) -> Result<(), Error> {
        self.out.write_count(frames.len())?;
        for (i, frame) in frames.iter().enumerate() {
            write(&mut self.out, frame);
            if i + 1 < frames.len() {
                self.write_curve(curve(frame));
            }
        }
        Ok(())
    }

    fn write_animation(&mut self, animation: &Animation) -> Result<(), Error> {
        let data = self.data;
        let trim = self.options.trim;
        let mut slots: Vec<(usize, Vec<&Timeline>)> = Vec::new();
        let mut bones: Vec<(usize, Vec<&Timeline>)> = Vec::new();
        let mut ik = Vec::new();
        let mut transform = Vec::new();
        let mut paths: Vec<(usize, Vec<&Timeline>)> = Vec::new();
        let mut deforms: Vec<(usize, Vec<(usize, Vec<&Timeline>)>)> = Vec::new();
        let mut draw_order: Option<&[DrawOrderFrame]> = None;
        let mut events: Option<&[EventFrame]> = None;

        for timeline in &animation.timelines {
            if trim && timeline.frame_count() == 0 {
                continue;
            }
            match timeline {
                Timeline::SlotAttachment { slot, .. } | Timeline::SlotColor { slot, .. } => {
                    check_index("slot", *slot, data.slots.len(), "slot timeline")?;
                    group(&mut slots, *slot, timeline);
                }
                Timeline::BoneRotate { bone, .. }
                | Timeline::BoneTranslate { bone, .. }
                | Timeline::BoneScale { bone, .. }
                | Timeline::BoneShear { bone, .. } => {
                    check_index("bone", *bone, data.bones.len(), "bone timeline")?;
                    group(&mut bones, *bone, timeline);
                }
                Timeline::IkConstraint { constraint, frames } => {
                    check_index(
                        "ik constraint",
                        *constraint,
                        data.ik_constraints.len(),
                        "ik timeline",
                    )?;
                    ik.push((*constraint, frames));
                }
                Timeline::TransformConstraint { constraint, frames } => {
                    check_index(
                        "transform constraint",
                        *constraint,
                        data.transform_constraints.len(),
                        "transform timeline",
                    )?;
                    transform.push((*constraint, frames));
                }
                Timeline::PathPosition { constraint, .. }
                | Timeline::PathSpacing { constraint, .. }
                | Timeline::PathMix { constraint, .. } => {
                    check_index(
                        "path constraint",
                        *constraint,
                        data.path_constraints.len(),
                        "path timeline",
                    )?;
                    group(&mut paths, *constraint, timeline);
                }
                Timeline::Deform { skin, slot, .. } => {
                    let written = self
                        .skin_remap
                        .get(*skin)
                        .copied()
                        .flatten()
                        .ok_or_else(|| {
                            invalid(format!("deform timeline skin {skin} is not written"))
                        })?;
                    if let Some((_, per_slot)) = deforms.iter_mut().find(|(s, _)| *s == written) {
                        group(per_slot, *slot, timeline);
                    } else {
                        deforms.push((written, vec![(*slot, vec![timeline])]));
                    }
                }
                Timeline::DrawOrder { frames } => {
                    if draw_order.replace(frames).is_some() {
                        return Err(invalid("more than one draw order timeline"));
                    }
                }
                Timeline::Event { frames } => {
                    if events.replace(frames).is_some() {
                        return Err(invalid("more than one event timeline"));
                    }
                }
            }
        }

        self.out.write_count(slots.len())?;
        for (slot, timelines) in slots {
            self.out.write_count(slot)?;
            self.out.write_count(timelines.len())?;
            for timeline in timelines {
                match timeline {
                    Timeline::SlotAttachment { frames, .. } => {
                        self.out.write_u8(SLOT_ATTACHMENT);
                        self.out.write_count(frames.len())?;
                        for frame in frames {
                            self.out.write_f32(frame.time);
                            self.out.write_string(frame.name.as_deref())?;
                        }
                    }
                    Timeline::SlotColor { frames, .. } => {
                        self.out.write_u8(SLOT_COLOR);
                        self.write_frames(
                            frames,
                            |out, f| {
                                out.write_f32(f.time);
                                out.write_color(f.color);
                            },
                            |f| f.curve,
                        )?;
                    }
                    _ => {}
                }
            }
        }

        self.out.write_count(bones.len())?;
        for (bone, timelines) in bones {
            self.out.write_count(bone)?;
            self.out.write_count(timelines.len())?;
            for timeline in timelines {
                let (tag, frames) = match timeline {
                    Timeline::BoneRotate { frames, .. } => {
                        self.out.write_u8(BONE_ROTATE);
                        self.write_frames(
                            frames,
                            |out, f| {
                                out.write_f32(f.time);
                                out.write_f32(f.angle);
                            },
                            |f| f.curve,
                        )?;
                        continue;
                    }
                    Timeline::BoneTranslate { frames, .. } => (BONE_TRANSLATE, frames),
                    Timeline::BoneScale { frames, .. } => (BONE_SCALE, frames),
                    Timeline::BoneShear { frames, .. } => (BONE_SHEAR, frames),
                    _ => continue,
                };
                self.out.write_u8(tag);
                self.write_frames(
                    frames,
                    |out, f| {
                        out.write_f32(f.time);
                        out.write_f32(f.x);
                        out.write_f32(f.y);
                    },
                    |f| f.curve,
                )?;
            }
        }

        self.out.write_count(ik.len())?;
        for (constraint, frames) in ik {
            self.out.write_count(constraint)?;
            for frame in frames {
                bend_byte(frame.bend_direction, "ik timeline")?;
            }
            self.write_frames(
                frames,
                |out, f| {
                    out.write_f32(f.time);
                    out.write_f32(f.mix);
                    out.write_i8(f.bend_direction as i8);
                },
                |f| f.curve,
            )?;
        }

        self.out.write_count(transform.len())?;
        for (constraint, frames) in transform {
            self.out.write_count(constraint)?;
            self.write_frames(
                frames,
                |out, f| {
                    out.write_f32(f.time);
                    out.write_f32(f.rotate_mix);
                    out.write_f32(f.translate_mix);
                    out.write_f32(f.scale_mix);
                    out.write_f32(f.shear_mix);
                },
                |f| f.curve,
            )?;
        }

        self.out.write_count(paths.len())?;
        for (constraint, timelines) in paths {
            self.out.write_count(constraint)?;
            self.out.write_count(timelines.len())?;
            for timeline in timelines {
                match timeline {
                    Timeline::PathPosition { frames, .. } | Timeline::PathSpacing { frames, .. } => {
                        let tag = if matches!(timeline, Timeline::PathPosition { .. }) {
                            PATH_POSITION
                        } else {
                            PATH_SPACING
                        };
                        self.out.write_u8(tag);
                        self.write_frames(
                            frames,
                            |out, f| {
                                out.write_f32(f.time);
                                out.write_f32(f.value);
                            },
                            |f| f.curve,
                        )?;
                    }
                    Timeline::PathMix { frames, .. } => {
                        self.out.write_u8(PATH_MIX);
                        self.write_frames(
                            frames,
                            |out, f| {
                                out.write_f32(f.time);
                                out.write_f32(f.rotate_mix);
                                out.write_f32(f.translate_mix);
                            },
                            |f| f.curve,
                        )?;
                    }
                    _ => {}
                }
            }
        }

        self.out.write_count(deforms.len())?;
        for (skin, per_slot) in deforms {
            self.out.write_count(skin)?;
            self.out.write_count(per_slot.len())?;
            for (slot, timelines) in per_slot {
                self.out.write_count(slot)?;
                self.out.write_count(timelines.len())?;
                for timeline in timelines {
                    self.write_deform(timeline)?;
                }
            }
        }

        let draw_order = draw_order.unwrap_or_default();
        self.out.write_count(draw_order.len())?;
        for frame in draw_order {
            self.out.write_f32(frame.time);
            let offsets = draw_order_offsets(&frame.draw_order, data.slots.len())?;
            self.out.write_count(offsets.len())?;
            for (slot, displacement) in offsets {
                self.out.write_count(slot)?;
                self.out.write_varint(displacement, true);
            }
        }

        let events = events.unwrap_or_default();
        self.out.write_count(events.len())?;
        for frame in events {
            check_index("event", frame.event, data.events.len(), "event timeline")?;
            let default = &data.events[frame.event].string_value;
            self.out.write_f32(frame.time);
            self.out.write_count(frame.event)?;
            self.out.write_varint(frame.int_value, false);
            self.out.write_f32(frame.float_value);
            let has_string = frame.string_value != *default;
            self.out.write_bool(has_string);
            if has_string {
                self.out.write_string(frame.string_value.as_deref())?;
            }
        }
        Ok(())
    }

    fn write_deform(&mut self, timeline: &Timeline) -> Result<(), Error> {
        let Timeline::Deform {
            skin,
            slot,
            attachment,
            frames,
        } = timeline
        else {
            return Ok(());
        };
        let context = format!("deform '{attachment}' (skin {skin}, slot {slot})");
        let vertices = self
            .data
            .skin_at(*skin)
            .and_then(|s| s.attachment(*slot, attachment))
            .and_then(Attachment::vertices)
            .ok_or_else(|| invalid(format!("{context}: no vertex attachment to deform")))?;
        let deform_length = vertices.deform_length();
        for frame in frames {
            if !frame.deltas.is_empty() && frame.offset + frame.deltas.len() > deform_length {
                return Err(invalid(format!(
                    "{context}: range {}+{} exceeds vertex length {deform_length}",
                    frame.offset,
                    frame.deltas.len()
                )));
            }
        }

        self.out.write_string(Some(attachment))?;
        self.out.write_count(frames.len())?;
        for (i, frame) in frames.iter().enumerate() {
            self.out.write_f32(frame.time);
            self.out.write_count(frame.deltas.len())?;
            if !frame.deltas.is_empty() {
                self.out.write_count(frame.offset)?;
                for &delta in &frame.deltas {
                    self.out.write_f32(delta);
                }
            }
            if i + 1 < frames.len() {
                self.write_curve(frame.curve);
            }
        }
        Ok(())
    }
}

fn bend_byte(bend_direction: i32, context: &str) -> Result<i8, Error> {
    i8::try_from(bend_direction)
        .map_err(|_| invalid(format!("{context}: bend direction {bend_direction} out of range")))
}

/// `(slot, displacement)` for every slot not drawn at its setup position, in slot order.
pub(crate) fn draw_order_offsets(
    draw_order: &[usize],
    slot_count: usize,
) -> Result<Vec<(usize, i32)>, Error> {
    if draw_order.len() != slot_count {
        return Err(invalid(format!(
            "draw order has {} entries for {slot_count} slots",
            draw_order.len()
        )));
    }
    let mut position_of = vec![usize::MAX; slot_count];
    for (position, &slot) in draw_order.iter().enumerate() {
        if slot >= slot_count || position_of[slot] != usize::MAX {
            return Err(invalid(format!(
                "draw order {draw_order:?} is not a permutation of {slot_count} slots"
            )));
        }
        position_of[slot] = position;
    }
    let mut offsets = Vec::new();
    for (slot, &position) in position_of.iter().enumerate() {
        if position != slot {
            let displacement = i32::try_from(position as i64 - slot as i64)
                .map_err(|_| invalid("draw order displacement overflows"))?;
            offsets.push((slot, displacement));
        }
    }
    Ok(offsets)
}
