use crate::test_bytes::*;
use crate::{
    Attachment, AttachmentKind, AttachmentLoader, BlankAttachmentLoader, Curve, Error,
    SkeletonData, SkeletonDecoder, Timeline,
};

fn decode(bytes: &[u8]) -> Result<SkeletonData, Error> {
    SkeletonData::from_skel_bytes(bytes)
}

/// Skins, events and animations after a rig with no skins.
fn push_empty_tail(out: &mut Vec<u8>) {
    push_varint(out, 0); // default skin slots
    push_varint(out, 0); // named skins
    push_varint(out, 0); // events
    push_varint(out, 0); // animations
}

/// One-animation tail: no skins, no events; `body` writes the animation after its name.
fn push_animation_tail(out: &mut Vec<u8>, body: impl FnOnce(&mut Vec<u8>)) {
    push_varint(out, 0);
    push_varint(out, 0);
    push_varint(out, 0);
    push_varint(out, 1);
    push_string(out, Some("anim"));
    body(out);
}

fn mesh_vertices(attachment: &Attachment) -> &[f32] {
    match attachment {
        Attachment::Mesh(mesh) => &mesh.vertices.values,
        other => panic!("expected mesh, got {other:?}"),
    }
}

#[test]
fn minimal_rig_decodes() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 2);
    push_empty_tail(&mut bytes);

    let data = decode(&bytes).expect("decode");
    assert_eq!(data.hash.as_deref(), Some("hash"));
    assert_eq!(data.version.as_deref(), Some("3.5.51"));
    assert_eq!((data.width, data.height), (100.0, 200.0));
    assert!(!data.nonessential);
    assert_eq!(data.images_path, None);
    assert_eq!(data.bones.len(), 1);
    assert_eq!(data.bones[0].parent, None);
    assert_eq!(data.bones[0].scale_x, 2.0);
    assert_eq!(data.slots.len(), 2);
    assert_eq!(data.slots[1].name, "s1");
    assert_eq!(data.slots[1].index, 1);
    assert!(data.default_skin.is_none());
    assert!(data.skins.is_empty());
    assert!(data.animations.is_empty());
}

#[test]
fn scale_applies_to_positions_only() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 0);
    push_empty_tail(&mut bytes);

    let data = SkeletonData::from_skel_bytes_with_scale(&bytes, 0.5).expect("decode");
    let root = &data.bones[0];
    assert_eq!(root.x, 5.0);
    assert_eq!(root.y, 10.0);
    assert_eq!(root.length, 2.5);
    assert_eq!(root.scale_x, 2.0);
    assert_eq!((data.width, data.height), (100.0, 200.0));

    let data = SkeletonDecoder::new()
        .scale(f32::NAN)
        .decode(&bytes)
        .expect("decode");
    assert_eq!(data.bones[0].x, 10.0);
}

#[test]
fn nonessential_fields_are_read_when_flagged() {
    let mut bytes = Vec::new();
    push_string(&mut bytes, None);
    push_string(&mut bytes, Some(""));
    push_f32_be(&mut bytes, 0.0);
    push_f32_be(&mut bytes, 0.0);
    push_bool(&mut bytes, true);
    push_string(&mut bytes, Some("./images/"));
    push_varint(&mut bytes, 1);
    push_bone(&mut bytes, "root", None);
    bytes.extend_from_slice(&[0xff, 0x00, 0x00, 0xff]);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    push_empty_tail(&mut bytes);

    let data = decode(&bytes).expect("decode");
    assert_eq!(data.hash, None);
    assert_eq!(data.version.as_deref(), Some(""));
    assert!(data.nonessential);
    assert_eq!(data.images_path.as_deref(), Some("./images/"));
    assert_eq!(data.bones[0].color, Some([1.0, 0.0, 0.0, 1.0]));
}

#[test]
fn bone_parent_must_precede_the_bone() {
    let mut bytes = Vec::new();
    push_header(&mut bytes);
    push_varint(&mut bytes, 2);
    push_bone(&mut bytes, "root", None);
    push_bone(&mut bytes, "arm", Some(1));

    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(
            err.root(),
            Error::IndexOutOfRange {
                kind: "parent bone",
                index: 1,
                len: 1,
                ..
            }
        ),
        "{err:?}"
    );
}

#[test]
fn slot_attachment_distinguishes_null_and_empty() {
    let mut bytes = Vec::new();
    push_header(&mut bytes);
    push_varint(&mut bytes, 1);
    push_bone(&mut bytes, "root", None);
    push_varint(&mut bytes, 3);
    push_slot(&mut bytes, "a", 0, None);
    push_slot(&mut bytes, "b", 0, Some(""));
    push_slot(&mut bytes, "c", 0, Some("head"));
    for _ in 0..3 {
        push_varint(&mut bytes, 0);
    }
    push_empty_tail(&mut bytes);

    let data = decode(&bytes).expect("decode");
    assert_eq!(data.slots[0].attachment, None);
    assert_eq!(data.slots[1].attachment.as_deref(), Some(""));
    assert_eq!(data.slots[2].attachment.as_deref(), Some("head"));
}

#[test]
fn slot_bone_out_of_range_is_rejected() {
    let mut bytes = Vec::new();
    push_header(&mut bytes);
    push_varint(&mut bytes, 1);
    push_bone(&mut bytes, "root", None);
    push_varint(&mut bytes, 1);
    push_slot(&mut bytes, "a", 4, None);

    let err = decode(&bytes).unwrap_err();
    assert!(matches!(
        err.root(),
        Error::IndexOutOfRange { kind: "bone", index: 4, .. }
    ));
    assert!(err.to_string().contains("slots"), "{err}");
}

#[test]
fn restricted_strings_decode_in_names() {
    let mut bytes = Vec::new();
    push_header(&mut bytes);
    push_varint(&mut bytes, 1);
    push_bone(&mut bytes, "größe", None);
    push_varint(&mut bytes, 0);
    for _ in 0..3 {
        push_varint(&mut bytes, 0);
    }
    push_empty_tail(&mut bytes);

    let data = decode(&bytes).expect("decode");
    assert_eq!(data.bones[0].name, "größe");
}

#[test]
fn unknown_attachment_type_is_invalid_tag() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 1);
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("key"));
    push_string(&mut bytes, None);
    bytes.push(9);
    bytes.extend_from_slice(&[0; 16]);

    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(
            err.root(),
            Error::InvalidTag {
                kind: "attachment",
                value: 9,
                ..
            }
        ),
        "{err:?}"
    );
}

#[test]
fn attachment_name_and_path_default_to_key() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 1);
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 2);
    push_string(&mut bytes, Some("torso"));
    push_string(&mut bytes, None);
    bytes.push(0);
    push_string(&mut bytes, None);
    for v in [45.0, 1.0, 2.0, 1.0, 1.0, 64.0, 32.0] {
        push_f32_be(&mut bytes, v);
    }
    push_white(&mut bytes);
    push_string(&mut bytes, Some("torso-alt"));
    push_string(&mut bytes, Some("torso2"));
    bytes.push(0);
    push_string(&mut bytes, Some("atlas/torso2"));
    for v in [0.0, 0.0, 0.0, 1.0, 1.0, 8.0, 8.0] {
        push_f32_be(&mut bytes, v);
    }
    push_white(&mut bytes);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);

    let data = SkeletonData::from_skel_bytes_with_scale(&bytes, 2.0).expect("decode");
    let skin = data.default_skin.as_ref().expect("default skin");
    assert_eq!(skin.name, "default");
    let Some(Attachment::Region(torso)) = skin.attachment(0, "torso") else {
        panic!("torso region missing");
    };
    assert_eq!(torso.name, "torso");
    assert_eq!(torso.path, "torso");
    assert_eq!(torso.rotation, 45.0);
    assert_eq!((torso.x, torso.y), (2.0, 4.0));
    assert_eq!((torso.width, torso.height), (128.0, 64.0));
    let Some(Attachment::Region(alt)) = skin.attachment(0, "torso-alt") else {
        panic!("torso-alt region missing");
    };
    assert_eq!(alt.name, "torso2");
    assert_eq!(alt.path, "atlas/torso2");
}

#[test]
fn weighted_vertices_keep_bone_and_weight_layout() {
    let mut bytes = Vec::new();
    push_header(&mut bytes);
    push_varint(&mut bytes, 2);
    push_bone(&mut bytes, "root", None);
    push_bone(&mut bytes, "arm", Some(0));
    push_varint(&mut bytes, 1);
    push_slot(&mut bytes, "s0", 0, None);
    for _ in 0..3 {
        push_varint(&mut bytes, 0);
    }
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("box"));
    push_string(&mut bytes, None);
    bytes.push(1);
    push_varint(&mut bytes, 2);
    push_bool(&mut bytes, true);
    // vertex 0: one influence
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 1);
    for v in [1.0, 2.0, 1.0] {
        push_f32_be(&mut bytes, v);
    }
    // vertex 1: two influences
    push_varint(&mut bytes, 2);
    push_varint(&mut bytes, 0);
    for v in [3.0, 4.0, 0.25] {
        push_f32_be(&mut bytes, v);
    }
    push_varint(&mut bytes, 1);
    for v in [5.0, 6.0, 0.75] {
        push_f32_be(&mut bytes, v);
    }
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);

    let data = SkeletonData::from_skel_bytes_with_scale(&bytes, 10.0).expect("decode");
    let skin = data.default_skin.as_ref().expect("default skin");
    let Some(Attachment::BoundingBox(bbox)) = skin.attachment(0, "box") else {
        panic!("bounding box missing");
    };
    assert_eq!(bbox.vertex_count, 2);
    assert!(bbox.vertices.is_weighted());
    assert_eq!(bbox.vertices.bones, vec![1, 1, 2, 0, 1]);
    assert_eq!(
        bbox.vertices.values,
        vec![10.0, 20.0, 1.0, 30.0, 40.0, 0.25, 50.0, 60.0, 0.75]
    );
    assert_eq!(bbox.vertices.deform_length(), 6);
    assert_eq!(bbox.color, None);
}

#[test]
fn weighted_vertex_bone_out_of_range_is_rejected() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 1);
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("box"));
    push_string(&mut bytes, None);
    bytes.push(1);
    push_varint(&mut bytes, 1);
    push_bool(&mut bytes, true);
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 7);
    for v in [1.0, 2.0, 1.0] {
        push_f32_be(&mut bytes, v);
    }

    let err = decode(&bytes).unwrap_err();
    assert!(matches!(
        err.root(),
        Error::IndexOutOfRange { kind: "bone", index: 7, .. }
    ));
}

#[test]
fn draw_order_frame_rebuilds_the_full_permutation() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 5);
    push_animation_tail(&mut bytes, |out| {
        push_no_pose_timelines(out);
        push_varint(out, 2);
        push_f32_be(out, 0.5);
        push_varint(out, 1);
        push_varint(out, 2);
        push_varint(out, 2);
        push_f32_be(out, 1.0);
        push_varint(out, 0);
        push_varint(out, 0); // events
    });

    let data = decode(&bytes).expect("decode");
    let animation = &data.animations[0];
    assert_eq!(animation.duration, 1.0);
    let [Timeline::DrawOrder { frames }] = animation.timelines.as_slice() else {
        panic!("expected one draw order timeline: {:?}", animation.timelines);
    };
    assert_eq!(frames[0].time, 0.5);
    assert_eq!(frames[0].draw_order, vec![0, 1, 3, 4, 2]);
    assert_eq!(frames[1].draw_order, vec![0, 1, 2, 3, 4]);
}

#[test]
fn negative_draw_order_displacement_uses_unsigned_varint() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 3);
    push_animation_tail(&mut bytes, |out| {
        push_no_pose_timelines(out);
        push_varint(out, 1);
        push_f32_be(out, 0.0);
        push_varint(out, 1);
        push_varint(out, 2);
        push_varint(out, (-2i32) as u32);
        push_varint(out, 0);
    });

    let data = decode(&bytes).expect("decode");
    let [Timeline::DrawOrder { frames }] = data.animations[0].timelines.as_slice() else {
        panic!("expected a draw order timeline");
    };
    assert_eq!(frames[0].draw_order, vec![2, 0, 1]);
}

#[test]
fn deform_deltas_are_added_to_unweighted_base() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 1);
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("m"));
    push_mesh(&mut bytes, &[1.0, 2.0, 3.0, 4.0]);
    push_varint(&mut bytes, 0); // named skins
    push_varint(&mut bytes, 0); // events
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("wobble"));
    for _ in 0..5 {
        push_varint(&mut bytes, 0);
    }
    push_varint(&mut bytes, 1); // skins
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1); // slots
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1); // attachments
    push_string(&mut bytes, Some("m"));
    push_varint(&mut bytes, 2);
    push_f32_be(&mut bytes, 0.0);
    push_varint(&mut bytes, 2); // end
    push_varint(&mut bytes, 1); // start
    push_f32_be(&mut bytes, 0.5);
    push_f32_be(&mut bytes, 0.5);
    bytes.push(1); // stepped
    push_f32_be(&mut bytes, 2.0);
    push_varint(&mut bytes, 0); // unchanged
    push_varint(&mut bytes, 0); // draw order
    push_varint(&mut bytes, 0); // events

    let data = decode(&bytes).expect("decode");
    let skin = data.default_skin.as_ref().expect("default skin");
    let mesh = skin.attachment(0, "m").expect("mesh");
    assert_eq!(mesh_vertices(mesh), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(mesh.kind(), AttachmentKind::Mesh);

    let animation = &data.animations[0];
    assert_eq!(animation.duration, 2.0);
    let [
        Timeline::Deform {
            skin,
            slot,
            attachment,
            frames,
        },
    ] = animation.timelines.as_slice()
    else {
        panic!("expected one deform timeline");
    };
    assert_eq!((*skin, *slot, attachment.as_str()), (0, 0, "m"));
    assert_eq!(frames[0].offset, 1);
    assert_eq!(frames[0].deltas, vec![0.5, 0.5]);
    assert_eq!(frames[0].vertices, vec![1.0, 2.5, 3.5, 4.0]);
    assert_eq!(frames[0].curve, Curve::Stepped);
    assert_eq!(frames[1].vertices, vec![1.0, 2.0, 3.0, 4.0]);
    assert!(frames[1].deltas.is_empty());
    assert_eq!(frames[1].curve, Curve::Linear);
}

#[test]
fn deform_range_past_the_vertex_array_is_rejected() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 1);
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("m"));
    push_mesh(&mut bytes, &[1.0, 2.0, 3.0, 4.0]);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("bad"));
    for _ in 0..5 {
        push_varint(&mut bytes, 0);
    }
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("m"));
    push_varint(&mut bytes, 1);
    push_f32_be(&mut bytes, 0.0);
    push_varint(&mut bytes, 3);
    push_varint(&mut bytes, 2);
    for _ in 0..3 {
        push_f32_be(&mut bytes, 1.0);
    }

    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err.root(), Error::InvalidValue { .. }), "{err:?}");
}

#[test]
fn invalid_curve_type_is_rejected() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 0);
    push_animation_tail(&mut bytes, |out| {
        push_varint(out, 0); // slots
        push_varint(out, 1); // bones
        push_varint(out, 0);
        push_varint(out, 1);
        out.push(0); // rotate
        push_varint(out, 2);
        push_f32_be(out, 0.0);
        push_f32_be(out, 10.0);
        out.push(7);
        push_f32_be(out, 1.0);
        push_f32_be(out, 20.0);
    });

    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(
            err.root(),
            Error::InvalidTag {
                kind: "curve",
                value: 7,
                ..
            }
        ),
        "{err:?}"
    );
}

#[test]
fn bone_timelines_read_curves_between_frames() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 0);
    push_animation_tail(&mut bytes, |out| {
        push_varint(out, 0);
        push_varint(out, 1);
        push_varint(out, 0);
        push_varint(out, 2);
        out.push(0); // rotate
        push_varint(out, 2);
        push_f32_be(out, 0.0);
        push_f32_be(out, 10.0);
        out.push(2);
        for v in [0.25, 0.0, 0.75, 1.0] {
            push_f32_be(out, v);
        }
        push_f32_be(out, 1.0);
        push_f32_be(out, 20.0);
        out.push(1); // translate
        push_varint(out, 1);
        push_f32_be(out, 0.5);
        push_f32_be(out, 3.0);
        push_f32_be(out, 4.0);
        for _ in 0..6 {
            push_varint(out, 0);
        }
    });

    let data = SkeletonData::from_skel_bytes_with_scale(&bytes, 2.0).expect("decode");
    let animation = &data.animations[0];
    assert_eq!(animation.duration, 1.0);
    let Timeline::BoneRotate { bone: 0, frames } = &animation.timelines[0] else {
        panic!("expected rotate timeline");
    };
    assert_eq!(
        frames[0].curve,
        Curve::Bezier {
            cx1: 0.25,
            cy1: 0.0,
            cx2: 0.75,
            cy2: 1.0
        }
    );
    assert_eq!(frames[1].angle, 20.0);
    let Timeline::BoneTranslate { bone: 0, frames } = &animation.timelines[1] else {
        panic!("expected translate timeline");
    };
    assert_eq!((frames[0].x, frames[0].y), (6.0, 8.0));
}

#[test]
fn event_frames_fall_back_to_event_data_string() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("footstep"));
    push_zigzag(&mut bytes, -3);
    push_f32_be(&mut bytes, 0.5);
    push_string(&mut bytes, Some("DEFAULT"));
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("walk"));
    for _ in 0..7 {
        push_varint(&mut bytes, 0);
    }
    push_varint(&mut bytes, 2);
    push_f32_be(&mut bytes, 0.1);
    push_varint(&mut bytes, 0);
    push_zigzag(&mut bytes, 0);
    push_f32_be(&mut bytes, 0.0);
    push_bool(&mut bytes, false);
    push_f32_be(&mut bytes, 0.2);
    push_varint(&mut bytes, 0);
    push_zigzag(&mut bytes, -7);
    push_f32_be(&mut bytes, 1.5);
    push_bool(&mut bytes, true);
    push_string(&mut bytes, Some("OVERRIDE"));

    let data = decode(&bytes).expect("decode");
    assert_eq!(data.events[0].int_value, -3);
    assert_eq!(data.find_event("footstep").map(|(i, _)| i), Some(0));
    let [Timeline::Event { frames }] = data.animations[0].timelines.as_slice() else {
        panic!("expected event timeline");
    };
    assert_eq!(frames[0].string_value.as_deref(), Some("DEFAULT"));
    assert_eq!(frames[1].string_value.as_deref(), Some("OVERRIDE"));
    assert_eq!(frames[1].int_value, -7);
    assert_eq!(data.animations[0].duration, 0.2);
}

#[test]
fn truncated_input_reports_eof() {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 2);
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 1);
    push_varint(&mut bytes, 1);
    push_string(&mut bytes, Some("m"));
    push_mesh(&mut bytes, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    decode(&bytes).expect("full input decodes");

    for len in 0..bytes.len() {
        let err = decode(&bytes[..len]).unwrap_err();
        assert!(
            matches!(err.root(), Error::UnexpectedEof { .. }),
            "prefix {len}: {err:?}"
        );
    }
}

/// Section sizes for a document built only from the smallest records each section allows.
#[derive(Clone, Copy, Default)]
struct MinimalCounts {
    bones: u32,
    slots: u32,
    ik: u32,
    transform: u32,
    path: u32,
    skins: u32,
    events: u32,
}

/// Null strings, zero indices and no non-essential data throughout.
fn push_minimal_document(out: &mut Vec<u8>, counts: MinimalCounts) {
    push_string(out, None);
    push_string(out, None);
    push_f32_be(out, 0.0);
    push_f32_be(out, 0.0);
    push_bool(out, false);

    push_varint(out, counts.bones);
    for i in 0..counts.bones {
        push_string(out, None);
        if i > 0 {
            push_varint(out, i - 1);
        }
        for _ in 0..8 {
            push_f32_be(out, 0.0);
        }
        push_bool(out, false);
        push_bool(out, false);
    }
    push_varint(out, counts.slots);
    for _ in 0..counts.slots {
        push_string(out, None);
        push_varint(out, 0);
        push_white(out);
        push_string(out, None);
        push_varint(out, 0);
    }
    push_varint(out, counts.ik);
    for _ in 0..counts.ik {
        push_string(out, None);
        push_varint(out, 0); // order
        push_varint(out, 0); // bones
        push_varint(out, 0); // target
        push_f32_be(out, 1.0);
        out.push(1);
    }
    push_varint(out, counts.transform);
    for _ in 0..counts.transform {
        push_string(out, None);
        push_varint(out, 0);
        push_varint(out, 0);
        push_varint(out, 0);
        for _ in 0..10 {
            push_f32_be(out, 0.0);
        }
    }
    push_varint(out, counts.path);
    for _ in 0..counts.path {
        push_string(out, None);
        push_varint(out, 0);
        push_varint(out, 0);
        push_varint(out, 0); // target slot
        push_varint(out, 0); // position mode
        push_varint(out, 0); // spacing mode
        push_varint(out, 0); // rotate mode
        for _ in 0..5 {
            push_f32_be(out, 0.0);
        }
    }
    push_varint(out, 0); // default skin slots
    push_varint(out, counts.skins);
    for _ in 0..counts.skins {
        push_string(out, None);
        push_varint(out, 0);
    }
    push_varint(out, counts.events);
    for _ in 0..counts.events {
        push_string(out, None);
        push_zigzag(out, 0);
        push_f32_be(out, 0.0);
        push_string(out, None);
    }
    push_varint(out, 0); // animations
}

#[test]
fn sections_of_smallest_records_decode() {
    let one = MinimalCounts {
        bones: 1,
        ..MinimalCounts::default()
    };
    let cases = [
        MinimalCounts { bones: 10, ..one },
        MinimalCounts { slots: 12, ..one },
        MinimalCounts { ik: 12, ..one },
        MinimalCounts { transform: 12, ..one },
        MinimalCounts {
            slots: 1,
            path: 12,
            ..one
        },
        MinimalCounts { skins: 12, ..one },
        MinimalCounts { events: 12, ..one },
    ];
    for counts in cases {
        let mut bytes = Vec::new();
        push_minimal_document(&mut bytes, counts);
        let data = decode(&bytes).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(data.bones.len(), counts.bones as usize);
        assert_eq!(data.slots.len(), counts.slots as usize);
        assert_eq!(data.ik_constraints.len(), counts.ik as usize);
        assert_eq!(data.transform_constraints.len(), counts.transform as usize);
        assert_eq!(data.path_constraints.len(), counts.path as usize);
        assert_eq!(data.skins.len(), counts.skins as usize);
        assert_eq!(data.events.len(), counts.events as usize);
    }

    let mut bytes = Vec::new();
    push_minimal_document(&mut bytes, MinimalCounts { bones: 10, ..one });
    let data = decode(&bytes).expect("decode");
    assert!(data.bones.iter().all(|b| b.name.is_empty()));
    assert_eq!(data.bones[9].parent, Some(8));
}

fn linked_mesh_fixture(
    push_default: impl FnOnce(&mut Vec<u8>),
    push_named: impl FnOnce(&mut Vec<u8>),
) -> Vec<u8> {
    let mut bytes = Vec::new();
    push_rig(&mut bytes, 1);
    push_default(&mut bytes);
    push_named(&mut bytes);
    push_varint(&mut bytes, 0);
    push_varint(&mut bytes, 0);
    bytes
}

#[test]
fn linked_mesh_resolves_parent_later_in_the_same_skin() {
    let bytes = linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 2);
            push_string(out, Some("child"));
            push_linked_mesh(out, None, "parent");
            push_string(out, Some("parent"));
            push_mesh(out, &[1.0, 2.0, 3.0, 4.0]);
        },
        |out| push_varint(out, 0),
    );

    let data = decode(&bytes).expect("decode");
    let skin = data.default_skin.as_ref().expect("default skin");
    let Some(Attachment::Mesh(child)) = skin.attachment(0, "child") else {
        panic!("child mesh missing");
    };
    assert_eq!(child.vertices.values, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(child.uvs.len(), 4);
    assert_eq!(child.triangles, vec![0, 1, 2]);
    assert_eq!(child.hull_length, 4);
    let linked = child.linked.as_ref().expect("linked");
    assert_eq!(linked.parent, "parent");
    assert_eq!(linked.skin, None);
    assert!(linked.inherit_deform);
}

#[test]
fn linked_mesh_in_named_skin_resolves_against_default_skin() {
    let bytes = linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 1);
            push_string(out, Some("A"));
            push_mesh(out, &[5.0, 6.0]);
        },
        |out| {
            push_varint(out, 1);
            push_string(out, Some("B"));
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 1);
            push_string(out, Some("child"));
            push_linked_mesh(out, None, "A");
        },
    );

    let data = decode(&bytes).expect("decode");
    let child = data.skin("B").and_then(|s| s.attachment(0, "child")).expect("child");
    assert_eq!(mesh_vertices(child), &[5.0, 6.0]);
    assert_eq!(child.kind(), AttachmentKind::LinkedMesh);
}

#[test]
fn linked_mesh_in_default_skin_resolves_against_later_named_skin() {
    let bytes = linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 1);
            push_string(out, Some("child"));
            push_linked_mesh(out, Some("B"), "A");
        },
        |out| {
            push_varint(out, 1);
            push_string(out, Some("B"));
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 1);
            push_string(out, Some("A"));
            push_mesh(out, &[7.0, 8.0]);
        },
    );

    let data = decode(&bytes).expect("decode");
    let child = data
        .default_skin
        .as_ref()
        .and_then(|s| s.attachment(0, "child"))
        .expect("child");
    assert_eq!(mesh_vertices(child), &[7.0, 8.0]);
}

#[test]
fn linked_mesh_chains_resolve_through_linked_parents() {
    let bytes = linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 3);
            push_string(out, Some("grandchild"));
            push_linked_mesh(out, None, "child");
            push_string(out, Some("child"));
            push_linked_mesh(out, None, "base");
            push_string(out, Some("base"));
            push_mesh(out, &[9.0, 9.5]);
        },
        |out| push_varint(out, 0),
    );

    let data = decode(&bytes).expect("decode");
    let skin = data.default_skin.as_ref().expect("default skin");
    let grandchild = skin.attachment(0, "grandchild").expect("grandchild");
    assert_eq!(mesh_vertices(grandchild), &[9.0, 9.5]);
}

#[test]
fn linked_mesh_errors() {
    // Missing parent.
    let bytes = linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 1);
            push_string(out, Some("child"));
            push_linked_mesh(out, None, "nobody");
        },
        |out| push_varint(out, 0),
    );
    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(err.root(), Error::LinkedMeshParentNotFound { parent, .. } if parent == "nobody"),
        "{err:?}"
    );

    // Unknown skin.
    let bytes = linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 1);
            push_string(out, Some("child"));
            push_linked_mesh(out, Some("ghost"), "A");
        },
        |out| push_varint(out, 0),
    );
    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(err.root(), Error::LinkedMeshSkinNotFound { skin, .. } if skin == "ghost"),
        "{err:?}"
    );

    // Parent that is not a mesh.
    let bytes = linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 2);
            push_string(out, Some("child"));
            push_linked_mesh(out, None, "box");
            push_string(out, Some("box"));
            push_string(out, None);
            out.push(1);
            push_varint(out, 0);
            push_bool(out, false);
        },
        |out| push_varint(out, 0),
    );
    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(err.root(), Error::LinkedMeshParentNotMesh { .. }),
        "{err:?}"
    );

    // A mesh linked to itself never resolves.
    let bytes = linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 1);
            push_string(out, Some("loop"));
            push_linked_mesh(out, None, "loop");
        },
        |out| push_varint(out, 0),
    );
    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(err.root(), Error::LinkedMeshCycle { attachment, .. } if attachment == "loop"),
        "{err:?}"
    );
}

#[derive(Default)]
struct RecordingLoader {
    reject: Option<&'static str>,
    wrong_kind: bool,
    created: Vec<(String, AttachmentKind, Option<String>)>,
    configured: Vec<String>,
}

impl AttachmentLoader for RecordingLoader {
    fn create_attachment(
        &mut self,
        skin: &str,
        kind: AttachmentKind,
        name: &str,
        path: Option<&str>,
    ) -> Option<Attachment> {
        if self.reject == Some(name) {
            return None;
        }
        self.created
            .push((format!("{skin}/{name}"), kind, path.map(str::to_string)));
        let kind = if self.wrong_kind {
            AttachmentKind::Region
        } else {
            kind
        };
        BlankAttachmentLoader.create_attachment(skin, kind, name, path)
    }

    fn configure_attachment(&mut self, attachment: &mut Attachment) {
        self.configured.push(attachment.name().to_string());
    }
}

fn loader_fixture() -> Vec<u8> {
    linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 2);
            push_string(out, Some("child"));
            push_linked_mesh(out, None, "parent");
            push_string(out, Some("parent"));
            push_mesh(out, &[1.0, 2.0]);
        },
        |out| push_varint(out, 0),
    )
}

#[test]
fn loader_sees_every_attachment_and_configures_after_completion() {
    let bytes = loader_fixture();
    let mut decoder = SkeletonDecoder::with_loader(RecordingLoader::default());
    decoder.decode(&bytes).expect("decode");
    let loader = decoder.into_loader();
    assert_eq!(
        loader.created,
        vec![
            (
                "default/child".to_string(),
                AttachmentKind::LinkedMesh,
                Some("child".to_string())
            ),
            (
                "default/parent".to_string(),
                AttachmentKind::Mesh,
                Some("parent".to_string())
            ),
        ]
    );
    // The linked mesh is configured after its parent geometry is available.
    assert_eq!(loader.configured, vec!["parent", "child"]);
}

#[test]
fn loader_rejection_and_kind_mismatch_fail_decode() {
    let bytes = loader_fixture();

    let mut loader = RecordingLoader {
        reject: Some("parent"),
        ..RecordingLoader::default()
    };
    let err = SkeletonDecoder::with_loader(&mut loader)
        .decode(&bytes)
        .unwrap_err();
    assert!(
        matches!(
            err.root(),
            Error::AttachmentRejected {
                kind: AttachmentKind::Mesh,
                ..
            }
        ),
        "{err:?}"
    );

    let mut loader = RecordingLoader {
        wrong_kind: true,
        ..RecordingLoader::default()
    };
    let err = SkeletonDecoder::with_loader(&mut loader)
        .decode(&bytes)
        .unwrap_err();
    assert!(
        matches!(
            err.root(),
            Error::LoaderKindMismatch {
                requested: AttachmentKind::LinkedMesh,
                actual: "region",
                ..
            }
        ),
        "{err:?}"
    );
}

#[test]
fn duplicate_key_replacing_a_linked_mesh_is_configured_once() {
    let bytes = linked_mesh_fixture(
        |out| {
            push_varint(out, 1);
            push_varint(out, 0);
            push_varint(out, 3);
            push_string(out, Some("child"));
            push_linked_mesh(out, None, "parent");
            push_string(out, Some("child"));
            push_mesh(out, &[7.0, 8.0]);
            push_string(out, Some("parent"));
            push_mesh(out, &[1.0, 2.0]);
        },
        |out| push_varint(out, 0),
    );

    let mut decoder = SkeletonDecoder::with_loader(RecordingLoader::default());
    let data = decoder.decode(&bytes).expect("decode");
    assert_eq!(decoder.loader().configured, vec!["child", "parent"]);

    let skin = data.default_skin.as_ref().expect("default skin");
    let Some(Attachment::Mesh(child)) = skin.attachment(0, "child") else {
        panic!("child mesh missing");
    };
    assert!(child.linked.is_none());
    assert_eq!(child.vertices.values, vec![7.0, 8.0]);
}
