//! Hand-assembled `.skel` fragments for decoder tests.

pub(crate) fn push_varint(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let mut b = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            b |= 0x80;
        }
        out.push(b);
        if value == 0 {
            break;
        }
    }
}

pub(crate) fn push_zigzag(out: &mut Vec<u8>, value: i32) {
    push_varint(out, ((value << 1) ^ (value >> 31)) as u32);
}

pub(crate) fn push_f32_be(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn push_i16_be(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn push_bool(out: &mut Vec<u8>, v: bool) {
    out.push(v as u8);
}

pub(crate) fn push_string(out: &mut Vec<u8>, s: Option<&str>) {
    match s {
        None => push_varint(out, 0),
        Some(s) => {
            let bytes = s.as_bytes();
            push_varint(out, (bytes.len() as u32) + 1);
            out.extend_from_slice(bytes);
        }
    }
}

pub(crate) fn push_white(out: &mut Vec<u8>) {
    out.extend_from_slice(&[0xff; 4]);
}

pub(crate) fn push_header(out: &mut Vec<u8>) {
    push_string(out, Some("hash"));
    push_string(out, Some("3.5.51"));
    push_f32_be(out, 100.0);
    push_f32_be(out, 200.0);
    push_bool(out, false);
}

/// Bone with `x = 10`, `y = 20`, `length = 5`, `scale_x = 2`; other fields at setup defaults.
pub(crate) fn push_bone(out: &mut Vec<u8>, name: &str, parent: Option<u32>) {
    push_string(out, Some(name));
    if let Some(parent) = parent {
        push_varint(out, parent);
    }
    push_f32_be(out, 0.0); // rotation
    push_f32_be(out, 10.0); // x
    push_f32_be(out, 20.0); // y
    push_f32_be(out, 2.0); // scaleX
    push_f32_be(out, 1.0); // scaleY
    push_f32_be(out, 0.0); // shearX
    push_f32_be(out, 0.0); // shearY
    push_f32_be(out, 5.0); // length
    push_bool(out, true);
    push_bool(out, true);
}

pub(crate) fn push_slot(out: &mut Vec<u8>, name: &str, bone: u32, attachment: Option<&str>) {
    push_string(out, Some(name));
    push_varint(out, bone);
    push_white(out);
    push_string(out, attachment);
    push_varint(out, 0);
}

/// Header, a single root bone and `slot_count` slots named `s0..`, no constraints.
pub(crate) fn push_rig(out: &mut Vec<u8>, slot_count: u32) {
    push_header(out);
    push_varint(out, 1);
    push_bone(out, "root", None);
    push_varint(out, slot_count);
    for i in 0..slot_count {
        push_slot(out, &format!("s{i}"), 0, None);
    }
    push_varint(out, 0); // ik
    push_varint(out, 0); // transform
    push_varint(out, 0); // path
}

/// Unweighted mesh record (after its key): null name, null path, two uv pairs per vertex.
pub(crate) fn push_mesh(out: &mut Vec<u8>, vertices: &[f32]) {
    let vertex_count = (vertices.len() / 2) as u32;
    push_string(out, None);
    out.push(2);
    push_string(out, None);
    push_white(out);
    push_varint(out, vertex_count);
    for i in 0..vertex_count * 2 {
        push_f32_be(out, i as f32 / 10.0);
    }
    push_varint(out, 3);
    for t in [0, 1, 2] {
        push_i16_be(out, t);
    }
    push_bool(out, false);
    for &v in vertices {
        push_f32_be(out, v);
    }
    push_varint(out, vertex_count);
}

pub(crate) fn push_linked_mesh(out: &mut Vec<u8>, skin: Option<&str>, parent: &str) {
    push_string(out, None);
    out.push(3);
    push_string(out, None);
    push_white(out);
    push_string(out, skin);
    push_string(out, Some(parent));
    push_bool(out, true);
}

/// Slot, bone, ik, transform, path and deform sections, all empty.
pub(crate) fn push_no_pose_timelines(out: &mut Vec<u8>) {
    for _ in 0..6 {
        push_varint(out, 0);
    }
}
