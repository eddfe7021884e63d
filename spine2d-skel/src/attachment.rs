//! Attachment variants and the loader capability the decoder builds them through.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Wire type tag of an attachment record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttachmentKind {
    Region,
    BoundingBox,
    Mesh,
    /// A mesh sharing geometry with a parent mesh; always materialized as [`Attachment::Mesh`].
    LinkedMesh,
    Path,
}

impl AttachmentKind {
    pub(crate) fn from_binary(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Region),
            1 => Some(Self::BoundingBox),
            2 => Some(Self::Mesh),
            3 => Some(Self::LinkedMesh),
            4 => Some(Self::Path),
            _ => None,
        }
    }

    pub(crate) fn to_binary(self) -> u8 {
        match self {
            Self::Region => 0,
            Self::BoundingBox => 1,
            Self::Mesh => 2,
            Self::LinkedMesh => 3,
            Self::Path => 4,
        }
    }
}

/// Vertex buffer of a bounding box, mesh or path.
///
/// Unweighted: `bones` is empty and `values` holds `x, y` pairs.
/// Weighted: `bones` holds, per vertex, an influence count `k` followed by `k` bone indices;
/// `values` holds one `x, y, weight` triple per influence, in the same order.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertices {
    #[cfg_attr(feature = "serde", serde(default))]
    pub bones: Vec<u32>,
    pub values: Vec<f32>,
}

impl Vertices {
    pub fn unweighted(values: Vec<f32>) -> Self {
        Self {
            bones: Vec::new(),
            values,
        }
    }

    pub fn is_weighted(&self) -> bool {
        !self.bones.is_empty()
    }

    /// Length of the vertex array a deform timeline animates.
    pub fn deform_length(&self) -> usize {
        if self.is_weighted() {
            self.values.len() / 3 * 2
        } else {
            self.values.len()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionAttachment {
    pub name: String,
    pub path: String,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
    pub width: f32,
    pub height: f32,
    pub color: [f32; 4],
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBoxAttachment {
    pub name: String,
    pub vertex_count: usize,
    pub vertices: Vertices,
    #[cfg_attr(feature = "serde", serde(default))]
    pub color: Option<[f32; 4]>,
}

/// Names the mesh a linked mesh takes its geometry from.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkedMesh {
    /// `None` refers to the default skin.
    pub skin: Option<String>,
    pub parent: String,
    pub inherit_deform: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshAttachment {
    pub name: String,
    pub path: String,
    pub color: [f32; 4],
    #[cfg_attr(feature = "serde", serde(default))]
    pub vertex_count: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub uvs: Vec<f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub triangles: Vec<u16>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub vertices: Vertices,
    /// Number of hull vertex components (twice the hull vertex count).
    #[cfg_attr(feature = "serde", serde(default))]
    pub hull_length: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub edges: Vec<u16>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub width: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub height: f32,
    /// Set for linked meshes; geometry above is copied from the parent once resolved.
    #[cfg_attr(feature = "serde", serde(default))]
    pub linked: Option<LinkedMesh>,
}

impl MeshAttachment {
    pub(crate) fn copy_geometry_from(&mut self, parent: &MeshAttachment) {
        self.vertex_count = parent.vertex_count;
        self.uvs = parent.uvs.clone();
        self.triangles = parent.triangles.clone();
        self.vertices = parent.vertices.clone();
        self.hull_length = parent.hull_length;
        self.edges = parent.edges.clone();
        self.width = parent.width;
        self.height = parent.height;
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathAttachment {
    pub name: String,
    pub closed: bool,
    pub constant_speed: bool,
    pub vertex_count: usize,
    pub vertices: Vertices,
    /// Curve length per segment (one per three vertices).
    pub lengths: Vec<f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub color: Option<[f32; 4]>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Attachment {
    Region(RegionAttachment),
    BoundingBox(BoundingBoxAttachment),
    Mesh(MeshAttachment),
    Path(PathAttachment),
}

impl Attachment {
    pub fn name(&self) -> &str {
        match self {
            Attachment::Region(a) => a.name.as_str(),
            Attachment::BoundingBox(a) => a.name.as_str(),
            Attachment::Mesh(a) => a.name.as_str(),
            Attachment::Path(a) => a.name.as_str(),
        }
    }

    pub fn kind(&self) -> AttachmentKind {
        match self {
            Attachment::Region(_) => AttachmentKind::Region,
            Attachment::BoundingBox(_) => AttachmentKind::BoundingBox,
            Attachment::Mesh(m) if m.linked.is_some() => AttachmentKind::LinkedMesh,
            Attachment::Mesh(_) => AttachmentKind::Mesh,
            Attachment::Path(_) => AttachmentKind::Path,
        }
    }

    pub(crate) fn variant_name(&self) -> &'static str {
        match self {
            Attachment::Region(_) => "region",
            Attachment::BoundingBox(_) => "bounding box",
            Attachment::Mesh(_) => "mesh",
            Attachment::Path(_) => "path",
        }
    }

    /// Vertex buffer for vertex-bearing attachments.
    pub fn vertices(&self) -> Option<&Vertices> {
        match self {
            Attachment::Region(_) => None,
            Attachment::BoundingBox(a) => Some(&a.vertices),
            Attachment::Mesh(a) => Some(&a.vertices),
            Attachment::Path(a) => Some(&a.vertices),
        }
    }

    /// An attachment of `kind` with every field at its neutral value.
    pub fn blank(kind: AttachmentKind, name: &str, path: Option<&str>) -> Self {
        let path = path.unwrap_or(name).to_string();
        match kind {
            AttachmentKind::Region => Attachment::Region(RegionAttachment {
                name: name.to_string(),
                path,
                x: 0.0,
                y: 0.0,
                scale_x: 1.0,
                scale_y: 1.0,
                rotation: 0.0,
                width: 0.0,
                height: 0.0,
                color: [1.0; 4],
            }),
            AttachmentKind::BoundingBox => Attachment::BoundingBox(BoundingBoxAttachment {
                name: name.to_string(),
                vertex_count: 0,
                vertices: Vertices::default(),
                color: None,
            }),
            AttachmentKind::Mesh | AttachmentKind::LinkedMesh => {
                Attachment::Mesh(MeshAttachment {
                    name: name.to_string(),
                    path,
                    color: [1.0; 4],
                    vertex_count: 0,
                    uvs: Vec::new(),
                    triangles: Vec::new(),
                    vertices: Vertices::default(),
                    hull_length: 0,
                    edges: Vec::new(),
                    width: 0.0,
                    height: 0.0,
                    linked: None,
                })
            }
            AttachmentKind::Path => Attachment::Path(PathAttachment {
                name: name.to_string(),
                closed: false,
                constant_speed: true,
                vertex_count: 0,
                vertices: Vertices::default(),
                lengths: Vec::new(),
                color: None,
            }),
        }
    }
}

/// Builds attachments for the decoder.
///
/// The decoder asks for an attachment as soon as its type, name and path are known, fills in
/// the type-specific fields itself, then calls [`AttachmentLoader::configure_attachment`]
/// once the attachment is complete (for linked meshes: after the parent was resolved).
pub trait AttachmentLoader {
    /// Returns `None` to decline the attachment, which fails the decode.
    ///
    /// [`AttachmentKind::LinkedMesh`] must produce an [`Attachment::Mesh`].
    fn create_attachment(
        &mut self,
        skin: &str,
        kind: AttachmentKind,
        name: &str,
        path: Option<&str>,
    ) -> Option<Attachment>;

    fn configure_attachment(&mut self, _attachment: &mut Attachment) {}
}

impl<L: AttachmentLoader + ?Sized> AttachmentLoader for &mut L {
    fn create_attachment(
        &mut self,
        skin: &str,
        kind: AttachmentKind,
        name: &str,
        path: Option<&str>,
    ) -> Option<Attachment> {
        (**self).create_attachment(skin, kind, name, path)
    }

    fn configure_attachment(&mut self, attachment: &mut Attachment) {
        (**self).configure_attachment(attachment)
    }
}

/// Loader that accepts every attachment and attaches no renderer resources.
#[derive(Copy, Clone, Debug, Default)]
pub struct BlankAttachmentLoader;

impl AttachmentLoader for BlankAttachmentLoader {
    fn create_attachment(
        &mut self,
        _skin: &str,
        kind: AttachmentKind,
        name: &str,
        path: Option<&str>,
    ) -> Option<Attachment> {
        Some(Attachment::blank(kind, name, path))
    }
}
