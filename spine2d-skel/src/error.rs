use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected EOF at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid string at offset {offset}: {message}")]
    InvalidString { offset: usize, message: String },

    #[error("invalid {kind} type {value} at offset {offset}")]
    InvalidTag {
        kind: &'static str,
        value: i32,
        offset: usize,
    },

    #[error("{kind} index {index} out of range (len={len}) in {context}")]
    IndexOutOfRange {
        kind: &'static str,
        index: i64,
        len: usize,
        context: String,
    },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[error("failed to allocate {len} elements for {context}")]
    Allocation { context: &'static str, len: usize },

    #[error("linked mesh '{mesh}' references unknown skin '{skin}'")]
    LinkedMeshSkinNotFound { mesh: String, skin: String },

    #[error("linked mesh '{mesh}' references missing parent mesh '{parent}' (skin '{skin}', slot {slot})")]
    LinkedMeshParentNotFound {
        mesh: String,
        parent: String,
        skin: String,
        slot: usize,
    },

    #[error("linked mesh '{mesh}' parent '{parent}' is not a mesh")]
    LinkedMeshParentNotMesh { mesh: String, parent: String },

    #[error("linked mesh resolution stalled: skin '{skin}', slot {slot}, attachment '{attachment}'")]
    LinkedMeshCycle {
        skin: String,
        slot: usize,
        attachment: String,
    },

    #[error("attachment loader declined {kind:?} attachment '{name}' in skin '{skin}'")]
    AttachmentRejected {
        skin: String,
        name: String,
        kind: crate::AttachmentKind,
    },

    #[error(
        "attachment loader returned a {actual} attachment for '{name}' but {requested:?} was requested"
    )]
    LoaderKindMismatch {
        name: String,
        requested: crate::AttachmentKind,
        actual: &'static str,
    },

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps `self` with a description of the section being processed.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any `Context` layers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

pub(crate) trait ResultExt<T> {
    fn context_with<F, S>(self, f: F) -> Result<T, Error>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T, Error> {
    fn context_with<F, S>(self, f: F) -> Result<T, Error>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
