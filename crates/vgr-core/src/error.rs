//! Error types shared by the coarse and fine rasterizer stages.
//!
//! One flat `thiserror` enum: variants with structured fields, a `Result`
//! alias, and small `is_*` predicates for callers that want to branch on
//! error class without a full `match`.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the rasterizer pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The PTCL bump allocator ran out of room in the caller-declared buffer.
    ///
    /// Recorded here for host-side reporting; the coarse stage itself does
    /// not error out of the dispatch, it flags `BumpAllocators::failed` and
    /// keeps running (see `vgr_raster::ptcl`).
    #[error("ptcl bump allocator overflow: requested {requested} words, {available} available")]
    BumpOverflow {
        /// Words requested by the failing `alloc_cmd`/jump.
        requested: u32,
        /// Words actually available in the dynamic PTCL region.
        available: u32,
    },

    /// The fine interpreter read a command tag it does not recognize.
    ///
    /// A well-formed PTCL stream never produces one; this crate aborts the
    /// tile's stream rather than looping on it.
    #[error("unknown ptcl tag {tag} at tile {tile_ix}, offset {cmd_offset}")]
    UnknownPtclTag {
        /// The offending tag word.
        tag: u32,
        /// Tile index being interpreted.
        tile_ix: u32,
        /// Word offset the tag was read from.
        cmd_offset: u32,
    },

    /// A `SceneView` buffer was shorter than an access into it required.
    #[error("buffer '{name}' too short: needed index {needed}, len {len}")]
    BufferTooShort {
        /// Which named buffer (`scene`, `bin_data`, `tiles`, ...).
        name: &'static str,
        /// Index that was required.
        needed: usize,
        /// Actual buffer length.
        len: usize,
    },

    /// No suitable `wgpu` adapter was found (feature `wgpu` only).
    #[cfg(feature = "wgpu")]
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    /// Device creation failed (feature `wgpu` only).
    #[cfg(feature = "wgpu")]
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(String),

    /// Generic error with custom message. Prefer a specific variant.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns `true` if this is a PTCL allocator overflow.
    #[inline]
    pub fn is_bump_overflow(&self) -> bool {
        matches!(self, Self::BumpOverflow { .. })
    }

    /// Returns `true` if this is an unrecognized PTCL command tag.
    #[inline]
    pub fn is_unknown_tag(&self) -> bool {
        matches!(self, Self::UnknownPtclTag { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_overflow_message_has_fields() {
        let err = Error::BumpOverflow {
            requested: 256,
            available: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("256"));
        assert!(msg.contains("10"));
        assert!(err.is_bump_overflow());
    }

    #[test]
    fn unknown_tag_message_has_fields() {
        let err = Error::UnknownPtclTag {
            tag: 42,
            tile_ix: 7,
            cmd_offset: 128,
        };
        assert!(err.is_unknown_tag());
        assert!(err.to_string().contains("42"));
    }
}
