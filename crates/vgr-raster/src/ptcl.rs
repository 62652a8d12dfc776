//! Per-Tile Command List encoding/decoding and the bump-allocated cursor.
//!
//! Words `[0, n_tiles * PTCL_INITIAL_ALLOC)` are the static region (one
//! fixed-size block per tile); words `[static_end, ...)` are the
//! bump-allocated dynamic region.

use std::sync::atomic::Ordering;

use crate::config::{PTCL_HEADROOM, PTCL_INCREMENT, PTCL_INITIAL_ALLOC};
use crate::types::BumpCell;

/// PTCL command tags, as they appear on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum CmdTag {
    /// Terminates a tile's command stream. Payload: none.
    End = 0,
    /// Analytic fill. Payload: `(seg_ptr, backdrop_as_u32)`.
    Fill = 1,
    /// Distance-field stroke. Payload: `(seg_ptr, half_width_f32_bitcast)`.
    Stroke = 2,
    /// Full-tile solid coverage. Payload: none.
    Solid = 3,
    /// Source-over composite with a solid color. Payload: `(rgba_u32,)`.
    Color = 5,
    /// Indirection to another PTCL block. Payload: `(absolute_word_offset,)`.
    Jump = 11,
}

impl CmdTag {
    /// Decode a raw tag word, if it names a known command.
    pub fn from_u32(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::End),
            1 => Some(Self::Fill),
            2 => Some(Self::Stroke),
            3 => Some(Self::Solid),
            5 => Some(Self::Color),
            11 => Some(Self::Jump),
            _ => None,
        }
    }
}

/// A decoded PTCL command, produced by [`decode_stream`] for tests and by
/// nothing in the hot fine-stage path (which dispatches on the raw tag
/// directly, see [`crate::fine`]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cmd {
    /// `(segments, backdrop)`.
    Fill(u32, i32),
    /// `(segments, half_width)`.
    Stroke(u32, f32),
    Solid,
    /// Packed `0xAABBGGRR` color word.
    Color(u32),
    End,
}

/// A per-lane cursor into the PTCL buffer, implementing the `alloc_cmd`
/// contract: reserve `size` words at the current position, transparently
/// jumping to a freshly bumped block first if the reservation would not fit
/// before `cmd_limit`.
///
/// Deliberately `Copy` and reference-free: the buffer and the shared bump
/// cell are passed into each method instead of borrowed for the cursor's
/// lifetime, so the coarse stage can hold one cursor per lane — up to
/// `WG_SIZE` of them, in a plain array — without aliasing a single mutable
/// `ptcl` slice `WG_SIZE` ways.
#[derive(Clone, Copy, Debug)]
pub struct PtclWriter {
    static_end: u32,
    cmd_offset: u32,
    cmd_limit: u32,
}

impl PtclWriter {
    /// Start a cursor for `tile_ix`'s static initial block.
    pub fn new(static_end: u32, tile_ix: u32) -> Self {
        let cmd_offset = tile_ix * PTCL_INITIAL_ALLOC;
        Self {
            static_end,
            cmd_offset,
            cmd_limit: cmd_offset + (PTCL_INITIAL_ALLOC - PTCL_HEADROOM),
        }
    }

    /// Current write cursor, in words.
    pub fn cmd_offset(&self) -> u32 {
        self.cmd_offset
    }

    /// Reserve `size` words at the cursor, jumping to a fresh dynamic block
    /// first if the reservation would overflow `cmd_limit`.
    ///
    /// `bump` is shared across every lane/bin processed in a dispatch,
    /// matching the single global `BumpAllocators` buffer the real shaders
    /// bind.
    pub fn alloc_cmd(&mut self, ptcl: &mut [u32], bump: &BumpCell, size: u32) {
        if self.cmd_offset + size >= self.cmd_limit {
            let new_offset = bump.ptcl.fetch_add(PTCL_INCREMENT, Ordering::Relaxed);
            let grant_end = self.static_end as u64 + new_offset as u64 + PTCL_INCREMENT as u64;
            if grant_end > ptcl.len() as u64 {
                bump.failed.store(1, Ordering::Relaxed);
            }
            self.write_words(ptcl, bump, &[CmdTag::Jump as u32, self.static_end + new_offset]);
            self.cmd_offset = self.static_end + new_offset;
            self.cmd_limit = self.cmd_offset + (PTCL_INCREMENT - PTCL_HEADROOM);
        }
    }

    /// Write `words` at the cursor and advance it. Does not check
    /// `cmd_limit` itself — callers must `alloc_cmd` first (mirrors the
    /// WGSL source, where the jump check and the write are separate steps).
    pub fn write_words(&mut self, ptcl: &mut [u32], bump: &BumpCell, words: &[u32]) {
        for (i, &w) in words.iter().enumerate() {
            let ix = (self.cmd_offset as usize) + i;
            if let Some(slot) = ptcl.get_mut(ix) {
                *slot = w;
            } else {
                bump.failed.store(1, Ordering::Relaxed);
            }
        }
        self.cmd_offset += words.len() as u32;
    }

    /// Emit `CMD_END` at the current cursor, terminating this tile's stream.
    pub fn write_end(&mut self, ptcl: &mut [u32], bump: &BumpCell) {
        self.alloc_cmd(ptcl, bump, 1);
        self.write_words(ptcl, bump, &[CmdTag::End as u32]);
    }

    /// Emits `CMD_FILL`/`CMD_SOLID` for a fill (`linewidth < 0`) or
    /// `CMD_STROKE` otherwise. Always reserves 3 words first so both
    /// branches fit (`CMD_SOLID` wastes the extra 2).
    pub fn write_path(
        &mut self,
        ptcl: &mut [u32],
        bump: &BumpCell,
        segments: u32,
        backdrop: i32,
        linewidth: f32,
    ) {
        self.alloc_cmd(ptcl, bump, 3);
        if linewidth < 0.0 {
            if segments != 0 {
                self.write_words(ptcl, bump, &[CmdTag::Fill as u32, segments, backdrop as u32]);
            } else {
                self.write_words(ptcl, bump, &[CmdTag::Solid as u32]);
            }
        } else {
            self.write_words(
                ptcl,
                bump,
                &[CmdTag::Stroke as u32, segments, (0.5 * linewidth).to_bits()],
            );
        }
    }

    /// Emits `CMD_COLOR` with the tile's packed fill color.
    pub fn write_color(&mut self, ptcl: &mut [u32], bump: &BumpCell, rgba: u32) {
        self.alloc_cmd(ptcl, bump, 2);
        self.write_words(ptcl, bump, &[CmdTag::Color as u32, rgba]);
    }
}

/// Decode a tile's PTCL stream starting at `start`, following `CMD_JUMP`s,
/// stopping at `CMD_END` or after `max_jumps` jumps (a well-formed stream
/// always terminates; this keeps a corrupt buffer from hanging a test).
pub fn decode_stream(ptcl: &[u32], start: u32, max_jumps: u32) -> Vec<Cmd> {
    let mut out = Vec::new();
    let mut ix = start as usize;
    let mut jumps = 0u32;
    loop {
        let Some(&tag) = ptcl.get(ix) else { break };
        match CmdTag::from_u32(tag) {
            Some(CmdTag::End) => {
                out.push(Cmd::End);
                break;
            }
            Some(CmdTag::Fill) => {
                let segments = ptcl.get(ix + 1).copied().unwrap_or(0);
                let backdrop = ptcl.get(ix + 2).copied().unwrap_or(0) as i32;
                out.push(Cmd::Fill(segments, backdrop));
                ix += 3;
            }
            Some(CmdTag::Stroke) => {
                let segments = ptcl.get(ix + 1).copied().unwrap_or(0);
                let half_width = f32::from_bits(ptcl.get(ix + 2).copied().unwrap_or(0));
                out.push(Cmd::Stroke(segments, half_width));
                ix += 3;
            }
            Some(CmdTag::Solid) => {
                out.push(Cmd::Solid);
                ix += 1;
            }
            Some(CmdTag::Color) => {
                let rgba = ptcl.get(ix + 1).copied().unwrap_or(0);
                out.push(Cmd::Color(rgba));
                ix += 2;
            }
            Some(CmdTag::Jump) => {
                jumps += 1;
                if jumps > max_jumps {
                    break;
                }
                ix = ptcl.get(ix + 1).copied().unwrap_or(0) as usize;
            }
            None => break,
        }
    }
    out
}
