//! Privileged stack and register-frame layout.
//!
//! Every slow-path trap pushes one frame onto the trapped thread's privileged
//! stack; every completion pops exactly one. Frames link to the previous
//! top-of-stack by a **relative byte offset**, not a pointer, so a relocated
//! stack stays internally consistent. This linkage is a required invariant of
//! the on-stack ABI, not an implementation accident.
//!
//! # Binary layout
//!
//! A frame is 21 little-endian `u32` words, fixed for both variants so the
//! layout stays bit-compatible with the hand-written entry/exit trampolines:
//!
//! ```text
//! word  0        previous top-of-stack offset
//! word  1        trap cause
//! word  2        raw trap detail (sysopcode)
//! word  3        frame kind (1 = Minimal, 2 = Full)
//! words 4..=19   %0..%15
//! word  20       program counter
//! ```
//!
//! A `Minimal` frame writes only SP, FP, RP, and PC of its register words.

use thiserror::Error;

use crate::common::constants::{NR_GPRS, REG_FP, REG_RP, REG_SP};
use crate::common::LiveRegs;
use crate::trap::cause::{SysOpcode, TrapCause};

/// Frame size in 32-bit words.
pub const FRAME_WORDS: usize = 21;

/// Frame size in bytes.
pub const FRAME_BYTES: u32 = (FRAME_WORDS as u32) * 4;

const WORD_PREV_TOP: usize = 0;
const WORD_CAUSE: usize = 1;
const WORD_OPCODE: usize = 2;
const WORD_KIND: usize = 3;
const WORD_GPR0: usize = 4;
const WORD_PC: usize = 20;

/// Which registers a frame preserves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// Stack pointer, frame pointer, return address, program counter.
    /// Sufficient for context switches, which preserve everything else by
    /// the calling convention.
    Minimal = 1,
    /// The full general-purpose register set plus program counter.
    Full = 2,
}

impl FrameKind {
    fn from_raw(val: u32) -> Option<Self> {
        match val {
            1 => Some(Self::Minimal),
            2 => Some(Self::Full),
            _ => None,
        }
    }
}

/// Errors from privileged-stack operations.
///
/// All of these are protocol violations at the dispatch layer; the caller
/// converts them into a fatal with a diagnostic dump.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StackError {
    /// No room for another frame.
    #[error("privileged stack full")]
    Overflow,
    /// Pop with no frame outstanding.
    #[error("privileged stack empty")]
    Underflow,
    /// The top frame's kind or cause word is not a legal encoding.
    #[error("privileged stack corrupt")]
    Corrupt,
}

/// A frame read back off the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavedFrame {
    /// Which registers the frame preserves.
    pub kind: FrameKind,
    /// The trap cause that produced the frame.
    pub cause: TrapCause,
    /// The raw trap detail that accompanied it.
    pub opcode: SysOpcode,
    regs: [u32; NR_GPRS],
    pc: u32,
}

impl SavedFrame {
    /// The saved program counter.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// The saved primary return-value register (`%1`).
    ///
    /// Meaningful only for `Full` frames; a `Minimal` frame never captured it.
    pub fn ret(&self) -> u32 {
        self.regs[1]
    }

    /// A saved general-purpose register.
    pub fn reg(&self, idx: usize) -> u32 {
        self.regs[idx]
    }

    /// Writes the preserved registers back into a live context.
    ///
    /// Restores per the frame's tag. Neither variant touches the live PC or
    /// `%1`: those are supplied by the collaborator completing the trap (a
    /// context switch supplies the destination thread's own values).
    pub fn restore_into(&self, live: &mut LiveRegs) {
        match self.kind {
            FrameKind::Minimal => {
                live.file.write(REG_SP, self.regs[REG_SP]);
                live.file.write(REG_FP, self.regs[REG_FP]);
                live.file.write(REG_RP, self.regs[REG_RP]);
            }
            FrameKind::Full => {
                for i in 0..NR_GPRS {
                    if i == 1 {
                        continue;
                    }
                    live.file.write(i, self.regs[i]);
                }
            }
        }
    }
}

/// A thread's privileged stack.
///
/// Grows downward from the end of its buffer; `top == size` means empty,
/// which is also how "this thread is currently in unprivileged execution" is
/// decided (its outermost frame is its original entry into privileged mode).
pub struct PrivStack {
    mem: Vec<u8>,
    top: u32,
}

impl std::fmt::Debug for PrivStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivStack")
            .field("size", &self.mem.len())
            .field("top", &self.top)
            .field("depth", &self.depth())
            .finish()
    }
}

impl PrivStack {
    /// Creates an empty privileged stack of `size` bytes.
    pub fn new(size: u32) -> Self {
        Self {
            mem: vec![0; size as usize],
            top: size,
        }
    }

    /// Size of the stack in bytes.
    pub fn size(&self) -> u32 {
        self.mem.len() as u32
    }

    /// Current top-of-stack byte offset.
    pub fn top(&self) -> u32 {
        self.top
    }

    /// True when no frame is outstanding.
    pub fn is_empty(&self) -> bool {
        self.top == self.size()
    }

    /// Number of frames currently chained on the stack.
    pub fn depth(&self) -> usize {
        let mut n = 0;
        let mut at = self.top;
        while at != self.size() {
            n += 1;
            at = self.word(at, WORD_PREV_TOP);
        }
        n
    }

    fn word(&self, frame_at: u32, idx: usize) -> u32 {
        let off = frame_at as usize + idx * 4;
        u32::from_le_bytes([
            self.mem[off],
            self.mem[off + 1],
            self.mem[off + 2],
            self.mem[off + 3],
        ])
    }

    fn set_word(&mut self, frame_at: u32, idx: usize, val: u32) {
        let off = frame_at as usize + idx * 4;
        self.mem[off..off + 4].copy_from_slice(&val.to_le_bytes());
    }

    /// Pushes one frame capturing the live register context.
    ///
    /// # Errors
    ///
    /// [`StackError::Overflow`] when no room remains; the caller treats this
    /// as fatal, since losing trapped state is unrecoverable.
    pub fn push(
        &mut self,
        kind: FrameKind,
        cause: TrapCause,
        opcode: SysOpcode,
        live: &LiveRegs,
    ) -> Result<(), StackError> {
        if self.top < FRAME_BYTES {
            return Err(StackError::Overflow);
        }
        let at = self.top - FRAME_BYTES;
        let prev = self.top;
        self.top = at;

        self.set_word(at, WORD_PREV_TOP, prev);
        self.set_word(at, WORD_CAUSE, cause.to_raw());
        self.set_word(at, WORD_OPCODE, opcode.raw());
        self.set_word(at, WORD_KIND, kind as u32);

        match kind {
            FrameKind::Minimal => {
                self.set_word(at, WORD_GPR0 + REG_SP, live.file.sp());
                self.set_word(at, WORD_GPR0 + REG_FP, live.file.fp());
                self.set_word(at, WORD_GPR0 + REG_RP, live.file.rp());
            }
            FrameKind::Full => {
                for i in 0..NR_GPRS {
                    self.set_word(at, WORD_GPR0 + i, live.file.read(i));
                }
            }
        }
        self.set_word(at, WORD_PC, live.pc);
        Ok(())
    }

    /// Pops the most recent frame, returning its contents.
    ///
    /// # Errors
    ///
    /// [`StackError::Underflow`] on an empty stack, [`StackError::Corrupt`]
    /// when the stored kind or cause word is not a legal encoding.
    pub fn pop(&mut self) -> Result<SavedFrame, StackError> {
        if self.is_empty() {
            return Err(StackError::Underflow);
        }
        let at = self.top;
        let kind = FrameKind::from_raw(self.word(at, WORD_KIND)).ok_or(StackError::Corrupt)?;
        let cause = TrapCause::from_raw(self.word(at, WORD_CAUSE)).ok_or(StackError::Corrupt)?;

        let mut regs = [0u32; NR_GPRS];
        for (i, r) in regs.iter_mut().enumerate() {
            *r = self.word(at, WORD_GPR0 + i);
        }
        let frame = SavedFrame {
            kind,
            cause,
            opcode: SysOpcode(self.word(at, WORD_OPCODE)),
            regs,
            pc: self.word(at, WORD_PC),
        };

        self.top = self.word(at, WORD_PREV_TOP);
        if self.top > self.size() {
            return Err(StackError::Corrupt);
        }
        Ok(frame)
    }

    /// Topmost words of the stack, newest first, for diagnostic dumps.
    pub fn dump_window(&self, words: usize) -> Vec<u32> {
        let avail = ((self.size() - self.top) / 4) as usize;
        (0..avail.min(words))
            .map(|i| self.word(self.top, i))
            .collect()
    }
}
