//! Error taxonomy for emission, validation, and allocation.
//!
//! Every fallible operation in this crate reports one of the variants below;
//! nothing in the non-test code paths unwinds. Emitter front-ends latch the
//! first error they see (see [`Assembler`](crate::Assembler)) so a burst of
//! emissions can be checked once at finalization.

use thiserror::Error;

/// The result type used throughout the crate.
pub type AsmResult<T> = Result<T, AsmError>;

/// Errors produced while validating or encoding instructions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AsmError {
    /// No operand signature of the instruction matches the supplied operands.
    #[error("no encoding accepts this operand combination")]
    InvalidOperandCombination,

    /// The addressing mode cannot be expressed for the target architecture.
    #[error("invalid memory operand for the target architecture")]
    InvalidMemoryOperand,

    /// The immediate value does not fit the width selected by the encoding.
    #[error("immediate value out of range for the selected encoding")]
    InvalidImmediate,

    /// A memory operand without a size hint could select more than one
    /// encoding width and nothing else in the operand tuple pins it.
    #[error("ambiguous memory operand size; add an explicit size hint")]
    AmbiguousOperandSize,

    /// A rel8 reference or binding exceeds the +/-127 byte reach.
    #[error("label out of range for a short (rel8) reference")]
    LabelTooFar,

    /// The referenced label identifier does not exist or is in the wrong
    /// state for the requested operation.
    #[error("invalid label state or identifier")]
    InvalidLabel,

    /// A section or buffer exceeded its addressable size.
    #[error("code buffer exceeded its addressable size")]
    EncodingOverflow,

    /// The target environment does not advertise the CPU features the
    /// selected encoding requires.
    #[error("instruction not supported by the configured CPU features")]
    IncompatibleInstruction,

    /// A register class was exhausted under pinned constraints.
    #[error("physical register allocation failed: {0}")]
    RegAllocFailure(&'static str),

    /// Label/link/relocation bookkeeping reached an inconsistent state.
    /// Seeing this indicates a bug in the crate, not in the caller.
    #[error("internal relocation state is inconsistent: {0}")]
    Relocation(&'static str),
}
