//! Code holder: append-only section buffers, labels, links and relocations.
//!
//! A [`CodeHolder`] owns everything an emitter session produces: one or more
//! sections of machine bytes, the label table, the arena of unresolved link
//! records and the relocation list. Backward label references are patched in
//! place; forward references append a link record to a per-label singly
//! linked list that is drained when the label is bound. Absolute and
//! cross-section references become relocations applied by
//! [`CodeHolder::copy_flattened`].

use crate::cpu::{Arch, Environment};
use crate::error::{AsmError, AsmResult};
use crate::operand::Label;

/// Identifies a section within a holder.
pub type SectionId = u16;

/// Byte offset within a section.
pub type CodeOffset = u32;

/// Sections may not grow beyond this; rel32 references must stay
/// representable.
const MAX_SECTION_SIZE: usize = i32::MAX as usize;

/// Sentinel terminating a label's link list.
const NO_LINK: u32 = u32::MAX;

/// Section permission/content flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SectionFlags(u8);

impl SectionFlags {
    pub const NONE: SectionFlags = SectionFlags(0);
    pub const EXEC: SectionFlags = SectionFlags(1 << 0);
    pub const WRITE: SectionFlags = SectionFlags(1 << 1);

    #[must_use]
    pub const fn or(self, other: SectionFlags) -> SectionFlags {
        SectionFlags(self.0 | other.0)
    }

    #[must_use]
    pub fn contains(self, other: SectionFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// One contiguous append-only byte stream.
#[derive(Debug)]
pub struct Section {
    name: String,
    flags: SectionFlags,
    align: u32,
    data: Vec<u8>,
}

impl Section {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn flags(&self) -> SectionFlags {
        self.flags
    }

    #[must_use]
    pub fn alignment(&self) -> u32 {
        self.align
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> CodeOffset {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.data.len() as CodeOffset
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// How a label reference patches the bytes it refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FixupKind {
    /// Signed 8-bit displacement relative to the end of the field.
    Rel8,
    /// Signed 32-bit displacement relative to the end of the field.
    Rel32,
    /// 32-bit absolute address, patched against the final base.
    Abs32,
    /// 64-bit absolute address, patched against the final base.
    Abs64,
}

impl FixupKind {
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            FixupKind::Rel8 => 1,
            FixupKind::Rel32 | FixupKind::Abs32 => 4,
            FixupKind::Abs64 => 8,
        }
    }

    #[must_use]
    fn is_relative(self) -> bool {
        matches!(self, FixupKind::Rel8 | FixupKind::Rel32)
    }
}

#[derive(Copy, Clone, Debug)]
enum LabelState {
    Unbound { head: u32 },
    Bound { section: SectionId, offset: CodeOffset },
}

#[derive(Copy, Clone, Debug)]
struct LinkRecord {
    next: u32,
    section: SectionId,
    offset: CodeOffset,
    kind: FixupKind,
}

/// A pending absolute or cross-section reference.
#[derive(Copy, Clone, Debug)]
struct RelocEntry {
    section: SectionId,
    offset: CodeOffset,
    kind: FixupKind,
    target: Label,
}

/// Owns code, labels and relocations for one emitter session.
#[derive(Debug)]
pub struct CodeHolder {
    env: Environment,
    base_address: Option<u64>,
    sections: Vec<Section>,
    labels: Vec<LabelState>,
    links: Vec<LinkRecord>,
    relocs: Vec<RelocEntry>,
}

impl CodeHolder {
    /// Create a holder with a default executable `.text` section.
    #[must_use]
    pub fn new(env: Environment) -> CodeHolder {
        let mut holder = CodeHolder {
            env,
            base_address: None,
            sections: Vec::new(),
            labels: Vec::new(),
            links: Vec::new(),
            relocs: Vec::new(),
        };
        holder
            .new_section(".text", SectionFlags::EXEC, 16)
            .expect("fresh holder always has room for .text");
        holder
    }

    /// Like [`CodeHolder::new`] with a known load address; relocations are
    /// still applied at flatten time against the address passed there.
    #[must_use]
    pub fn with_base_address(env: Environment, base: u64) -> CodeHolder {
        let mut holder = CodeHolder::new(env);
        holder.base_address = Some(base);
        holder
    }

    #[must_use]
    pub fn env(&self) -> Environment {
        self.env
    }

    #[must_use]
    pub fn arch(&self) -> Arch {
        self.env.arch
    }

    #[must_use]
    pub fn base_address(&self) -> Option<u64> {
        self.base_address
    }

    /// The identifier of the default `.text` section.
    #[must_use]
    pub fn text_section(&self) -> SectionId {
        0
    }

    /// Create a new section. Alignment must be a power of two.
    pub fn new_section(
        &mut self,
        name: &str,
        flags: SectionFlags,
        align: u32,
    ) -> AsmResult<SectionId> {
        if !align.is_power_of_two() {
            return Err(AsmError::Relocation("section alignment must be a power of two"));
        }
        let id = self.sections.len();
        if id > usize::from(SectionId::MAX) {
            return Err(AsmError::EncodingOverflow);
        }
        self.sections.push(Section {
            name: name.to_string(),
            flags,
            align,
            data: Vec::new(),
        });
        #[allow(clippy::cast_possible_truncation)]
        Ok(id as SectionId)
    }

    #[must_use]
    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[usize::from(id)]
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Current append position of a section.
    #[must_use]
    pub fn cursor(&self, id: SectionId) -> CodeOffset {
        self.section(id).len()
    }

    /// Allocate a new label in the unbound state.
    pub fn new_label(&mut self) -> Label {
        let id = self.labels.len();
        assert!(id < NO_LINK as usize, "label table exhausted");
        self.labels.push(LabelState::Unbound { head: NO_LINK });
        #[allow(clippy::cast_possible_truncation)]
        Label(id as u32)
    }

    #[must_use]
    pub fn is_label_valid(&self, label: Label) -> bool {
        (label.0 as usize) < self.labels.len()
    }

    /// The section and offset of a bound label.
    #[must_use]
    pub fn label_position(&self, label: Label) -> Option<(SectionId, CodeOffset)> {
        match self.labels.get(label.0 as usize) {
            Some(LabelState::Bound { section, offset }) => Some((*section, *offset)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_bound(&self, label: Label) -> bool {
        self.label_position(label).is_some()
    }

    /// Bind `label` at the current position of `section`, resolving its
    /// pending links.
    ///
    /// A rel8 link whose displacement exceeds the signed 8-bit range fails
    /// with [`AsmError::LabelTooFar`]; once bound, a label may not be bound
    /// again.
    pub fn bind_label(&mut self, label: Label, section: SectionId) -> AsmResult<()> {
        let position = self.cursor(section);
        let state = *self
            .labels
            .get(label.0 as usize)
            .ok_or(AsmError::InvalidLabel)?;
        let head = match state {
            LabelState::Bound { .. } => return Err(AsmError::InvalidLabel),
            LabelState::Unbound { head } => head,
        };

        let mut cursor = head;
        while cursor != NO_LINK {
            let link = self.links[cursor as usize];
            self.resolve_link(link, label, section, position)?;
            cursor = link.next;
        }

        self.labels[label.0 as usize] = LabelState::Bound { section, offset: position };
        log::trace!("bound label {} at {}+{position:#x}", label.0, self.section(section).name);
        Ok(())
    }

    fn resolve_link(
        &mut self,
        link: LinkRecord,
        label: Label,
        section: SectionId,
        position: CodeOffset,
    ) -> AsmResult<()> {
        if !link.kind.is_relative() {
            // Absolute fixups always wait for the final base address.
            self.relocs.push(RelocEntry {
                section: link.section,
                offset: link.offset,
                kind: link.kind,
                target: label,
            });
            return Ok(());
        }
        if link.section != section {
            // A relative reference across sections is resolvable only once
            // the flattened layout is known.
            if link.kind == FixupKind::Rel8 {
                return Err(AsmError::LabelTooFar);
            }
            self.relocs.push(RelocEntry {
                section: link.section,
                offset: link.offset,
                kind: link.kind,
                target: label,
            });
            return Ok(());
        }
        self.patch_rel(link.section, link.offset, link.kind, position)
    }

    /// Add `target - (offset + size)` into the placeholder at `offset`.
    fn patch_rel(
        &mut self,
        section: SectionId,
        offset: CodeOffset,
        kind: FixupKind,
        target: CodeOffset,
    ) -> AsmResult<()> {
        let data = &mut self.sections[usize::from(section)].data;
        let at = offset as usize;
        #[allow(clippy::cast_possible_wrap)]
        let disp = target.wrapping_sub(offset + kind.size()) as i32;
        match kind {
            FixupKind::Rel8 => {
                #[allow(clippy::cast_possible_wrap)]
                let existing = i64::from(data[at] as i8);
                let value = existing + i64::from(disp);
                let byte = i8::try_from(value).map_err(|_| AsmError::LabelTooFar)?;
                #[allow(clippy::cast_sign_loss)]
                {
                    data[at] = byte as u8;
                }
            }
            FixupKind::Rel32 => {
                let bytes: [u8; 4] = data[at..at + 4].try_into().unwrap();
                let value = i32::from_le_bytes(bytes).wrapping_add(disp);
                data[at..at + 4].copy_from_slice(&value.to_le_bytes());
            }
            FixupKind::Abs32 | FixupKind::Abs64 => unreachable!("absolute fixups use relocations"),
        }
        Ok(())
    }

    /// Register a use of `label` whose placeholder was just written at
    /// `offset` in `section`.
    ///
    /// Bound same-section targets patch immediately; everything else either
    /// chains a link record (unbound) or records a relocation (absolute or
    /// cross-section).
    pub(crate) fn use_label(
        &mut self,
        section: SectionId,
        offset: CodeOffset,
        kind: FixupKind,
        label: Label,
    ) -> AsmResult<()> {
        let state = *self
            .labels
            .get(label.0 as usize)
            .ok_or(AsmError::InvalidLabel)?;
        match state {
            LabelState::Bound { section: target_section, offset: target } => {
                if kind.is_relative() && target_section == section {
                    self.patch_rel(section, offset, kind, target)
                } else if kind == FixupKind::Rel8 {
                    Err(AsmError::LabelTooFar)
                } else {
                    self.relocs.push(RelocEntry { section, offset, kind, target: label });
                    Ok(())
                }
            }
            LabelState::Unbound { head } => {
                let id = self.links.len();
                if id >= NO_LINK as usize {
                    return Err(AsmError::EncodingOverflow);
                }
                self.links.push(LinkRecord { next: head, section, offset, kind });
                #[allow(clippy::cast_possible_truncation)]
                {
                    self.labels[label.0 as usize] = LabelState::Unbound { head: id as u32 };
                }
                Ok(())
            }
        }
    }

    pub(crate) fn push_bytes(&mut self, section: SectionId, bytes: &[u8]) -> AsmResult<()> {
        let data = &mut self.sections[usize::from(section)].data;
        if data.len() + bytes.len() > MAX_SECTION_SIZE {
            return Err(AsmError::EncodingOverflow);
        }
        data.extend_from_slice(bytes);
        Ok(())
    }

    /// Align a section's cursor by appending `fill` bytes.
    pub fn align(&mut self, section: SectionId, alignment: u32, fill: u8) -> AsmResult<()> {
        if !alignment.is_power_of_two() {
            return Err(AsmError::Relocation("alignment must be a power of two"));
        }
        let len = self.cursor(section);
        let aligned = align_up(len, alignment);
        let pad = (aligned - len) as usize;
        if pad > 0 {
            let fill = vec![fill; pad];
            self.push_bytes(section, &fill)?;
        }
        Ok(())
    }

    /// Flattened byte positions of each section and the total size.
    fn layout(&self) -> (Vec<u64>, u64) {
        let mut bases = Vec::with_capacity(self.sections.len());
        let mut cursor = 0u64;
        for section in &self.sections {
            cursor = align_up64(cursor, u64::from(section.align));
            bases.push(cursor);
            cursor += u64::from(section.len());
        }
        (bases, cursor)
    }

    /// Total flattened size, including inter-section alignment padding.
    #[must_use]
    pub fn code_size(&self) -> usize {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.layout().1 as usize
        }
    }

    /// Verify no referenced label remains unbound.
    fn check_labels_resolved(&self) -> AsmResult<()> {
        for state in &self.labels {
            if let LabelState::Unbound { head } = state {
                if *head != NO_LINK {
                    return Err(AsmError::Relocation("unbound label still referenced"));
                }
            }
        }
        Ok(())
    }

    /// Copy all sections into `dest`, applying relocations against `base`.
    ///
    /// Returns the number of bytes written. `dest` must be at least
    /// [`CodeHolder::code_size`] bytes.
    pub fn copy_flattened(&self, dest: &mut [u8], base: u64) -> AsmResult<usize> {
        self.check_labels_resolved()?;
        let (bases, total) = self.layout();
        let total = usize::try_from(total).map_err(|_| AsmError::EncodingOverflow)?;
        if dest.len() < total {
            return Err(AsmError::EncodingOverflow);
        }
        dest[..total].fill(0);
        for (section, &start) in self.sections.iter().zip(&bases) {
            #[allow(clippy::cast_possible_truncation)]
            let start = start as usize;
            dest[start..start + section.data.len()].copy_from_slice(&section.data);
        }

        for reloc in &self.relocs {
            let (target_section, target_offset) = self
                .label_position(reloc.target)
                .ok_or(AsmError::Relocation("relocation against unbound label"))?;
            let target_addr =
                base + bases[usize::from(target_section)] + u64::from(target_offset);
            #[allow(clippy::cast_possible_truncation)]
            let at = (bases[usize::from(reloc.section)] + u64::from(reloc.offset)) as usize;
            match reloc.kind {
                FixupKind::Abs64 => {
                    let existing = u64::from_le_bytes(dest[at..at + 8].try_into().unwrap());
                    dest[at..at + 8]
                        .copy_from_slice(&target_addr.wrapping_add(existing).to_le_bytes());
                }
                FixupKind::Abs32 => {
                    let existing = u64::from(u32::from_le_bytes(dest[at..at + 4].try_into().unwrap()));
                    let value = u32::try_from(target_addr.wrapping_add(existing))
                        .map_err(|_| AsmError::Relocation("abs32 relocation overflow"))?;
                    dest[at..at + 4].copy_from_slice(&value.to_le_bytes());
                }
                FixupKind::Rel32 => {
                    let place = base + bases[usize::from(reloc.section)] + u64::from(reloc.offset);
                    let existing = i64::from(i32::from_le_bytes(dest[at..at + 4].try_into().unwrap()));
                    #[allow(clippy::cast_possible_wrap)]
                    let disp = (target_addr as i64) - (place as i64 + 4) + existing;
                    let disp = i32::try_from(disp)
                        .map_err(|_| AsmError::Relocation("rel32 relocation overflow"))?;
                    dest[at..at + 4].copy_from_slice(&disp.to_le_bytes());
                }
                FixupKind::Rel8 => {
                    return Err(AsmError::Relocation("rel8 cannot cross sections"));
                }
            }
        }
        Ok(total)
    }

    /// Convenience wrapper allocating the flattened image.
    pub fn flatten(&self, base: u64) -> AsmResult<Vec<u8>> {
        let mut out = vec![0; self.code_size()];
        let n = self.copy_flattened(&mut out, base)?;
        out.truncate(n);
        Ok(out)
    }
}

fn align_up(value: u32, alignment: u32) -> u32 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

fn align_up64(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// A write cursor over one section of a holder; the encoder's byte sink.
pub(crate) struct SectionWriter<'a> {
    holder: &'a mut CodeHolder,
    section: SectionId,
}

impl<'a> SectionWriter<'a> {
    pub(crate) fn new(holder: &'a mut CodeHolder, section: SectionId) -> SectionWriter<'a> {
        SectionWriter { holder, section }
    }

    pub(crate) fn arch(&self) -> Arch {
        self.holder.arch()
    }

    pub(crate) fn offset(&self) -> CodeOffset {
        self.holder.cursor(self.section)
    }

    pub(crate) fn put1(&mut self, v: u8) -> AsmResult<()> {
        self.holder.push_bytes(self.section, &[v])
    }

    pub(crate) fn put2(&mut self, v: u16) -> AsmResult<()> {
        self.holder.push_bytes(self.section, &v.to_le_bytes())
    }

    pub(crate) fn put4(&mut self, v: u32) -> AsmResult<()> {
        self.holder.push_bytes(self.section, &v.to_le_bytes())
    }

    pub(crate) fn put8(&mut self, v: u64) -> AsmResult<()> {
        self.holder.push_bytes(self.section, &v.to_le_bytes())
    }

    /// Record a use of `label` whose placeholder starts at `offset`.
    pub(crate) fn use_label_at(
        &mut self,
        offset: CodeOffset,
        kind: FixupKind,
        label: Label,
    ) -> AsmResult<()> {
        self.holder.use_label(self.section, offset, kind, label)
    }

    /// Position of a bound label in this writer's section.
    pub(crate) fn bound_position(&self, label: Label) -> Option<CodeOffset> {
        match self.holder.label_position(label) {
            Some((section, offset)) if section == self.section => Some(offset),
            _ => None,
        }
    }

    pub(crate) fn label_is_valid(&self, label: Label) -> bool {
        self.holder.is_label_valid(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Environment;

    #[test]
    fn backward_patch() {
        let mut holder = CodeHolder::new(Environment::x64());
        let text = holder.text_section();
        let label = holder.new_label();
        holder.push_bytes(text, &[0x90, 0x90]).unwrap();
        holder.bind_label(label, text).unwrap();
        // A rel8 placeholder at offset 3 (e.g. after a jump opcode byte).
        holder.push_bytes(text, &[0xeb, 0x00]).unwrap();
        holder.use_label(text, 3, FixupKind::Rel8, label).unwrap();
        // Displacement: 2 - (3 + 1) = -2.
        assert_eq!(holder.section(text).data(), &[0x90, 0x90, 0xeb, 0xfe]);
    }

    #[test]
    fn forward_link_then_bind() {
        let mut holder = CodeHolder::new(Environment::x64());
        let text = holder.text_section();
        let label = holder.new_label();
        holder.push_bytes(text, &[0xe9, 0, 0, 0, 0]).unwrap();
        holder.use_label(text, 1, FixupKind::Rel32, label).unwrap();
        holder.push_bytes(text, &[0x90; 3]).unwrap();
        holder.bind_label(label, text).unwrap();
        // Displacement: 8 - (1 + 4) = 3.
        assert_eq!(holder.section(text).data(), &[0xe9, 3, 0, 0, 0, 0x90, 0x90, 0x90]);
    }

    #[test]
    fn short_forward_out_of_range() {
        let mut holder = CodeHolder::new(Environment::x64());
        let text = holder.text_section();
        let label = holder.new_label();
        holder.push_bytes(text, &[0xeb, 0x00]).unwrap();
        holder.use_label(text, 1, FixupKind::Rel8, label).unwrap();
        holder.push_bytes(text, &vec![0x90; 200]).unwrap();
        assert_eq!(holder.bind_label(label, text), Err(AsmError::LabelTooFar));
    }

    #[test]
    fn double_bind_rejected() {
        let mut holder = CodeHolder::new(Environment::x64());
        let text = holder.text_section();
        let label = holder.new_label();
        holder.bind_label(label, text).unwrap();
        assert_eq!(holder.bind_label(label, text), Err(AsmError::InvalidLabel));
    }

    #[test]
    fn flatten_applies_abs_relocs() {
        let mut holder = CodeHolder::new(Environment::x64());
        let text = holder.text_section();
        let data = holder.new_section(".data", SectionFlags::WRITE, 8).unwrap();
        let label = holder.new_label();
        holder.bind_label(label, data).unwrap();
        holder.push_bytes(data, &[1, 2, 3, 4]).unwrap();
        // An abs64 placeholder in .text referring to the .data label.
        holder.push_bytes(text, &[0; 8]).unwrap();
        holder.use_label(text, 0, FixupKind::Abs64, label).unwrap();

        let image = holder.flatten(0x1000).unwrap();
        // .text is 8 bytes, .data starts at the next 8-byte boundary.
        assert_eq!(u64::from_le_bytes(image[0..8].try_into().unwrap()), 0x1008);
        assert_eq!(&image[8..12], &[1, 2, 3, 4]);
    }

    #[test]
    fn code_size_counts_alignment() {
        let mut holder = CodeHolder::new(Environment::x64());
        let text = holder.text_section();
        holder.push_bytes(text, &[0x90; 3]).unwrap();
        let data = holder.new_section(".rodata", SectionFlags::NONE, 16).unwrap();
        holder.push_bytes(data, &[0xff; 2]).unwrap();
        assert_eq!(holder.code_size(), 16 + 2);
    }
}
