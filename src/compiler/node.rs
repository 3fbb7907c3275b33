//! The compiler's instruction stream: a doubly linked list of nodes backed
//! by an arena, so the register-allocation passes can insert spill and
//! reload instructions in place without shifting a vector.

use crate::asm::InstOptions;
use crate::inst::Mnemonic;
use crate::operand::{Label, Operand};
use smallvec::SmallVec;

pub(crate) const NIL: u32 = u32::MAX;

/// An instruction node, possibly still carrying virtual registers.
#[derive(Clone, Debug)]
pub(crate) struct InstNode {
    pub id: Mnemonic,
    pub ops: SmallVec<[Operand; 4]>,
    pub options: InstOptions,
}

/// A function call awaiting lowering: argument moves are inserted around it
/// and it doubles as the allocator's caller-saved eviction point.
#[derive(Clone, Debug)]
pub(crate) struct CallNode {
    pub target: Operand,
    pub args: SmallVec<[Operand; 6]>,
    /// Virtual register receiving the return value, if any.
    pub ret: Option<Operand>,
    /// System V variadic call: AL carries the vector-register count.
    pub vararg: bool,
}

#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Inst(InstNode),
    Label(Label),
    Align(u32),
    Data(Vec<u8>),
    Comment(String),
    FuncBegin,
    /// Function return carrying the value operand; the epilogue is
    /// synthesized here.
    Ret(Option<Operand>),
    Call(CallNode),
    FuncEnd,
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub prev: u32,
    pub next: u32,
    pub kind: NodeKind,
}

/// Arena-backed doubly linked node list.
#[derive(Debug)]
pub(crate) struct NodeList {
    nodes: Vec<NodeData>,
    head: u32,
    tail: u32,
}

impl Default for NodeList {
    fn default() -> NodeList {
        NodeList::new()
    }
}

impl NodeList {
    pub(crate) fn new() -> NodeList {
        NodeList { nodes: Vec::new(), head: NIL, tail: NIL }
    }

    pub(crate) fn get(&self, id: u32) -> &NodeData {
        &self.nodes[id as usize]
    }

    pub(crate) fn get_mut(&mut self, id: u32) -> &mut NodeData {
        &mut self.nodes[id as usize]
    }

    pub(crate) fn head(&self) -> u32 {
        self.head
    }

    fn alloc(&mut self, kind: NodeKind) -> u32 {
        let id = self.nodes.len();
        assert!(id < NIL as usize, "node arena exhausted");
        self.nodes.push(NodeData { prev: NIL, next: NIL, kind });
        #[allow(clippy::cast_possible_truncation)]
        {
            id as u32
        }
    }

    /// Append a node at the end of the list.
    pub(crate) fn push_back(&mut self, kind: NodeKind) -> u32 {
        let id = self.alloc(kind);
        if self.tail == NIL {
            self.head = id;
        } else {
            self.nodes[self.tail as usize].next = id;
            self.nodes[id as usize].prev = self.tail;
        }
        self.tail = id;
        id
    }

    /// Insert a node before `at`.
    pub(crate) fn insert_before(&mut self, at: u32, kind: NodeKind) -> u32 {
        let id = self.alloc(kind);
        let prev = self.nodes[at as usize].prev;
        self.nodes[id as usize].prev = prev;
        self.nodes[id as usize].next = at;
        self.nodes[at as usize].prev = id;
        if prev == NIL {
            self.head = id;
        } else {
            self.nodes[prev as usize].next = id;
        }
        id
    }

    /// Insert a node after `at`.
    pub(crate) fn insert_after(&mut self, at: u32, kind: NodeKind) -> u32 {
        let id = self.alloc(kind);
        let next = self.nodes[at as usize].next;
        self.nodes[id as usize].prev = at;
        self.nodes[id as usize].next = next;
        self.nodes[at as usize].next = id;
        if next == NIL {
            self.tail = id;
        } else {
            self.nodes[next as usize].prev = id;
        }
        id
    }

    /// Iterate node ids in list order. Nodes inserted before the current
    /// position during iteration are not revisited.
    pub(crate) fn ids(&self) -> NodeIds<'_> {
        NodeIds { list: self, cursor: self.head }
    }
}

pub(crate) struct NodeIds<'a> {
    list: &'a NodeList,
    cursor: u32,
}

impl Iterator for NodeIds<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.cursor == NIL {
            return None;
        }
        let id = self.cursor;
        self.cursor = self.list.get(id).next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(s: &str) -> NodeKind {
        NodeKind::Comment(s.to_string())
    }

    fn text(list: &NodeList) -> Vec<String> {
        list.ids()
            .map(|id| match &list.get(id).kind {
                NodeKind::Comment(s) => s.clone(),
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn insertion_preserves_links() {
        let mut list = NodeList::new();
        let a = list.push_back(comment("a"));
        let c = list.push_back(comment("c"));
        list.insert_before(c, comment("b"));
        list.insert_before(a, comment("start"));
        list.insert_after(c, comment("end"));
        assert_eq!(text(&list), ["start", "a", "b", "c", "end"]);
    }
}
