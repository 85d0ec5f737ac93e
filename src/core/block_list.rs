//! Ordered block list
//!
//! A singly-linked list of descriptors, each referencing one block's payload
//! address. The same structure backs both the free list and the allocated
//! list of the [`Allocator`](crate::core::allocator::Allocator).
//!
//! Nodes live in a slot vector and are linked by index, so a [`Descriptor`]
//! is a cheap copyable handle. Descriptors never store a block size: sizes are
//! always read from the block header in the [`Arena`].
//!
//! Sorting relinks nodes rather than exchanging the addresses they hold, so a
//! descriptor keeps referencing the same block across any sort.

use crate::core::arena::{Arena, BlockAddr};
use crate::core::error::{AllocError, Result};

/// Handle to a node of a [`BlockList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor(usize);

/// Direction for size-ordered sorts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
struct Node {
    addr: BlockAddr,
    next: Option<usize>,
    linked: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BlockList {
    slots: Vec<Option<Node>>,
    vacant: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached descriptor referencing `addr`
    ///
    /// Returns `None` only when descriptor storage cannot grow.
    pub fn create(&mut self, addr: BlockAddr) -> Option<Descriptor> {
        let node = Node {
            addr,
            next: None,
            linked: false,
        };

        if let Some(slot) = self.vacant.pop() {
            self.slots[slot] = Some(node);
            return Some(Descriptor(slot));
        }

        self.slots.try_reserve(1).ok()?;
        self.slots.push(Some(node));
        Some(Descriptor(self.slots.len() - 1))
    }

    fn node(&self, desc: Descriptor) -> Result<&Node> {
        self.slots
            .get(desc.0)
            .and_then(Option::as_ref)
            .ok_or(AllocError::InvalidDescriptor)
    }

    fn node_mut(&mut self, desc: Descriptor) -> Result<&mut Node> {
        self.slots
            .get_mut(desc.0)
            .and_then(Option::as_mut)
            .ok_or(AllocError::InvalidDescriptor)
    }

    fn detached(&mut self, desc: Descriptor) -> Result<&mut Node> {
        let node = self.node_mut(desc)?;
        if node.linked {
            return Err(AllocError::InvalidDescriptor);
        }
        Ok(node)
    }

    /// Link a detached descriptor in front of the list; `None` is a no-op
    pub fn insert_head(&mut self, desc: Option<Descriptor>) -> Result<()> {
        let Some(desc) = desc else { return Ok(()) };

        let head = self.head;
        let node = self.detached(desc)?;
        node.next = head;
        node.linked = true;

        self.head = Some(desc.0);
        if self.tail.is_none() {
            self.tail = Some(desc.0);
        }
        self.len += 1;
        Ok(())
    }

    /// Link a detached descriptor after the last node; `None` is a no-op
    pub fn insert_tail(&mut self, desc: Option<Descriptor>) -> Result<()> {
        let Some(desc) = desc else { return Ok(()) };

        let node = self.detached(desc)?;
        node.next = None;
        node.linked = true;

        match self.tail {
            Some(tail) => self.node_mut(Descriptor(tail))?.next = Some(desc.0),
            None => self.head = Some(desc.0),
        }
        self.tail = Some(desc.0);
        self.len += 1;
        Ok(())
    }

    /// Create a descriptor for `addr` and append it
    pub fn push_back(&mut self, addr: BlockAddr) -> Result<Descriptor> {
        let desc = self.create(addr).ok_or(AllocError::DescriptorExhausted)?;
        self.insert_tail(Some(desc))?;
        Ok(desc)
    }

    /// Number of linked descriptors
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<Descriptor> {
        self.head.map(Descriptor)
    }

    pub fn next(&self, desc: Descriptor) -> Option<Descriptor> {
        self.node(desc).ok()?.next.map(Descriptor)
    }

    pub fn address(&self, desc: Descriptor) -> Result<BlockAddr> {
        Ok(self.node(desc)?.addr)
    }

    /// Point an existing descriptor at another block
    pub fn set_address(&mut self, desc: Descriptor, addr: BlockAddr) -> Result<()> {
        self.node_mut(desc)?.addr = addr;
        Ok(())
    }

    /// First descriptor referencing `addr`
    pub fn find(&self, addr: BlockAddr) -> Option<Descriptor> {
        self.iter().find(|&(_, a)| a == addr).map(|(d, _)| d)
    }

    /// Unlink `desc` and release its storage, returning the address it held
    ///
    /// `desc` must currently be linked into this list; anything else is
    /// rejected with [`AllocError::InvalidDescriptor`] and leaves the list
    /// untouched.
    pub fn delete(&mut self, desc: Descriptor) -> Result<BlockAddr> {
        let mut prev: Option<usize> = None;
        let mut cursor = self.head;

        while let Some(idx) = cursor {
            if idx == desc.0 {
                break;
            }
            prev = Some(idx);
            cursor = self.node(Descriptor(idx))?.next;
        }

        if cursor != Some(desc.0) {
            return Err(AllocError::InvalidDescriptor);
        }

        let node = self.slots[desc.0].take().ok_or(AllocError::InvalidDescriptor)?;
        match prev {
            Some(p) => self.node_mut(Descriptor(p))?.next = node.next,
            None => self.head = node.next,
        }
        if self.tail == Some(desc.0) {
            self.tail = prev;
        }

        self.vacant.push(desc.0);
        self.len -= 1;
        Ok(node.addr)
    }

    /// Drop every descriptor
    pub fn clear(&mut self) {
        self.slots.clear();
        self.vacant.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Addresses in list order
    pub fn addresses(&self) -> Vec<BlockAddr> {
        self.iter().map(|(_, addr)| addr).collect()
    }

    /// Sort ascending by block address
    pub fn sort_by_address(&mut self) {
        let mut order: Vec<(BlockAddr, usize)> = self.iter().map(|(d, a)| (a, d.0)).collect();
        order.sort_by_key(|&(addr, _)| addr);
        self.relink(order.into_iter().map(|(_, idx)| idx));
    }

    /// Sort by the size recorded in each block's header
    ///
    /// The sort is stable: blocks of equal size keep their relative order.
    pub fn sort_by_size(&mut self, arena: &Arena, order: SizeOrder) -> Result<()> {
        let mut keyed = self
            .iter()
            .map(|(d, a)| arena.read_header(a).map(|size| (size, d.0)))
            .collect::<Result<Vec<_>>>()?;

        match order {
            SizeOrder::Ascending => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
            SizeOrder::Descending => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
        }

        self.relink(keyed.into_iter().map(|(_, idx)| idx));
        Ok(())
    }

    fn relink(&mut self, order: impl Iterator<Item = usize>) {
        let mut prev: Option<usize> = None;
        self.head = None;

        for idx in order {
            if let Some(node) = self.slots[idx].as_mut() {
                node.next = None;
            }
            match prev {
                Some(p) => {
                    if let Some(node) = self.slots[p].as_mut() {
                        node.next = Some(idx);
                    }
                }
                None => self.head = Some(idx),
            }
            prev = Some(idx);
        }

        self.tail = prev;
    }
}

/// Iterator over `(descriptor, address)` pairs in list order
pub struct Iter<'a> {
    list: &'a BlockList,
    cursor: Option<usize>,
}

impl Iterator for Iter<'_> {
    type Item = (Descriptor, BlockAddr);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = self.list.slots.get(idx)?.as_ref()?;
        self.cursor = node.next;
        Some((Descriptor(idx), node.addr))
    }
}
