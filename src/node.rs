/*
 * This file is a part of chainht
 *
 * Copyright (c) 2026, the chainht authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! A single heap-allocated chain node, and the circular doubly-linked
//! chain built out of them.
//!
//! A node is born once, in [`prepend_new`], and never reallocated: `grow`
//! re-threads nodes between bucket arrays by relinking, not copying. The
//! chain is circular, so any node can serve as the "head" used to anchor
//! traversal -- the bucket array just holds one such reference per
//! bucket.

use std::ptr::{self, NonNull};

use crate::error::AllocHandler;
use crate::mem::{self, NodeLayout};

/// A comparator over two key byte slices of equal length; returns `true`
/// iff the keys are considered equal. Falls back to a raw memory compare
/// when absent.
pub type KeyCmp = dyn Fn(&[u8], &[u8]) -> bool + Send + Sync;
/// A destructor invoked on an element region immediately before the
/// node holding it is released.
pub type Destructor = dyn Fn(&mut [u8]) + Send + Sync;

#[repr(C)]
struct NodeHeader {
    next: NodePtr,
    prev: NodePtr,
}

/// Size and alignment of [`NodeHeader`], for callers computing a node's
/// overall layout (see [`crate::mem::NodeLayout::compute`]).
pub const HEADER_SIZE: usize = std::mem::size_of::<NodeHeader>();
pub const HEADER_ALIGN: usize = std::mem::align_of::<NodeHeader>();

/// A non-owning handle to a node. Equality is by address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NodePtr(NonNull<NodeHeader>);

/// The head of a circular chain. `None` is an empty chain.
pub type Head = Option<NodePtr>;

impl NodePtr {
    #[inline]
    unsafe fn header(self) -> *mut NodeHeader {
        self.0.as_ptr()
    }

    #[inline]
    unsafe fn next(self) -> NodePtr {
        (*self.header()).next
    }

    #[inline]
    unsafe fn prev(self) -> NodePtr {
        (*self.header()).prev
    }

    #[inline]
    unsafe fn set_next(self, n: NodePtr) {
        (*self.header()).next = n;
    }

    #[inline]
    unsafe fn set_prev(self, p: NodePtr) {
        (*self.header()).prev = p;
    }

    /// The node's key region, as a byte slice of length `key_size`.
    ///
    /// # Safety
    /// `layout`/`key_size` must match what the node was allocated with.
    #[inline]
    pub unsafe fn key<'a>(self, layout: &NodeLayout, key_size: usize) -> &'a [u8] {
        let p = (self.0.as_ptr() as *mut u8).add(layout.key_offset);
        std::slice::from_raw_parts(p, key_size)
    }

    /// The node's element region, as a byte slice of length `elt_size`.
    ///
    /// # Safety
    /// `layout`/`elt_size` must match what the node was allocated with.
    #[inline]
    pub unsafe fn elt<'a>(self, layout: &NodeLayout, elt_size: usize) -> &'a mut [u8] {
        let p = (self.0.as_ptr() as *mut u8).add(layout.elt_offset);
        std::slice::from_raw_parts_mut(p, elt_size)
    }

    /// Raw pointer to the element region, for callers that hand out
    /// longer-lived references (e.g. `search`'s return value).
    ///
    /// # Safety
    /// `layout` must match what the node was allocated with, and the
    /// returned pointer must not outlive the node.
    #[inline]
    pub unsafe fn elt_ptr(self, layout: &NodeLayout) -> *mut u8 {
        (self.0.as_ptr() as *mut u8).add(layout.elt_offset)
    }
}

/// Allocates a new node carrying `key`/`elt`, splices it in immediately
/// before `*head` (i.e. makes it the new head), and returns it.
///
/// # Safety
/// `key.len()`/`elt.len()` must equal the key/elt sizes `layout` was
/// computed with.
pub unsafe fn prepend_new(
    head: &mut Head,
    key: &[u8],
    elt: &[u8],
    layout: &NodeLayout,
    handler: &dyn AllocHandler,
) -> NodePtr {
    let raw = mem::alloc_layout(layout.layout, handler);
    let node = NodePtr(NonNull::new_unchecked(raw as *mut NodeHeader));
    ptr::copy_nonoverlapping(key.as_ptr(), raw.add(layout.key_offset), key.len());
    ptr::copy_nonoverlapping(elt.as_ptr(), raw.add(layout.elt_offset), elt.len());
    prepend(head, node);
    node
}

/// Splices an already-allocated node in immediately before `*head`.
pub unsafe fn prepend(head: &mut Head, node: NodePtr) {
    match *head {
        None => {
            node.set_next(node);
            node.set_prev(node);
        }
        Some(h) => {
            node.set_next(h);
            node.set_prev(h.prev());
            h.prev().set_next(node);
            h.set_prev(node);
        }
    }
    *head = Some(node);
}

/// Allocates a new node carrying `key`/`elt` and splices it into the
/// chain rooted at `head`, then advances `*head` by one (spec.md
/// §4.3: "prepend then advance `*h` by one"). Net effect: the new node
/// ends up last in traversal order starting from the (unchanged) head
/// reference, rather than first as with [`prepend_new`].
///
/// # Safety
/// `key.len()`/`elt.len()` must equal the key/elt sizes `layout` was
/// computed with.
pub unsafe fn append_new(
    head: &mut Head,
    key: &[u8],
    elt: &[u8],
    layout: &NodeLayout,
    handler: &dyn AllocHandler,
) -> NodePtr {
    let node = prepend_new(head, key, elt, layout, handler);
    if let Some(h) = *head {
        *head = Some(h.next());
    }
    node
}

/// Returns the first node reachable from `head` (inclusive, scanning
/// clockwise) whose key region compares equal to `key` under `cmp`
/// (byte-exact comparison if `cmp` is absent), or `None`.
///
/// # Safety
/// `key.len()` must equal the key size `layout` was computed with.
pub unsafe fn search_key(
    head: Head,
    key: &[u8],
    layout: &NodeLayout,
    key_size: usize,
    cmp: Option<&KeyCmp>,
) -> Option<NodePtr> {
    let Some(start) = head else {
        return None;
    };
    let equal = |n: NodePtr| {
        let nk = n.key(layout, key_size);
        match cmp {
            Some(f) => f(nk, key),
            None => nk == key,
        }
    };
    if equal(start) {
        return Some(start);
    }
    let mut node = start.next();
    while node != start {
        if equal(node) {
            return Some(node);
        }
        node = node.next();
    }
    None
}

/// Unlinks `node` from the chain rooted at `head` without freeing it.
///
/// # Safety
/// `node` must be a live node currently reachable from `*head`.
pub unsafe fn remove(head: &mut Head, node: NodePtr) {
    if node.next() == node {
        *head = None;
        return;
    }
    node.next().set_prev(node.prev());
    node.prev().set_next(node.next());
    if *head == Some(node) {
        *head = Some(node.next());
    }
}

/// Unlinks and frees `node`, invoking `free_elt` on its element region
/// first if supplied.
///
/// # Safety
/// `node` must be a live node currently reachable from `*head`, and
/// `layout` must match what it was allocated with.
pub unsafe fn delete(head: &mut Head, node: NodePtr, layout: &NodeLayout, free_elt: Option<&Destructor>) {
    if let Some(f) = free_elt {
        f(node.elt(layout, layout.elt_size));
    }
    remove(head, node);
    mem::dealloc_layout(node.header() as *mut u8, layout.layout);
}

/// Walks every node in the chain rooted at `head`, invoking `visit` on
/// each exactly once, and leaves `*head` empty. Unlike [`free_all`],
/// nodes are not freed -- `visit` is expected to relink each one
/// elsewhere (see `crate::grow`), which is why it is handed the node
/// before its own links are disturbed.
///
/// # Safety
/// `head` must root a valid chain, and `visit` must not free `node` nor
/// leave it in a chain inconsistent with whatever `visit` relinks it
/// into.
pub unsafe fn drain_chain(head: &mut Head, mut visit: impl FnMut(NodePtr)) {
    let Some(start) = *head else {
        return;
    };
    let mut node = start;
    loop {
        let next = node.next();
        visit(node);
        if next == node || next == start {
            break;
        }
        node = next;
    }
    *head = None;
}

/// Frees every node in the chain rooted at `head`, leaving it empty.
///
/// # Safety
/// `layout` must match what every reachable node was allocated with.
pub unsafe fn free_all(head: &mut Head, layout: &NodeLayout, free_elt: Option<&Destructor>) {
    let Some(start) = *head else {
        return;
    };
    let mut node = start;
    loop {
        let next = node.next();
        if let Some(f) = free_elt {
            f(node.elt(layout, layout.elt_size));
        }
        mem::dealloc_layout(node.header() as *mut u8, layout.layout);
        if next == node || next == start {
            break;
        }
        node = next;
    }
    *head = None;
}

// SAFETY: NodePtr is a plain address; sending it across threads is sound
// as long as access to the pointee is externally synchronized, which the
// table's locking discipline guarantees.
unsafe impl Send for NodePtr {}
unsafe impl Sync for NodePtr {}
