// driver.rs
//!
//! The traversal driver: a stateful cursor over a filesystem forest built
//! on top of `walkdir`. `walkdir` gives pre-order iteration, a
//! `skip_current_dir` directive, and an all-or-nothing `follow_links`
//! flag, but no per-entry "follow just this symlink" steering and no
//! cycle bookkeeping of its own when links aren't followed. This module
//! adds both, the way the underlying OVAL probe's C driver does: physical
//! traversal by default, with entries directed to `Skip` or `Follow`
//! after the fact, and ancestor-chain (device, inode) tracking to detect
//! cycles introduced by following a symlink back into its own ancestry.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::WalkerError;

/// Mirrors the driver's `info` tag vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Pre-order visit of a directory.
    Dir,
    /// Symbolic link, target not yet followed.
    Symlink,
    /// Symlink whose target does not exist.
    DanglingSymlink,
    /// Regular file or other non-directory, non-symlink.
    File,
}

/// One step of the driver.
#[derive(Debug, Clone)]
pub struct DriverEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub depth: usize,
    #[cfg(unix)]
    pub dev: Option<u64>,
    #[cfg(unix)]
    pub ino: Option<u64>,
}

impl DriverEntry {
    pub fn file_name(&self) -> Option<&std::ffi::OsStr> {
        self.path.file_name()
    }
}

/// Directive the facade attaches to the entry just produced, consumed by
/// the driver before it advances again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Do not descend into this directory (no-op for non-directories).
    Skip,
    /// Follow this symlink: the next step re-visits the same path,
    /// reclassified as the resolved target's kind.
    Follow,
}

struct AncestorFrame {
    depth: usize,
    dev: u64,
    ino: u64,
}

/// One active traversal frame. Most walks have exactly one (the physical
/// walk of the starting root); following a symlink pushes a second frame
/// rooted at the link's own path so its children are reported under that
/// path rather than under the (possibly unrelated) canonical target path.
struct Frame {
    inner: walkdir::IntoIter,
}

pub struct Driver {
    frames: Vec<Frame>,
    xdev: bool,
    ancestors: Vec<AncestorFrame>,
    seen_dirs: HashSet<(u64, u64)>,
    pending_follow: Option<(PathBuf, usize)>,
    pending_skip: bool,
}

impl Driver {
    /// `xdev`: when true, each constructed walk frame is pinned to its own
    /// root's device and will not cross mount points — selected when
    /// `recurse_file_system = defined`.
    pub fn new(roots: &[PathBuf], xdev: bool) -> Result<Self, WalkerError> {
        let mut frames = Vec::with_capacity(roots.len());
        for root in roots {
            frames.push(Self::build_frame(root, xdev)?);
        }
        // Walk roots in reverse so popping from the end visits them in the
        // caller-supplied order.
        frames.reverse();
        Ok(Self {
            frames,
            xdev,
            ancestors: Vec::new(),
            seen_dirs: HashSet::new(),
            pending_follow: None,
            pending_skip: false,
        })
    }

    fn build_frame(root: &Path, xdev: bool) -> Result<Frame, WalkerError> {
        let root = crate::windows::ensure_long_path_prefix(root);
        let walk = WalkDir::new(root)
            .follow_links(false)
            .same_file_system(xdev);
        Ok(Frame {
            inner: walk.into_iter(),
        })
    }

    /// Directs the driver's handling of the entry just returned by
    /// [`Driver::next_entry`]. `Skip` and `Follow` are mutually exclusive
    /// for a given entry: whichever is issued last wins, clearing the
    /// other, so a caller that conditionally downgrades an earlier
    /// `Follow` to `Skip` (e.g. a local-filesystem restriction rejecting
    /// the symlink's target device) cannot have the stale `Follow` win
    /// the race, and a cleared directive cannot leak into a later,
    /// unrelated entry.
    pub fn direct(&mut self, directive: Directive, entry: &DriverEntry) {
        match directive {
            Directive::Skip => {
                self.pending_skip = true;
                self.pending_follow = None;
            }
            Directive::Follow => {
                self.pending_follow = Some((entry.path.clone(), entry.depth));
                self.pending_skip = false;
            }
        }
    }

    /// Produces the next entry, applying any directive recorded via
    /// [`Driver::direct`] for the previously returned entry first. Returns
    /// `Ok(None)` at genuine end-of-forest.
    pub fn next_entry(&mut self) -> Result<Option<DriverEntry>, WalkerError> {
        if let Some((link_path, depth)) = self.pending_follow.take() {
            return self.follow(&link_path, depth);
        }
        if self.pending_skip {
            self.pending_skip = false;
            if let Some(frame) = self.frames.last_mut() {
                frame.inner.skip_current_dir();
            }
        }
        self.advance()
    }

    /// Splices a fresh walk rooted at `link_path` itself (not its
    /// canonicalized target) so the reclassified entry, and everything
    /// beneath it, is reported under the symlink's own path — matching
    /// the scenario where following `/d/link -> /e` yields children under
    /// `/d/link/...`, not `/e/...`.
    fn follow(&mut self, link_path: &Path, depth: usize) -> Result<Option<DriverEntry>, WalkerError> {
        let target_meta = match std::fs::metadata(link_path) {
            Ok(m) => m,
            Err(_) => {
                // Target vanished or is inaccessible between the initial
                // lstat and now; treat as a dangling link and move on.
                return self.advance();
            }
        };

        let kind = if target_meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };

        let entry = DriverEntry {
            path: link_path.to_path_buf(),
            kind,
            depth,
            #[cfg(unix)]
            dev: device_id(link_path),
            #[cfg(unix)]
            ino: inode(link_path),
        };

        if kind == EntryKind::Dir {
            let frame = Self::build_frame(link_path, self.xdev)?;
            self.frames.push(frame);
            self.push_ancestor(&entry);
        }

        Ok(Some(entry))
    }

    fn push_ancestor(&mut self, entry: &DriverEntry) {
        #[cfg(unix)]
        if let (Some(dev), Some(ino)) = (entry.dev, entry.ino) {
            self.truncate_ancestors(entry.depth);
            self.ancestors.push(AncestorFrame {
                depth: entry.depth,
                dev,
                ino,
            });
        }
        #[cfg(not(unix))]
        let _ = entry;
    }

    fn truncate_ancestors(&mut self, depth: usize) {
        while let Some(last) = self.ancestors.last() {
            if last.depth >= depth {
                self.ancestors.pop();
            } else {
                break;
            }
        }
    }

    #[cfg(unix)]
    fn is_cycle(&self, dev: u64, ino: u64) -> bool {
        self.ancestors.iter().any(|a| a.dev == dev && a.ino == ino)
    }

    #[cfg(not(unix))]
    fn is_cycle(&self, _dev: u64, _ino: u64) -> bool {
        false
    }

    fn advance(&mut self) -> Result<Option<DriverEntry>, WalkerError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(None);
            };

            let Some(walk_result) = frame.inner.next() else {
                self.frames.pop();
                continue;
            };

            let dir_entry = match walk_result {
                Ok(e) => e,
                Err(err) => return Err(WalkerError::Walkdir(err)),
            };

            let file_type = dir_entry.file_type();
            let depth = dir_entry.depth();
            let path = dir_entry.path().to_path_buf();

            if file_type.is_symlink() {
                let entry = DriverEntry {
                    path: path.clone(),
                    kind: if std::fs::metadata(&path).is_ok() {
                        EntryKind::Symlink
                    } else {
                        EntryKind::DanglingSymlink
                    },
                    depth,
                    #[cfg(unix)]
                    dev: device_id(&path),
                    #[cfg(unix)]
                    ino: inode(&path),
                };
                return Ok(Some(entry));
            }

            #[cfg(unix)]
            let (dev, ino) = (device_id(&path), inode(&path));

            if file_type.is_dir() {
                #[cfg(unix)]
                if let (Some(d), Some(i)) = (dev, ino) {
                    if self.is_cycle(d, i) {
                        log::warn!("directory cycle detected at {}", path.display());
                        self.frames.last_mut().unwrap().inner.skip_current_dir();
                        continue;
                    }
                }

                let entry = DriverEntry {
                    path,
                    kind: EntryKind::Dir,
                    depth,
                    #[cfg(unix)]
                    dev,
                    #[cfg(unix)]
                    ino,
                };
                self.push_ancestor(&entry);
                return Ok(Some(entry));
            }

            let entry = DriverEntry {
                path,
                kind: EntryKind::File,
                depth,
                #[cfg(unix)]
                dev,
                #[cfg(unix)]
                ino,
            };
            return Ok(Some(entry));
        }
    }
}

#[cfg(unix)]
fn device_id(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).ok().map(|m| m.dev())
}

#[cfg(unix)]
fn inode(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).ok().map(|m| m.ino())
}
