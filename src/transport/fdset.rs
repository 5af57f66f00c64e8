//! Descriptor readiness set for `select(2)`, stored as 64-bit words.

use std::io;
use std::os::unix::io::RawFd;

/// Highest descriptor count `select` can watch
pub const FD_SETSIZE: usize = 1024;

const WORD_BITS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdSet {
    bits: [u64; FD_SETSIZE / WORD_BITS],
}

impl Default for FdSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FdSet {
    pub fn new() -> Self {
        Self { bits: [0; FD_SETSIZE / WORD_BITS] }
    }

    pub fn insert(&mut self, fd: RawFd) -> io::Result<()> {
        let (word, mask) = Self::locate(fd)?;
        self.bits[word] |= mask;
        Ok(())
    }

    pub fn remove(&mut self, fd: RawFd) {
        if let Ok((word, mask)) = Self::locate(fd) {
            self.bits[word] &= !mask;
        }
    }

    pub fn contains(&self, fd: RawFd) -> bool {
        Self::locate(fd).map_or(false, |(word, mask)| self.bits[word] & mask != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// One past the highest member, the `nfds` argument of `select`
    pub fn nfds(&self) -> RawFd {
        self.iter().last().map_or(0, |fd| fd + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = RawFd> + '_ {
        (0..FD_SETSIZE as RawFd).filter(move |fd| self.contains(*fd))
    }

    /// Copy into the platform `fd_set` layout
    pub fn to_libc(&self) -> libc::fd_set {
        // SAFETY: fd_set is plain data; FD_ZERO then initialises it fully.
        let mut raw: libc::fd_set = unsafe { std::mem::zeroed() };
        unsafe { libc::FD_ZERO(&mut raw) };
        for fd in self.iter() {
            // SAFETY: every member is below FD_SETSIZE.
            unsafe { libc::FD_SET(fd, &mut raw) };
        }
        raw
    }

    /// Keep only the members that are also set in `raw`
    pub fn retain_from_libc(&mut self, raw: &libc::fd_set) {
        let members: Vec<RawFd> = self.iter().collect();
        for fd in members {
            // SAFETY: fd is below FD_SETSIZE and raw is initialised.
            if !unsafe { libc::FD_ISSET(fd, raw) } {
                self.remove(fd);
            }
        }
    }

    fn locate(fd: RawFd) -> io::Result<(usize, u64)> {
        if fd < 0 || fd as usize >= FD_SETSIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("descriptor {} outside select range", fd),
            ));
        }
        let fd = fd as usize;
        Ok((fd / WORD_BITS, 1u64 << (fd % WORD_BITS)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_contains_remove() {
        let mut set = FdSet::new();
        assert!(set.is_empty());

        set.insert(3).unwrap();
        set.insert(64).unwrap();
        set.insert(1023).unwrap();
        assert!(set.contains(3));
        assert!(set.contains(64));
        assert!(!set.contains(65));
        assert_eq!(set.nfds(), 1024);

        set.remove(1023);
        assert_eq!(set.nfds(), 65);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 64]);
    }

    #[test]
    fn test_word_layout() {
        let mut set = FdSet::new();
        set.insert(70).unwrap();
        assert_eq!(set.bits[1], 1 << 6);
    }

    #[test]
    fn test_out_of_range_descriptors() {
        let mut set = FdSet::new();
        assert!(set.insert(-1).is_err());
        assert!(set.insert(FD_SETSIZE as RawFd).is_err());
        assert!(!set.contains(-1));
    }

    #[test]
    fn test_libc_round_trip() {
        let mut set = FdSet::new();
        set.insert(5).unwrap();
        set.insert(200).unwrap();
        let raw = set.to_libc();

        let mut probe = FdSet::new();
        probe.insert(5).unwrap();
        probe.insert(6).unwrap();
        probe.insert(200).unwrap();
        probe.retain_from_libc(&raw);
        assert_eq!(probe, set);
    }
}
