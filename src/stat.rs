//! File metadata snapshots for the database file.

use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Point-in-time metadata of the database file.
///
/// Fields follow the classic `stat(2)` layout. On platforms without the Unix
/// metadata extensions, the device, inode, ownership and block fields are zero
/// and `mode`/`nlink` are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileStat {
   pub dev: u64,
   pub ino: u64,
   pub mode: u32,
   pub nlink: u64,
   pub uid: u32,
   pub gid: u32,
   pub rdev: u64,
   /// File size in bytes.
   pub size: u64,
   /// Last access time, seconds since the Unix epoch.
   pub atime: i64,
   /// Last modification time, seconds since the Unix epoch.
   pub mtime: i64,
   /// Last status change time, seconds since the Unix epoch.
   pub ctime: i64,
   pub blksize: u64,
   pub blocks: u64,
}

impl FileStat {
   /// The thirteen fields in `stat(2)` order:
   /// dev, ino, mode, nlink, uid, gid, rdev, size, atime, mtime, ctime,
   /// blksize, blocks.
   pub fn to_array(&self) -> [i128; 13] {
      [
         self.dev.into(),
         self.ino.into(),
         self.mode.into(),
         self.nlink.into(),
         self.uid.into(),
         self.gid.into(),
         self.rdev.into(),
         self.size.into(),
         self.atime.into(),
         self.mtime.into(),
         self.ctime.into(),
         self.blksize.into(),
         self.blocks.into(),
      ]
   }
}

#[cfg(unix)]
impl From<&Metadata> for FileStat {
   fn from(meta: &Metadata) -> Self {
      use std::os::unix::fs::MetadataExt;

      Self {
         dev: meta.dev(),
         ino: meta.ino(),
         mode: meta.mode(),
         nlink: meta.nlink(),
         uid: meta.uid(),
         gid: meta.gid(),
         rdev: meta.rdev(),
         size: meta.size(),
         atime: meta.atime(),
         mtime: meta.mtime(),
         ctime: meta.ctime(),
         blksize: meta.blksize(),
         blocks: meta.blocks(),
      }
   }
}

#[cfg(not(unix))]
impl From<&Metadata> for FileStat {
   fn from(meta: &Metadata) -> Self {
      let mode = if meta.permissions().readonly() {
         0o100444
      } else {
         0o100644
      };

      Self {
         dev: 0,
         ino: 0,
         mode,
         nlink: 1,
         uid: 0,
         gid: 0,
         rdev: 0,
         size: meta.len(),
         atime: unix_seconds(meta.accessed().ok()),
         mtime: unix_seconds(meta.modified().ok()),
         ctime: unix_seconds(meta.created().ok()),
         blksize: 0,
         blocks: 0,
      }
   }
}

/// Seconds since the Unix epoch, negative for earlier times, zero if unknown.
#[cfg_attr(unix, allow(dead_code))]
fn unix_seconds(time: Option<SystemTime>) -> i64 {
   match time.map(|t| t.duration_since(UNIX_EPOCH)) {
      Some(Ok(after)) => after.as_secs() as i64,
      Some(Err(before)) => -(before.duration().as_secs() as i64),
      None => 0,
   }
}
