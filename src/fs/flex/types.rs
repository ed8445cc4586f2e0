use std::fmt;
use chrono::NaiveDate;
use super::super::DiskStruct;

/// Sector payload once the 4-byte header is accounted for.
pub const SEC_DATA: usize = 252;
/// First directory sector is always track 0 sector 5, i.e. block 4.
pub const FIRST_DIR_BLOCK: usize = 4;
/// Hard ceiling on directory entries; chains beyond it are truncated
/// with a warning.
pub const MAX_DIR_ENTRIES: usize = 2560;
/// Payload prefix marking a random access file on the host side.
pub const RANDOM_MAGIC: &[u8;12] = b"#FLEX##RAND#";

/// byte offsets of the SIR fields within block 2
pub mod sir_off {
    pub const LABEL: usize = 0x10;
    pub const VOLNUM: usize = 0x1B;
    pub const FREE_HEAD: usize = 0x1D;
    pub const FREE_TAIL: usize = 0x1F;
    pub const FREE_COUNT: usize = 0x21;
    pub const DATE: usize = 0x23;
    pub const LAST_TRACK: usize = 0x26;
    pub const SEC_PER_TRACK: usize = 0x27;
}

/// Enumerates FLEX file system errors.
#[derive(thiserror::Error,Debug,PartialEq)]
pub enum Error {
    #[error("not a FLEX disk image: probably {0}")]
    NotFlex(ForeignKind),
    #[error("SIR corrupted or not a FLEX image")]
    SirCorrupt,
    #[error("sector address out of bounds")]
    SectorAccess,
    #[error("file not found")]
    FileNotFound,
    #[error("file exists")]
    FileExists,
    #[error("not enough space on disk")]
    DiskFull,
    #[error("no more directory entry available")]
    DirectoryFull,
    #[error("name not valid")]
    BadName,
    #[error("disk has unresolved errors")]
    DamagedDisk,
    #[error("unusual geometry")]
    UnusualGeometry
}

/// Foreign disk formats that are identified, and refused, during the
/// FLEX test.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ForeignKind {
    Os9,
    UniFlex,
    Fdos,
    Unknown
}

impl fmt::Display for ForeignKind {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Os9 => write!(f,"an OS-9 disk"),
            Self::UniFlex => write!(f,"an UniFLEX disk"),
            Self::Fdos => write!(f,"a SWTPC 6800 FDOS disk (35 tracks of 10 sectors)"),
            Self::Unknown => write!(f,"an unknown disk image type")
        }
    }
}

/// A track/sector pair as stored in sector links and directory entries.
/// `(0,0)` is the null link terminating every chain.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct Ts {
    pub track: u8,
    pub sector: u8
}

impl Ts {
    pub const NONE: Ts = Ts { track: 0, sector: 0 };
    pub fn new(track: u8,sector: u8) -> Self {
        Self { track, sector }
    }
    pub fn is_none(&self) -> bool {
        self.track==0 && self.sector==0
    }
}

impl From<[u8;2]> for Ts {
    fn from(bytes: [u8;2]) -> Self {
        Self { track: bytes[0], sector: bytes[1] }
    }
}

impl fmt::Display for Ts {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{:02x}/{:02x}",self.track,self.sector)
    }
}

bitflags::bitflags! {
    /// Per-file state accumulated by the parser.
    #[derive(Debug,Clone,Copy,PartialEq,Eq,Default)]
    pub struct FileFlags: u8 {
        const DELETED = 0x01;
        const RANDOM = 0x02;
        const BAD_NAME = 0x04;
        const RECOVERABLE = 0x20;
        const UNUSABLE = 0x40;
        const CORRUPTED = 0x80;
    }
}

/// One directory slot as seen by the parser, live or deleted.
#[derive(Clone)]
pub struct FileRecord {
    pub name: String,
    pub date: NaiveDate,
    pub start: Ts,
    pub end: Ts,
    pub length: usize,
    pub flags: FileFlags,
    /// byte offset of the 24-byte directory entry within the image
    pub entry_offset: usize
}

impl FileRecord {
    /// excluded from ordinary listings and extraction
    pub fn is_unusable(&self) -> bool {
        self.flags.intersects(FileFlags::CORRUPTED | FileFlags::DELETED)
    }
}

/// Owner of a physical sector in the ownership map.  After a parse every
/// block has exactly one of these.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Owner {
    /// belongs to neither a file, the directory, nor the free list
    Unclaimed,
    /// one of the reserved blocks 0..4 (boot pair, SIR, spare)
    Boot,
    Directory,
    Free,
    /// index into the session's file records
    File(usize)
}

impl fmt::Display for Owner {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclaimed => write!(f,"unclaimed"),
            Self::Boot => write!(f,"reserved"),
            Self::Directory => write!(f,"directory space"),
            Self::Free => write!(f,"freelist"),
            Self::File(i) => write!(f,"file {}",i)
        }
    }
}

/// Structured form of the System Information Record in block 2.
pub struct Sir {
    pub label: [u8;11],
    pub volnum: u16,
    pub free_head: Ts,
    pub free_tail: Ts,
    pub free_count: u16,
    pub month: u8,
    pub day: u8,
    pub year: u8,
    pub last_track: u8,
    pub sec_per_track: u8
}

impl Sir {
    /// Write only the SIR fields into an existing sector buffer, leaving
    /// the remaining bytes alone.
    pub fn store(&self,sec: &mut [u8]) {
        sec[sir_off::LABEL..sir_off::LABEL+11].copy_from_slice(&self.label);
        sec[sir_off::VOLNUM..sir_off::VOLNUM+2].copy_from_slice(&u16::to_be_bytes(self.volnum));
        sec[sir_off::FREE_HEAD] = self.free_head.track;
        sec[sir_off::FREE_HEAD+1] = self.free_head.sector;
        sec[sir_off::FREE_TAIL] = self.free_tail.track;
        sec[sir_off::FREE_TAIL+1] = self.free_tail.sector;
        sec[sir_off::FREE_COUNT..sir_off::FREE_COUNT+2].copy_from_slice(&u16::to_be_bytes(self.free_count));
        sec[sir_off::DATE] = self.month;
        sec[sir_off::DATE+1] = self.day;
        sec[sir_off::DATE+2] = self.year;
        sec[sir_off::LAST_TRACK] = self.last_track;
        sec[sir_off::SEC_PER_TRACK] = self.sec_per_track;
    }
    /// Creation date with the 1975 pivot applied.
    pub fn date(&self) -> NaiveDate {
        entry_date(self.month,self.day,self.year)
    }
}

impl DiskStruct for Sir {
    fn new() -> Self {
        Self {
            label: [b' ';11],
            volnum: 0,
            free_head: Ts::NONE,
            free_tail: Ts::NONE,
            free_count: 0,
            month: 1,
            day: 1,
            year: 0,
            last_track: 0,
            sec_per_track: 0
        }
    }
    fn from_bytes(dat: &[u8]) -> Self {
        let mut label = [0u8;11];
        label.copy_from_slice(&dat[sir_off::LABEL..sir_off::LABEL+11]);
        Self {
            label,
            volnum: u16::from_be_bytes([dat[sir_off::VOLNUM],dat[sir_off::VOLNUM+1]]),
            free_head: Ts::new(dat[sir_off::FREE_HEAD],dat[sir_off::FREE_HEAD+1]),
            free_tail: Ts::new(dat[sir_off::FREE_TAIL],dat[sir_off::FREE_TAIL+1]),
            free_count: u16::from_be_bytes([dat[sir_off::FREE_COUNT],dat[sir_off::FREE_COUNT+1]]),
            month: dat[sir_off::DATE],
            day: dat[sir_off::DATE+1],
            year: dat[sir_off::DATE+2],
            last_track: dat[sir_off::LAST_TRACK],
            sec_per_track: dat[sir_off::SEC_PER_TRACK]
        }
    }
    fn to_bytes(&self) -> Vec<u8> {
        let mut ans = vec![0;crate::img::SECTOR_SIZE];
        self.store(&mut ans);
        ans
    }
    fn len(&self) -> usize {
        crate::img::SECTOR_SIZE
    }
}

/// Directory entry dates pivot at 1975: stored years above 75 are 19xx,
/// the rest are 20xx.
pub fn entry_date(month: u8,day: u8,year: u8) -> NaiveDate {
    let y = match year {
        y if y > 75 => 1900 + y as i32,
        y => 2000 + y as i32
    };
    let m = match month {
        m if m >= 1 && m <= 12 => m as u32,
        _ => 1
    };
    let d = match day {
        d if d >= 1 && d <= 31 => d as u32,
        _ => 1
    };
    match NaiveDate::from_ymd_opt(y,m,d) {
        Some(date) => date,
        None => NaiveDate::from_ymd_opt(y,m,1).expect("bad pivot date")
    }
}

/// Disk geometry inferred from the image size and the SIR, since the
/// image itself carries no track-0 metadata.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct Geometry {
    /// highest track number, tracks run 0..=nbtrk
    pub nbtrk: usize,
    /// sectors per track on tracks 1..=nbtrk
    pub nbsec: usize,
    /// sectors on track 0
    pub track0len: usize,
    /// sector count of a trailing incomplete track, if any
    pub short_last: Option<usize>,
    /// geometry had to be guessed beyond the standard layouts
    pub unusual: bool,
    nb_sectors: usize
}

impl Geometry {
    /// Guess the geometry from the physical sector count and the declared
    /// highest track/sector.  Always succeeds; unusual layouts are taken
    /// with `unusual` set so writers can refuse them.
    pub fn resolve(nb_sectors: usize,last_track: u8,sec_per_track: u8) -> Self {
        let nbtrk = last_track as usize;
        let nbsec = sec_per_track as usize;
        if (nbtrk+1) * nbsec == nb_sectors {
            // single density, or DD with a DD track 0, same thing here
            return Self { nbtrk, nbsec, track0len: nbsec, short_last: None, unusual: false, nb_sectors };
        }
        let rest = nb_sectors as isize - (nbtrk * nbsec) as isize;
        if rest > 0 {
            let track0len = rest as usize;
            if (nbsec >= 36 && track0len == 20) || (nbsec == 18 && track0len == 10)
                || track0len == nbsec/2
                || (track0len > nbsec/2 && track0len < nbsec) {
                return Self { nbtrk, nbsec, track0len, short_last: None, unusual: false, nb_sectors };
            }
            if track0len > nbsec {
                // can happen when disks are in EEPROM: keep a normal track 0
                // and count the remainder as an incomplete extra track
                let nbtrk = nbtrk + 1;
                let short = nb_sectors - (nbtrk-1)*nbsec - nbsec;
                return Self { nbtrk, nbsec, track0len: nbsec, short_last: Some(short), unusual: true, nb_sectors };
            }
        }
        // image too small for the declared geometry, reduce the track count
        // and try the highest probability track 0
        let cut = ((nbtrk as isize * nbsec as isize - nb_sectors as isize) / nbsec as isize + 1).max(0) as usize;
        let nbtrk = nbtrk.saturating_sub(cut);
        let track0len = match nbsec {
            s if s < 25 => s,
            _ => nb_sectors - nbtrk*nbsec
        };
        Self { nbtrk, nbsec, track0len, short_last: None, unusual: true, nb_sectors }
    }
    pub fn num_blocks(&self) -> usize {
        self.nb_sectors
    }
    /// Map a track/sector pair to a block, `(0,0)` being the boot block.
    /// Out of range pairs are an error, never clamped.
    pub fn ts_to_block(&self,ts: Ts) -> Result<usize,Error> {
        let (t,s) = (ts.track as usize,ts.sector as usize);
        let block = match (t,s) {
            (0,0) => 0,
            (0,s) if s <= self.track0len => s - 1,
            (t,s) if t >= 1 && t <= self.nbtrk && s >= 1 && s <= self.nbsec => {
                self.track0len + (t-1)*self.nbsec + s - 1
            },
            _ => return Err(Error::SectorAccess)
        };
        match block < self.nb_sectors {
            true => Ok(block),
            false => Err(Error::SectorAccess)
        }
    }
    pub fn block_to_ts(&self,block: usize) -> Ts {
        if block < self.track0len {
            return Ts::new(0,(block+1) as u8);
        }
        let t = (block - self.track0len) / self.nbsec + 1;
        let s = (block - self.track0len) % self.nbsec + 1;
        Ts::new(t as u8,s as u8)
    }
    pub fn describe(&self) -> String {
        if self.track0len == self.nbsec && self.short_last.is_none() {
            return format!("single density, {} tracks of {} sectors",self.nbtrk+1,self.nbsec);
        }
        match self.short_last {
            Some(short) => format!("{} tracks of {} sectors, track 0 of {} sectors, incomplete last track of {} sectors",
                self.nbtrk+1,self.nbsec,self.track0len,short),
            None => format!("double density, {} tracks of {} sectors, single density track 0 of {} sectors",
                self.nbtrk+1,self.nbsec,self.track0len)
        }
    }
}

/// Probe for the disk formats FLEX images are commonly mistaken for.
/// Called once the label or the SIR geometry fields have failed.
pub fn classify_foreign(dat: &[u8],nb_sectors: usize) -> ForeignKind {
    // OS-9 stores the sector count as a 24 bit integer up front
    let os9 = ((dat[0] as usize)*256 + dat[1] as usize)*256 + dat[2] as usize;
    if os9 == nb_sectors {
        return ForeignKind::Os9;
    }
    // UniFLEX volume size, doubled because of its 512 byte sectors
    let uni = ((dat[0x212] as usize)*256 + dat[0x213] as usize + dat[0x23F] as usize)*256
        + dat[0x214] as usize + dat[0x240] as usize + 1;
    if uni * 2 == nb_sectors {
        return ForeignKind::UniFlex;
    }
    if dat.len() == 89600 && &dat[0x1400..0x1404] == b"$DOS" {
        return ForeignKind::Fdos;
    }
    ForeignKind::Unknown
}

/// Every anomaly the validator can report, with a fixed severity.
#[derive(thiserror::Error,Debug,Clone,PartialEq,Eq)]
pub enum Finding {
    #[error("sector link out of bounds [{0}] in freelist")]
    FreelistOutOfBounds(Ts),
    #[error("sector [{0}] {1} times in freelist")]
    FreelistDuplicate(Ts,usize),
    #[error("bad free sector list length: chain of {walked} sectors instead of {declared}")]
    FreelistLengthMismatch { walked: usize, declared: usize },
    #[error("sector link out of bounds [{0}] in directory")]
    DirectoryOutOfBounds(Ts),
    #[error("directory sector [{0}] twice used (loop)")]
    DirectoryLoop(Ts),
    #[error("directory sector [{0}] also in freelist")]
    DirFreeOverlap(Ts),
    #[error("directory chain exceeds {0} entries, rest ignored")]
    DirectoryCeiling(usize),
    #[error("directory entry {0}: name not valid")]
    BadName(usize),
    #[error("directory entry {index} ({name}): start sector [{ts}] not valid")]
    BadStart { index: usize, name: String, ts: Ts },
    #[error("sector [{ts}] out of bounds for file {name}")]
    FileOutOfBounds { name: String, ts: Ts },
    #[error("file {name}: sector [{ts}] also in freelist")]
    FileFreeOverlap { name: String, ts: Ts },
    #[error("file {name}: sector [{ts}] also in directory")]
    FileDirOverlap { name: String, ts: Ts },
    #[error("file {name}: sector [{ts}] also in file {other}")]
    FileFileOverlap { name: String, other: String, ts: Ts },
    #[error("length of {name} is {declared}, but {walked} sectors chained")]
    FileLengthMismatch { name: String, declared: usize, walked: usize },
    #[error("reserved sector [{ts}] in {owner}")]
    ReservedMisclassified { ts: Ts, owner: Owner },
    #[error("{0} sector(s) missing in freelist")]
    UnclaimedSectors(usize),
    #[error("unusual geometry: {0}")]
    GeometryUnusual(String)
}

impl Finding {
    /// 1 = fixable warning, 2 = data loss
    pub fn severity(&self) -> u8 {
        match self {
            Self::FreelistOutOfBounds(_) => 1,
            Self::FreelistDuplicate(_,_) => 1,
            Self::FreelistLengthMismatch {..} => 1,
            Self::DirectoryOutOfBounds(_) => 2,
            Self::DirectoryLoop(_) => 2,
            Self::DirFreeOverlap(_) => 1,
            Self::DirectoryCeiling(_) => 1,
            Self::BadName(_) => 1,
            Self::BadStart {..} => 2,
            Self::FileOutOfBounds {..} => 2,
            Self::FileFreeOverlap {..} => 1,
            Self::FileDirOverlap {..} => 2,
            Self::FileFileOverlap {..} => 2,
            Self::FileLengthMismatch {..} => 2,
            Self::ReservedMisclassified {..} => 1,
            Self::UnclaimedSectors(_) => 1,
            Self::GeometryUnusual(_) => 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn geometry_single_density() {
        let g = Geometry::resolve(400,39,10);
        assert_eq!((g.nbtrk,g.nbsec,g.track0len),(39,10,10));
        assert!(!g.unusual);
    }
    #[test]
    fn geometry_double_density() {
        // 80x18 with a 10 sector track 0
        let g = Geometry::resolve(10+79*18,79,18);
        assert_eq!((g.nbtrk,g.nbsec,g.track0len),(79,18,10));
        assert!(!g.unusual);
        // 80x36 with a 20 sector track 0
        let g = Geometry::resolve(20+79*36,79,36);
        assert_eq!((g.nbtrk,g.nbsec,g.track0len),(79,36,20));
        assert!(!g.unusual);
        // half-length track 0
        let g = Geometry::resolve(8+39*16,39,16);
        assert_eq!((g.nbtrk,g.nbsec,g.track0len),(39,16,8));
        assert!(!g.unusual);
    }
    #[test]
    fn geometry_trailing_track() {
        // a full extra half track beyond the declared geometry
        let g = Geometry::resolve(400+5,39,10);
        assert_eq!((g.nbtrk,g.nbsec,g.track0len),(40,10,10));
        assert_eq!(g.short_last,Some(5));
        assert!(g.unusual);
    }
    #[test]
    fn geometry_truncated() {
        // truncated by one sector: best reading is a shortened track 0
        let g = Geometry::resolve(399,39,10);
        assert_eq!((g.nbtrk,g.nbsec,g.track0len),(39,10,9));
        assert!(!g.unusual);
        // truncated by whole tracks: reduce the track count
        let g = Geometry::resolve(350,39,10);
        assert_eq!((g.nbtrk,g.nbsec,g.track0len),(34,10,10));
        assert!(g.unusual);
    }
    #[test]
    fn addressing_bijection() {
        let g = Geometry::resolve(10+79*18,79,18);
        for b in 0..g.num_blocks() {
            let ts = g.block_to_ts(b);
            assert_eq!(g.ts_to_block(ts).expect("bad address"),b);
        }
        assert_eq!(g.ts_to_block(Ts::NONE).expect("bad address"),0);
        assert!(g.ts_to_block(Ts::new(0,11)).is_err());
        assert!(g.ts_to_block(Ts::new(80,1)).is_err());
        assert!(g.ts_to_block(Ts::new(1,19)).is_err());
        assert!(g.ts_to_block(Ts::new(1,0)).is_err());
    }
    #[test]
    fn date_pivot() {
        assert_eq!(entry_date(6,15,82),NaiveDate::from_ymd_opt(1982,6,15).unwrap());
        assert_eq!(entry_date(6,15,9),NaiveDate::from_ymd_opt(2009,6,15).unwrap());
        assert_eq!(entry_date(0,0,75),NaiveDate::from_ymd_opt(2075,1,1).unwrap());
    }
}
