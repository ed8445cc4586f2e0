//! # FLEX file system module
//!
//! This manipulates disk images containing one FLEX volume.  FLEX threads
//! everything through 4-byte sector headers: every file is a singly linked
//! list of sectors, the directory is another, and the free space is a third
//! rooted in the System Information Record.  There is no redundancy, so the
//! module's first job is to build an *ownership map* assigning every
//! physical sector to exactly one owner, from which all integrity checks
//! and repairs follow.
//!
//! A `Session` owns the sector image and the ownership map.  The lifecycle
//! is load, `parse`, then report, `repair`, or mutate with `put_file` and
//! `delete_file`; mutations are refused while error level findings are open.

pub mod types;
pub mod names;
pub mod directory;
pub mod pack;

use std::collections::BTreeMap;
use chrono::{Datelike,NaiveDate};
use log::{debug,warn};
use types::*;
use directory::{Entry,ENTRY_SIZE,ENTRIES_PER_SECTOR,FIRST_ENTRY};
use super::DiskStruct;
use crate::img::{Img,SECTOR_SIZE};
use crate::{STDRESULT,DYNERR};

/// Outcome of a freelist rebuild.
pub struct RepairReport {
    /// sectors whose link bytes or SIR fields were rewritten
    pub modifications: usize,
    /// unclaimed sectors pulled back into the free chain
    pub reclaimed: usize,
    /// deleted directory entries compacted away
    pub compacted: usize,
    pub free_count: usize
}

/// The primary interface for FLEX disk operations.
pub struct Session {
    img: Img,
    geom: Geometry,
    sir: Sir,
    label: String,
    owner: Vec<Owner>,
    next: Vec<Option<usize>>,
    files: Vec<FileRecord>,
    empty_slots: Vec<usize>,
    findings: Vec<Finding>,
    nslot: usize,
    ndel: usize,
    used_sectors: usize,
    dir_outside0: usize,
    parsed: bool
}

impl Session {
    /// Take ownership of an image and test it for FLEX.  Foreign formats
    /// (OS-9, UniFLEX, FDOS) are identified and refused here.
    pub fn from_img(img: Img) -> Result<Self,DYNERR> {
        let nb = img.num_blocks();
        if img.bytes().len() < 0x241 {
            return Err(Box::new(Error::NotFlex(ForeignKind::Unknown)));
        }
        let sec = img.sector(2)?;
        let label = names::decode_label(&sec[sir_off::LABEL..sir_off::LABEL+11]);
        let sir = Sir::from_bytes(sec);
        if label.is_err() || sir.last_track == 0 || sir.sec_per_track == 0 {
            let kind = classify_foreign(img.bytes(),nb);
            return Err(Box::new(Error::NotFlex(kind)));
        }
        if sir.free_count as usize > sir.last_track as usize * sir.sec_per_track as usize {
            return Err(Box::new(Error::SirCorrupt));
        }
        let geom = Geometry::resolve(nb,sir.last_track,sir.sec_per_track);
        debug!("geometry: {}",geom.describe());
        let mut findings = Vec::new();
        if geom.unusual {
            findings.push(Finding::GeometryUnusual(geom.describe()));
        }
        Ok(Self {
            img,
            owner: vec![Owner::Unclaimed;nb],
            next: vec![None;nb],
            geom,
            sir,
            label: label.expect("label already checked"),
            files: Vec::new(),
            empty_slots: Vec::new(),
            findings,
            nslot: 0,
            ndel: 0,
            used_sectors: 0,
            dir_outside0: 0,
            parsed: false
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geom
    }
    pub fn sir(&self) -> &Sir {
        &self.sir
    }
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn img(&self) -> &Img {
        &self.img
    }
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }
    pub fn owners(&self) -> &[Owner] {
        &self.owner
    }
    /// total directory slots scanned
    pub fn slot_count(&self) -> usize {
        self.nslot
    }
    pub fn deleted_count(&self) -> usize {
        self.ndel
    }
    pub fn used_sector_count(&self) -> usize {
        self.used_sectors
    }
    /// directory sectors chained outside track 0
    pub fn dir_sectors_outside_track0(&self) -> usize {
        self.dir_outside0
    }
    /// 0 clean, 1 fixable warnings, 2 data loss
    pub fn status(&self) -> u8 {
        self.findings.iter().map(|f| f.severity()).max().unwrap_or(0)
    }

    /// Build the ownership map: walk the free chain, the directory chain,
    /// and every file chain, recording findings as it goes.  Warnings and
    /// errors never stop the build; only a directory loop aborts it,
    /// leaving the session in report-only mode.
    pub fn parse(&mut self) -> STDRESULT {
        let nb = self.geom.num_blocks();
        self.owner = vec![Owner::Unclaimed;nb];
        self.next = vec![None;nb];
        self.files.clear();
        self.empty_slots.clear();
        self.findings.retain(|f| matches!(f,Finding::GeometryUnusual(_)));
        self.nslot = 0;
        self.ndel = 0;
        self.used_sectors = 0;
        self.dir_outside0 = 0;
        self.parsed = false;
        self.walk_freelist()?;
        if !self.walk_directory()? {
            return Ok(());
        }
        self.walk_files()?;
        for b in 0..FIRST_DIR_BLOCK {
            match self.owner[b] {
                Owner::Unclaimed => self.owner[b] = Owner::Boot,
                owner => self.findings.push(Finding::ReservedMisclassified {
                    ts: self.geom.block_to_ts(b), owner })
            }
        }
        let unclaimed = (FIRST_DIR_BLOCK..nb).filter(|b| self.owner[*b]==Owner::Unclaimed).count();
        if unclaimed > 0 {
            self.findings.push(Finding::UnclaimedSectors(unclaimed));
        }
        self.parsed = true;
        Ok(())
    }

    fn walk_freelist(&mut self) -> STDRESULT {
        let declared = self.sir.free_count as usize;
        if declared == 0 {
            warn!("empty free list");
            return Ok(());
        }
        let mut dups: BTreeMap<usize,usize> = BTreeMap::new();
        let mut cur = self.sir.free_head;
        let mut walked = 0;
        let mut terminated = false;
        for _k in 0..declared {
            let b = match self.geom.ts_to_block(cur) {
                Ok(b) => b,
                Err(_) => {
                    self.findings.push(Finding::FreelistOutOfBounds(cur));
                    break;
                }
            };
            walked += 1;
            match self.owner[b] {
                Owner::Unclaimed => self.owner[b] = Owner::Free,
                _ => *dups.entry(b).or_insert(1) += 1
            }
            let link = Ts::from(self.img.link(b)?);
            self.next[b] = self.next_of(link);
            cur = link;
            if cur.is_none() {
                terminated = true;
                break;
            }
        }
        for (b,times) in dups {
            self.findings.push(Finding::FreelistDuplicate(self.geom.block_to_ts(b),times));
        }
        if !(terminated && walked == declared) {
            self.findings.push(Finding::FreelistLengthMismatch { walked, declared });
        }
        Ok(())
    }

    /// returns false when a directory loop forces the parse to abort
    fn walk_directory(&mut self) -> Result<bool,DYNERR> {
        let mut ts = Ts::new(0,5);
        let mut b = match self.geom.ts_to_block(ts) {
            Ok(b) => b,
            Err(_) => {
                self.findings.push(Finding::DirectoryOutOfBounds(ts));
                return Ok(false);
            }
        };
        match self.owner[b] {
            Owner::Free => {
                self.findings.push(Finding::DirFreeOverlap(ts));
                self.owner[b] = Owner::Directory;
            },
            _ => self.owner[b] = Owner::Directory
        }
        loop {
            if ts.track != 0 {
                self.dir_outside0 += 1;
            }
            let sec = self.img.sector(b)?.to_vec();
            for k in 0..ENTRIES_PER_SECTOR {
                if self.nslot >= MAX_DIR_ENTRIES {
                    self.findings.push(Finding::DirectoryCeiling(MAX_DIR_ENTRIES));
                    return Ok(true);
                }
                let off = FIRST_ENTRY + k*ENTRY_SIZE;
                let entry_offset = b*SECTOR_SIZE + off;
                let entry = Entry::from_bytes(&sec[off..off+ENTRY_SIZE]);
                self.nslot += 1;
                if entry.is_unused() {
                    self.empty_slots.push(entry_offset);
                    continue;
                }
                self.scan_entry(&entry,entry_offset);
            }
            let link = Ts::from([sec[0],sec[1]]);
            if link.is_none() {
                return Ok(true);
            }
            b = match self.geom.ts_to_block(link) {
                Ok(b) => b,
                Err(_) => {
                    self.findings.push(Finding::DirectoryOutOfBounds(link));
                    return Ok(true);
                }
            };
            match self.owner[b] {
                Owner::Unclaimed => self.owner[b] = Owner::Directory,
                Owner::Free => {
                    self.findings.push(Finding::DirFreeOverlap(link));
                    self.owner[b] = Owner::Directory;
                },
                _ => {
                    self.findings.push(Finding::DirectoryLoop(link));
                    return Ok(false);
                }
            }
            ts = link;
        }
    }

    fn scan_entry(&mut self,entry: &Entry,entry_offset: usize) {
        let index = self.files.len() + 1;
        let mut flags = FileFlags::default();
        let name = match names::decode_file_name(&entry.name_field()) {
            Ok(n) => n,
            Err(_) => {
                self.findings.push(Finding::BadName(index));
                flags |= FileFlags::BAD_NAME;
                names::lossy_name(&entry.name_field())
            }
        };
        let date = entry_date(entry.month,entry.day,entry.year);
        let deleted = entry.is_deleted();
        // a file claiming to start in the boot sectors or the SIR is unusable
        let start_ok = match self.geom.ts_to_block(entry.start) {
            Ok(j) => j > 2,
            Err(_) => false
        };
        if !start_ok && !deleted && entry.length != 0 {
            self.findings.push(Finding::BadStart { index, name: name.clone(), ts: entry.start });
            self.files.push(FileRecord {
                name, date,
                start: entry.start,
                end: entry.end,
                length: 0,
                flags: flags | FileFlags::CORRUPTED,
                entry_offset
            });
            return;
        }
        if entry.random != 0 {
            flags |= FileFlags::RANDOM;
        }
        if deleted || entry.length == 0 {
            flags |= FileFlags::DELETED;
            self.ndel += 1;
        } else {
            self.used_sectors += entry.length as usize;
        }
        self.files.push(FileRecord {
            name, date,
            start: entry.start,
            end: entry.end,
            length: entry.length as usize,
            flags,
            entry_offset
        });
    }

    fn walk_files(&mut self) -> STDRESULT {
        for k in 0..self.files.len() {
            let rec = self.files[k].clone();
            if rec.flags.contains(FileFlags::CORRUPTED) || rec.length == 0
                || rec.flags.contains(FileFlags::DELETED) {
                continue;
            }
            let mut cur = rec.start;
            let mut nb_blk = 0;
            while !cur.is_none() && nb_blk < rec.length {
                let b = match self.geom.ts_to_block(cur) {
                    Ok(b) => b,
                    Err(_) => {
                        self.findings.push(Finding::FileOutOfBounds { name: rec.name.clone(), ts: cur });
                        break;
                    }
                };
                let link = Ts::from(self.img.link(b)?);
                self.next[b] = self.next_of(link);
                nb_blk += 1;
                match self.owner[b] {
                    Owner::Unclaimed => self.owner[b] = Owner::File(k),
                    Owner::Free => {
                        self.findings.push(Finding::FileFreeOverlap { name: rec.name.clone(), ts: cur });
                        self.files[k].flags |= FileFlags::UNUSABLE;
                    },
                    Owner::Directory | Owner::Boot => {
                        self.findings.push(Finding::FileDirOverlap { name: rec.name.clone(), ts: cur });
                        self.files[k].flags |= FileFlags::CORRUPTED;
                    },
                    Owner::File(j) => {
                        self.findings.push(Finding::FileFileOverlap {
                            name: rec.name.clone(),
                            other: self.files[j].name.clone(),
                            ts: cur });
                        self.files[k].flags |= FileFlags::CORRUPTED;
                        if j == k {
                            break;
                        }
                        self.files[j].flags |= FileFlags::CORRUPTED;
                    }
                }
                cur = link;
            }
            if nb_blk != rec.length || !cur.is_none() {
                self.findings.push(Finding::FileLengthMismatch {
                    name: rec.name.clone(),
                    declared: rec.length,
                    walked: nb_blk });
                self.files[k].flags |= FileFlags::CORRUPTED;
            }
        }
        // tentative walks come last so a deleted chain reused by a live
        // file is seen as lost
        for k in 0..self.files.len() {
            let rec = self.files[k].clone();
            if rec.flags.contains(FileFlags::DELETED) && !rec.flags.contains(FileFlags::CORRUPTED)
                && rec.length > 0 {
                self.walk_deleted(k,&rec)?;
            }
        }
        Ok(())
    }

    /// Walk a deleted entry's former chain without claiming anything.
    /// If the chain is intact and unclaimed the entry may still be
    /// restored, otherwise the recoverable bit comes back off.
    fn walk_deleted(&mut self,k: usize,rec: &FileRecord) -> STDRESULT {
        self.files[k].flags |= FileFlags::RECOVERABLE;
        let mut cur = rec.start;
        for j in 0..rec.length {
            let b = match self.geom.ts_to_block(cur) {
                Ok(b) => b,
                Err(_) => {
                    self.files[k].flags &= !FileFlags::RECOVERABLE;
                    return Ok(());
                }
            };
            match self.owner[b] {
                Owner::Directory | Owner::Boot | Owner::File(_) => {
                    self.files[k].flags &= !FileFlags::RECOVERABLE;
                    return Ok(());
                },
                _ => {}
            }
            let link = Ts::from(self.img.link(b)?);
            if j == rec.length - 1 {
                if self.geom.ts_to_block(rec.end) != Ok(b) {
                    self.files[k].flags &= !FileFlags::RECOVERABLE;
                }
                return Ok(());
            }
            cur = link;
        }
        Ok(())
    }

    /// successor block recorded in the ownership map, `(0,0)` is terminal
    fn next_of(&self,link: Ts) -> Option<usize> {
        match link.is_none() {
            true => None,
            false => self.geom.ts_to_block(link).ok()
        }
    }

    /// A coherent free chain is required before anything may consume it.
    fn freelist_clean(&self) -> bool {
        !self.findings.iter().any(|f| matches!(f,
            Finding::FreelistOutOfBounds(_)
            | Finding::FreelistDuplicate(_,_)
            | Finding::FreelistLengthMismatch {..}
            | Finding::DirFreeOverlap(_)
            | Finding::FileFreeOverlap {..}
            | Finding::UnclaimedSectors(_)))
    }

    fn require_writable(&self) -> STDRESULT {
        if !self.parsed || self.status() > 1 || !self.freelist_clean() {
            return Err(Box::new(Error::DamagedDisk));
        }
        Ok(())
    }

    fn read_entry(&self,offset: usize) -> Result<[u8;24],DYNERR> {
        let sec = self.img.sector(offset/SECTOR_SIZE)?;
        let off = offset % SECTOR_SIZE;
        let mut ans = [0u8;24];
        ans.copy_from_slice(&sec[off..off+ENTRY_SIZE]);
        Ok(ans)
    }

    fn write_entry(&mut self,offset: usize,dat: &[u8;24]) -> STDRESULT {
        let sec = self.img.sector_mut(offset/SECTOR_SIZE)?;
        let off = offset % SECTOR_SIZE;
        sec[off..off+ENTRY_SIZE].copy_from_slice(dat);
        Ok(())
    }

    fn store_sir(&mut self) -> STDRESULT {
        let sec = self.img.sector_mut(2)?;
        self.sir.store(sec);
        Ok(())
    }

    /// Rebuild the free chain in ascending block order, reclaiming
    /// unclaimed sectors, then compact the directory: once the chain is
    /// rewritten, deleted entries can no longer be undeleted, so their
    /// slots are recovered.  Refused while error level findings are open.
    pub fn repair(&mut self) -> Result<RepairReport,DYNERR> {
        if !self.parsed || self.status() > 1 {
            return Err(Box::new(Error::DamagedDisk));
        }
        let nb = self.geom.num_blocks();
        let mut reclaimed = 0;
        for b in FIRST_DIR_BLOCK..nb {
            if self.owner[b] == Owner::Unclaimed {
                let link = Ts::from(self.img.link(b)?);
                self.next[b] = self.next_of(link);
                self.owner[b] = Owner::Free;
                reclaimed += 1;
            }
        }
        let free: Vec<usize> = (FIRST_DIR_BLOCK..nb).filter(|b| self.owner[*b]==Owner::Free).collect();
        let mut modifications = 0;
        for (i,b) in free.iter().enumerate() {
            let desired = match free.get(i+1) {
                Some(j) => self.geom.block_to_ts(*j),
                None => Ts::NONE
            };
            if Ts::from(self.img.link(*b)?) != desired {
                let sec = self.img.sector_mut(*b)?;
                sec[0] = desired.track;
                sec[1] = desired.sector;
                modifications += 1;
            }
            self.next[*b] = free.get(i+1).copied();
        }
        match free.first() {
            Some(first) => {
                let head = self.geom.block_to_ts(*first);
                let tail = self.geom.block_to_ts(*free.last().expect("nonempty list"));
                if self.sir.free_head != head {
                    self.sir.free_head = head;
                    modifications += 1;
                }
                if self.sir.free_tail != tail {
                    self.sir.free_tail = tail;
                    modifications += 1;
                }
            },
            None => {
                self.sir.free_head = Ts::NONE;
                self.sir.free_tail = Ts::NONE;
            }
        }
        if self.sir.free_count as usize != free.len() {
            self.sir.free_count = free.len() as u16;
            modifications += 1;
        }
        self.store_sir()?;
        let compacted = self.compact_directory()?;
        // the rebuild settles every freelist coherence question except
        // live chains that still run through free sectors
        self.findings.retain(|f| !matches!(f,
            Finding::FreelistOutOfBounds(_)
            | Finding::FreelistDuplicate(_,_)
            | Finding::FreelistLengthMismatch {..}
            | Finding::DirFreeOverlap(_)
            | Finding::UnclaimedSectors(_)));
        Ok(RepairReport { modifications, reclaimed, compacted, free_count: free.len() })
    }

    /// Overwrite each deleted slot with the bytes of the highest live
    /// entry and zero the vacated slot.
    fn compact_directory(&mut self) -> Result<usize,DYNERR> {
        let mut moved = 0;
        let mut tail = self.files.len();
        let mut i = 0;
        while i < tail {
            while tail > 0 && self.files[tail-1].flags.contains(FileFlags::DELETED) {
                let off = self.files[tail-1].entry_offset;
                self.write_entry(off,&[0;24])?;
                self.empty_slots.push(off);
                tail -= 1;
                moved += 1;
            }
            if i >= tail {
                break;
            }
            if self.files[i].flags.contains(FileFlags::DELETED) {
                let dst = self.files[i].entry_offset;
                let src = self.files[tail-1].entry_offset;
                let dat = self.read_entry(src)?;
                self.write_entry(dst,&dat)?;
                self.write_entry(src,&[0;24])?;
                self.empty_slots.push(src);
                let mut rec = self.files[tail-1].clone();
                rec.entry_offset = dst;
                self.files[i] = rec;
                for owner in self.owner.iter_mut() {
                    if *owner == Owner::File(tail-1) {
                        *owner = Owner::File(i);
                    }
                }
                tail -= 1;
                moved += 1;
            }
            i += 1;
        }
        self.files.truncate(tail);
        self.ndel = 0;
        Ok(moved)
    }

    /// Copy host data onto the disk under a coerced 8+3 name.  The head of
    /// the free chain becomes the file; sector links are already in place
    /// and only the last one is cut.  Returns the FLEX name used.
    pub fn put_file(&mut self,host_name: &str,dat: &[u8],date: NaiveDate) -> Result<String,DYNERR> {
        self.require_writable()?;
        if dat.is_empty() {
            return Err(Box::new(super::Error::FileImageFormat));
        }
        let (name,ext,coerced) = names::coerce_host_name(host_name);
        let full = names::full_name(&name,&ext);
        for f in &self.files {
            if !f.flags.contains(FileFlags::DELETED) && f.name == full {
                return Err(Box::new(Error::FileExists));
            }
        }
        let nbf = (dat.len() + SEC_DATA - 1) / SEC_DATA;
        if nbf > self.sir.free_count as usize {
            return Err(Box::new(Error::DiskFull));
        }
        if self.empty_slots.is_empty() {
            return Err(Box::new(Error::DirectoryFull));
        }
        let random = dat.len() >= RANDOM_MAGIC.len() && &dat[0..RANDOM_MAGIC.len()] == RANDOM_MAGIC;
        let start = self.sir.free_head;
        let mut cur = start;
        let mut blocks = Vec::with_capacity(nbf);
        for i in 0..nbf {
            let b = match self.geom.ts_to_block(cur) {
                Ok(b) => b,
                Err(_) => return Err(Box::new(Error::DamagedDisk))
            };
            blocks.push(b);
            let chunk_end = usize::min((i+1)*SEC_DATA,dat.len());
            let chunk = &dat[i*SEC_DATA..chunk_end];
            let sec = self.img.sector_mut(b)?;
            for byte in sec[2..].iter_mut() {
                *byte = 0;
            }
            sec[4..4+chunk.len()].copy_from_slice(chunk);
            if random && i == 0 {
                // the magic never lands on disk
                for byte in sec[4..16].iter_mut() {
                    *byte = 0;
                }
            }
            if !(random && i < 2) {
                let recnum = (i + 1 - if random { 2 } else { 0 }) as u16;
                sec[2..4].copy_from_slice(&u16::to_be_bytes(recnum));
            }
            let link = Ts::new(sec[0],sec[1]);
            if i < nbf - 1 {
                cur = link;
            }
        }
        let last = blocks[nbf-1];
        let new_head = Ts::from(self.img.link(last)?);
        {
            let sec = self.img.sector_mut(last)?;
            sec[0] = 0;
            sec[1] = 0;
        }
        self.sir.free_head = new_head;
        self.sir.free_count -= nbf as u16;
        if self.sir.free_count == 0 {
            self.sir.free_tail = Ts::NONE;
        }
        let mut entry = Entry::new();
        let coded = names::encode_file_name(&name,&ext);
        entry.name.copy_from_slice(&coded[0..8]);
        entry.ext.copy_from_slice(&coded[8..11]);
        entry.start = start;
        entry.end = cur;
        entry.length = nbf as u16;
        entry.random = if random { 2 } else { 0 };
        entry.month = date.month() as u8;
        entry.day = date.day() as u8;
        entry.year = (date.year() % 100) as u8;
        let slot = self.empty_slots.remove(0);
        let flat = entry.to_bytes();
        let mut dat24 = [0u8;24];
        dat24.copy_from_slice(&flat);
        self.write_entry(slot,&dat24)?;
        if random && nbf >= 3 {
            self.build_index(&blocks)?;
        }
        let idx = self.files.len();
        for b in &blocks {
            self.owner[*b] = Owner::File(idx);
        }
        for i in 0..nbf-1 {
            self.next[blocks[i]] = Some(blocks[i+1]);
        }
        self.next[last] = None;
        let mut flags = FileFlags::default();
        if random {
            flags |= FileFlags::RANDOM;
        }
        self.files.push(FileRecord {
            name: full.clone(),
            date,
            start,
            end: cur,
            length: nbf,
            flags,
            entry_offset: slot
        });
        self.used_sectors += nbf;
        self.store_sir()?;
        if coerced {
            warn!("copying {} as {} to respect FLEX filename rules",host_name,full);
        }
        Ok(full)
    }

    /// Fill the two File Index Sectors with (track,sector,count) triples
    /// describing the contiguous runs of the data sectors.
    fn build_index(&mut self,blocks: &[usize]) -> STDRESULT {
        let data = &blocks[2..];
        let mut triples: Vec<[u8;3]> = Vec::new();
        let push_run = |start: usize,len: usize,triples: &mut Vec<[u8;3]>| {
            let mut start = start;
            let mut len = len;
            while len > 0 {
                let n = usize::min(len,255);
                let ts = self.geom.block_to_ts(start);
                triples.push([ts.track,ts.sector,n as u8]);
                start += n;
                len -= n;
            }
        };
        let mut run_start = data[0];
        let mut run_len = 1;
        for w in data.windows(2) {
            if w[1] == w[0] + 1 {
                run_len += 1;
            } else {
                push_run(run_start,run_len,&mut triples);
                run_start = w[1];
                run_len = 1;
            }
        }
        push_run(run_start,run_len,&mut triples);
        let per_fis = (SECTOR_SIZE - 4) / 3;
        if triples.len() > 2*per_fis {
            warn!("random file index overflow, {} runs dropped",triples.len()-2*per_fis);
            triples.truncate(2*per_fis);
        }
        for (n,t) in triples.iter().enumerate() {
            let (fis,off) = match n < per_fis {
                true => (blocks[0],4 + n*3),
                false => (blocks[1],4 + (n-per_fis)*3)
            };
            let sec = self.img.sector_mut(fis)?;
            sec[off..off+3].copy_from_slice(t);
        }
        Ok(())
    }

    /// Tag the directory entry deleted and splice the file's chain onto
    /// the tail of the free chain.  The sectors themselves are untouched,
    /// which is what keeps the entry recoverable until the next repair.
    pub fn delete_file(&mut self,name: &str) -> STDRESULT {
        self.require_writable()?;
        let k = match self.files.iter().position(|f| !f.flags.contains(FileFlags::DELETED) && f.name == name) {
            Some(k) => k,
            None => return Err(Box::new(Error::FileNotFound))
        };
        let rec = self.files[k].clone();
        let mut dat = self.read_entry(rec.entry_offset)?;
        dat[0] = 0xFF;
        self.write_entry(rec.entry_offset,&dat)?;
        if self.sir.free_count == 0 {
            self.sir.free_head = rec.start;
        } else {
            let tail = self.geom.ts_to_block(self.sir.free_tail)?;
            let sec = self.img.sector_mut(tail)?;
            sec[0] = rec.start.track;
            sec[1] = rec.start.sector;
            self.next[tail] = self.geom.ts_to_block(rec.start).ok();
        }
        self.sir.free_tail = rec.end;
        self.sir.free_count += rec.length as u16;
        self.store_sir()?;
        for owner in self.owner.iter_mut() {
            if *owner == Owner::File(k) {
                *owner = Owner::Free;
            }
        }
        self.files[k].flags |= FileFlags::DELETED | FileFlags::RECOVERABLE;
        if !rec.name.is_empty() {
            self.files[k].name = format!("?{}",&rec.name[1..]);
        }
        self.used_sectors -= rec.length;
        self.ndel += 1;
        Ok(())
    }

    /// Pull a file's payload off the disk by walking its chain.  Random
    /// files come back with the magic prefix and their index bytes, the
    /// same stream `put_file` accepts.  The flag reports truncation.
    pub fn read_file(&self,k: usize) -> Result<(Vec<u8>,bool),DYNERR> {
        let rec = &self.files[k];
        let random = rec.flags.contains(FileFlags::RANDOM);
        let mut ans = Vec::new();
        if random {
            ans.extend_from_slice(RANDOM_MAGIC);
        }
        let mut offset = match random {
            true => 16,
            false => 4
        };
        let mut cur = rec.start;
        let mut count = 0;
        while count < rec.length {
            let b = match self.geom.ts_to_block(cur) {
                Ok(b) if b >= 1 => b,
                _ => break
            };
            let sec = self.img.sector(b)?;
            ans.extend_from_slice(&sec[offset..]);
            offset = 4;
            count += 1;
            cur = Ts::new(sec[0],sec[1]);
        }
        let truncated = !cur.is_none() || count != rec.length;
        Ok((ans,truncated))
    }
}

/// Write a blank FLEX image: boot pair, SIR, empty directory chain on
/// track 0, and all remaining sectors strung into one free chain.
pub fn format_img(label: &str,volnum: u16,tracks: usize,sectors: usize,track0len: usize,date: NaiveDate) -> Result<Img,DYNERR> {
    if tracks < 2 || tracks > 256 || sectors < 6 || sectors > 255
        || track0len < 6 || track0len > sectors {
        return Err(Box::new(Error::UnusualGeometry));
    }
    let nb = track0len + (tracks-1)*sectors;
    let mut img = Img::create(nb);
    let mut sir = Sir::new();
    sir.label = names::encode_label(label);
    sir.volnum = volnum;
    sir.free_head = Ts::new(1,1);
    sir.free_tail = Ts::new((tracks-1) as u8,sectors as u8);
    sir.free_count = ((tracks-1)*sectors) as u16;
    sir.month = date.month() as u8;
    sir.day = date.day() as u8;
    sir.year = (date.year() % 100) as u8;
    sir.last_track = (tracks-1) as u8;
    sir.sec_per_track = sectors as u8;
    sir.store(img.sector_mut(2)?);
    // directory chain fills the rest of track 0, sectors 5 through track0len
    for s in 5..track0len {
        let sec = img.sector_mut(s-1)?;
        sec[1] = (s+1) as u8;
    }
    // free chain covers every sector of tracks 1 on up
    for t in 1..tracks {
        for s in 1..=sectors {
            let b = track0len + (t-1)*sectors + s - 1;
            let link = match (s < sectors,t < tracks-1) {
                (true,_) => Ts::new(t as u8,(s+1) as u8),
                (false,true) => Ts::new((t+1) as u8,1),
                (false,false) => Ts::NONE
            };
            let sec = img.sector_mut(b)?;
            sec[0] = link.track;
            sec[1] = link.sector;
        }
    }
    Ok(img)
}
